use anyhow::{Context, Result};

use crate::models::session::HiringDecision;

/// Application configuration loaded from environment variables.
/// Fails fast at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    /// Optional webhook endpoint for best-effort completion notifications.
    pub notify_webhook_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub defaults: InterviewDefaults,
    pub integrity: IntegrityWeights,
    pub thresholds: DecisionThresholds,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            notify_webhook_url: std::env::var("NOTIFY_WEBHOOK_URL").ok(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            defaults: InterviewDefaults::from_env(),
            integrity: IntegrityWeights::from_env(),
            thresholds: DecisionThresholds::from_env(),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u8(key: &str, default: u8) -> u8 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Per-interview defaults applied when the job record does not override them.
#[derive(Debug, Clone, Copy)]
pub struct InterviewDefaults {
    pub time_limit_minutes: u32,
    pub question_count: usize,
}

impl Default for InterviewDefaults {
    fn default() -> Self {
        Self {
            time_limit_minutes: 60,
            question_count: 5,
        }
    }
}

impl InterviewDefaults {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            time_limit_minutes: env_u32("INTERVIEW_TIME_LIMIT_MINUTES", d.time_limit_minutes),
            question_count: env_u32("INTERVIEW_QUESTION_COUNT", d.question_count as u32) as usize,
        }
    }
}

/// Integrity-score penalty weights and risk boundaries.
///
/// These numbers are inherited policy, not derived — they are surfaced here as
/// explicit, env-tunable configuration rather than buried constants.
#[derive(Debug, Clone, Copy)]
pub struct IntegrityWeights {
    /// Deducted per recorded tab switch.
    pub tab_switch: u32,
    /// Deducted per copy-paste attempt.
    pub copy_paste: u32,
    /// Deducted per HIGH / MEDIUM / LOW suspicious activity that is not
    /// already backed by one of the counters above.
    pub high_severity: u32,
    pub medium_severity: u32,
    pub low_severity: u32,
    /// Deducted once when the session recorded zero identity snapshots.
    pub missing_snapshots: u32,
    /// Deducted per identity snapshot with no detected face.
    pub missing_face: u32,
    /// Risk is LOW above this score, MEDIUM above `medium_risk_over`, HIGH below.
    pub low_risk_over: u8,
    pub medium_risk_over: u8,
}

impl Default for IntegrityWeights {
    fn default() -> Self {
        Self {
            tab_switch: 5,
            copy_paste: 15,
            high_severity: 10,
            medium_severity: 5,
            low_severity: 2,
            missing_snapshots: 20,
            missing_face: 10,
            low_risk_over: 75,
            medium_risk_over: 50,
        }
    }
}

impl IntegrityWeights {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            tab_switch: env_u32("INTEGRITY_PENALTY_TAB_SWITCH", d.tab_switch),
            copy_paste: env_u32("INTEGRITY_PENALTY_COPY_PASTE", d.copy_paste),
            high_severity: env_u32("INTEGRITY_PENALTY_HIGH", d.high_severity),
            medium_severity: env_u32("INTEGRITY_PENALTY_MEDIUM", d.medium_severity),
            low_severity: env_u32("INTEGRITY_PENALTY_LOW", d.low_severity),
            missing_snapshots: env_u32("INTEGRITY_PENALTY_NO_SNAPSHOTS", d.missing_snapshots),
            missing_face: env_u32("INTEGRITY_PENALTY_NO_FACE", d.missing_face),
            low_risk_over: env_u8("INTEGRITY_LOW_RISK_OVER", d.low_risk_over),
            medium_risk_over: env_u8("INTEGRITY_MEDIUM_RISK_OVER", d.medium_risk_over),
        }
    }
}

/// Overall-score boundaries mapping an evaluation to a hiring decision.
#[derive(Debug, Clone, Copy)]
pub struct DecisionThresholds {
    pub strongly_recommend: u8,
    pub recommend: u8,
    pub neutral: u8,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            strongly_recommend: 85,
            recommend: 70,
            neutral: 50,
        }
    }
}

impl DecisionThresholds {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            strongly_recommend: env_u8("DECISION_STRONGLY_RECOMMEND_AT", d.strongly_recommend),
            recommend: env_u8("DECISION_RECOMMEND_AT", d.recommend),
            neutral: env_u8("DECISION_NEUTRAL_AT", d.neutral),
        }
    }

    pub fn decide(&self, overall_score: u8) -> HiringDecision {
        if overall_score >= self.strongly_recommend {
            HiringDecision::StronglyRecommend
        } else if overall_score >= self.recommend {
            HiringDecision::Recommend
        } else if overall_score >= self.neutral {
            HiringDecision::Neutral
        } else {
            HiringDecision::NotRecommend
        }
    }
}
