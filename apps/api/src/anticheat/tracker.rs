use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::IntegrityWeights;
use crate::errors::AppError;

/// Copy-paste payloads are truncated to this length before logging.
const PASTE_PREVIEW_CHARS: usize = 120;
/// Window blurs longer than this are flagged as suspicious.
const BLUR_FLAG_MS: u64 = 10_000;
/// Tab switches beyond this count are each flagged as suspicious.
const TAB_SWITCH_TOLERANCE: u32 = 3;

/// Shortcut combinations worth flagging when seen mid-interview.
const FLAGGED_SHORTCUTS: &[&str] = &["ctrl+c", "ctrl+v", "meta+v", "alt+tab", "prtsc", "f12"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrityRecommendation {
    Trustworthy,
    ReviewRequired,
    HighRisk,
}

impl From<RiskLevel> for IntegrityRecommendation {
    fn from(risk: RiskLevel) -> Self {
        match risk {
            RiskLevel::Low => IntegrityRecommendation::Trustworthy,
            RiskLevel::Medium => IntegrityRecommendation::ReviewRequired,
            RiskLevel::High => IntegrityRecommendation::HighRisk,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspicionKind {
    ExcessiveTabSwitching,
    CopyPaste,
    ProlongedBlur,
    FaceNotDetected,
    NoIdentitySnapshots,
    SuspiciousShortcut,
}

impl SuspicionKind {
    /// Kinds whose penalty is already carried by a dedicated counter in
    /// [`integrity_score_for`]. Excluded from the per-severity deduction so
    /// tab switches, copy-paste, and face failures are not double-counted.
    fn counter_backed(&self) -> bool {
        matches!(
            self,
            SuspicionKind::ExcessiveTabSwitching
                | SuspicionKind::CopyPaste
                | SuspicionKind::FaceNotDetected
                | SuspicionKind::NoIdentitySnapshots
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousActivity {
    pub kind: SuspicionKind,
    pub severity: Severity,
    pub detail: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AntiCheatEvent {
    pub kind: &'static str,
    pub at: DateTime<Utc>,
    pub detail: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    pub face_detected: bool,
    pub confidence: f64,
    pub metadata: Value,
    pub at: DateTime<Utc>,
}

/// Live per-session record. Never leaves this module except as a summary.
#[derive(Debug)]
struct AntiCheatSession {
    candidate_id: Uuid,
    started_at: DateTime<Utc>,
    tab_switches: u32,
    copy_paste_attempts: u32,
    events: Vec<AntiCheatEvent>,
    suspicious: Vec<SuspiciousActivity>,
    snapshots: Vec<IdentitySnapshot>,
    fingerprint: Option<String>,
}

impl AntiCheatSession {
    fn new(candidate_id: Uuid) -> Self {
        Self {
            candidate_id,
            started_at: Utc::now(),
            tab_switches: 0,
            copy_paste_attempts: 0,
            events: Vec::new(),
            suspicious: Vec::new(),
            snapshots: Vec::new(),
            fingerprint: None,
        }
    }

    fn push_event(&mut self, kind: &'static str, detail: Value) {
        self.events.push(AntiCheatEvent {
            kind,
            at: Utc::now(),
            detail,
        });
    }

    fn flag(&mut self, kind: SuspicionKind, severity: Severity, detail: String) {
        self.suspicious.push(SuspiciousActivity {
            kind,
            severity,
            detail,
            at: Utc::now(),
        });
    }
}

/// Durable output of a finalized anti-cheat session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegritySummary {
    pub session_id: Uuid,
    pub candidate_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub tab_switches: u32,
    pub copy_paste_attempts: u32,
    pub identity_snapshots: usize,
    pub events_recorded: usize,
    pub integrity_score: u8,
    pub risk_level: RiskLevel,
    pub recommendation: IntegrityRecommendation,
    pub suspicious_activity: Vec<SuspiciousActivity>,
    pub browser_fingerprint: Option<String>,
}

/// Behavioral signal as submitted by the interview client, one per signal
/// type, merged through `submitAnswer` or the discrete ingestion endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ClientEvent {
    TabSwitch,
    CopyPaste {
        content: String,
    },
    WindowBlur {
        duration_ms: u64,
    },
    RightClick,
    KeyboardShortcut {
        keys: String,
    },
    IdentitySnapshot {
        face_detected: bool,
        confidence: f64,
        #[serde(default)]
        metadata: Value,
    },
    BrowserFingerprint {
        fingerprint: String,
    },
}

/// Keyed, concurrency-safe store of live anti-cheat sessions.
///
/// Constructed once at startup and shared via `Arc` — an explicit service
/// object, not a process-wide singleton. Safe under concurrent access across
/// independent sessions; each entry is mutated under its shard lock.
pub struct AntiCheatTracker {
    sessions: DashMap<Uuid, AntiCheatSession>,
    weights: IntegrityWeights,
}

impl AntiCheatTracker {
    pub fn new(weights: IntegrityWeights) -> Self {
        Self {
            sessions: DashMap::new(),
            weights,
        }
    }

    /// Starts tracking a session. Idempotent re-init would drop accumulated
    /// signals, so an existing record is left untouched.
    pub fn init(&self, session_id: Uuid, candidate_id: Uuid) {
        self.sessions
            .entry(session_id)
            .or_insert_with(|| AntiCheatSession::new(candidate_id));
        debug!("Anti-cheat tracking initialized for session {session_id}");
    }

    pub fn is_tracking(&self, session_id: Uuid) -> bool {
        self.sessions.contains_key(&session_id)
    }

    pub fn record_tab_switch(&self, session_id: Uuid) -> Result<(), AppError> {
        self.with_session(session_id, |s| {
            s.tab_switches += 1;
            s.push_event("tab_switch", json!({ "count": s.tab_switches }));
            if s.tab_switches > TAB_SWITCH_TOLERANCE {
                s.flag(
                    SuspicionKind::ExcessiveTabSwitching,
                    Severity::Medium,
                    format!("Tab switch #{}", s.tab_switches),
                );
            }
        })
    }

    pub fn record_copy_paste(&self, session_id: Uuid, content: &str) -> Result<(), AppError> {
        self.with_session(session_id, |s| {
            s.copy_paste_attempts += 1;
            let preview: String = content.chars().take(PASTE_PREVIEW_CHARS).collect();
            s.push_event("copy_paste", json!({ "preview": preview }));
            s.flag(
                SuspicionKind::CopyPaste,
                Severity::High,
                format!("Copy-paste attempt #{}: {preview}", s.copy_paste_attempts),
            );
        })
    }

    pub fn record_window_blur(&self, session_id: Uuid, duration_ms: u64) -> Result<(), AppError> {
        self.with_session(session_id, |s| {
            s.push_event("window_blur", json!({ "duration_ms": duration_ms }));
            if duration_ms > BLUR_FLAG_MS {
                s.flag(
                    SuspicionKind::ProlongedBlur,
                    Severity::Medium,
                    format!("Window unfocused for {}s", duration_ms / 1000),
                );
            }
        })
    }

    pub fn record_right_click(&self, session_id: Uuid) -> Result<(), AppError> {
        self.with_session(session_id, |s| {
            s.push_event("right_click", Value::Null);
        })
    }

    pub fn record_keyboard_shortcut(&self, session_id: Uuid, keys: &str) -> Result<(), AppError> {
        self.with_session(session_id, |s| {
            s.push_event("keyboard_shortcut", json!({ "keys": keys }));
            let normalized = keys.to_lowercase();
            if FLAGGED_SHORTCUTS.iter().any(|f| normalized.contains(f)) {
                s.flag(
                    SuspicionKind::SuspiciousShortcut,
                    Severity::Low,
                    format!("Shortcut: {keys}"),
                );
            }
        })
    }

    pub fn record_identity_snapshot(
        &self,
        session_id: Uuid,
        face_detected: bool,
        confidence: f64,
        metadata: Value,
    ) -> Result<(), AppError> {
        self.with_session(session_id, |s| {
            s.push_event(
                "identity_snapshot",
                json!({ "face_detected": face_detected, "confidence": confidence }),
            );
            s.snapshots.push(IdentitySnapshot {
                face_detected,
                confidence,
                metadata,
                at: Utc::now(),
            });
            if !face_detected {
                s.flag(
                    SuspicionKind::FaceNotDetected,
                    Severity::High,
                    format!("No face detected (confidence {confidence:.2})"),
                );
            }
        })
    }

    /// Last write wins; the fingerprint is identity metadata, not an event
    /// counter.
    pub fn record_browser_fingerprint(
        &self,
        session_id: Uuid,
        fingerprint: &str,
    ) -> Result<(), AppError> {
        self.with_session(session_id, |s| {
            s.push_event("browser_fingerprint", json!({ "fingerprint": fingerprint }));
            s.fingerprint = Some(fingerprint.to_string());
        })
    }

    /// Dispatches one client-submitted event to the matching record call.
    pub fn apply(&self, session_id: Uuid, event: ClientEvent) -> Result<(), AppError> {
        match event {
            ClientEvent::TabSwitch => self.record_tab_switch(session_id),
            ClientEvent::CopyPaste { content } => self.record_copy_paste(session_id, &content),
            ClientEvent::WindowBlur { duration_ms } => {
                self.record_window_blur(session_id, duration_ms)
            }
            ClientEvent::RightClick => self.record_right_click(session_id),
            ClientEvent::KeyboardShortcut { keys } => {
                self.record_keyboard_shortcut(session_id, &keys)
            }
            ClientEvent::IdentitySnapshot {
                face_detected,
                confidence,
                metadata,
            } => self.record_identity_snapshot(session_id, face_detected, confidence, metadata),
            ClientEvent::BrowserFingerprint { fingerprint } => {
                self.record_browser_fingerprint(session_id, &fingerprint)
            }
        }
    }

    /// Current integrity score and risk for a live session.
    pub fn integrity_score(&self, session_id: Uuid) -> Result<(u8, RiskLevel), AppError> {
        let session = self
            .sessions
            .get(&session_id)
            .ok_or_else(|| AppError::NotFound(format!("anti-cheat session {session_id}")))?;
        let score = integrity_score_for(&session, &self.weights);
        Ok((score, risk_for(score, &self.weights)))
    }

    /// Finalizes and evicts the live record, returning the durable summary.
    ///
    /// A missing record (e.g. after a process restart) finalizes as an empty
    /// session: no counters, no snapshots — the zero-snapshot flag and
    /// penalty still apply, so the gap is visible in the report.
    pub fn end_session(&self, session_id: Uuid, candidate_id: Uuid) -> IntegritySummary {
        let mut session = self
            .sessions
            .remove(&session_id)
            .map(|(_, s)| s)
            .unwrap_or_else(|| AntiCheatSession::new(candidate_id));

        if session.snapshots.is_empty() {
            session.flag(
                SuspicionKind::NoIdentitySnapshots,
                Severity::High,
                "No identity snapshots were recorded during the session".to_string(),
            );
        }

        let ended_at = Utc::now();
        let score = integrity_score_for(&session, &self.weights);
        let risk = risk_for(score, &self.weights);

        info!(
            "Anti-cheat session {session_id} finalized: score={score}, risk={risk:?}, \
             tab_switches={}, copy_paste={}",
            session.tab_switches, session.copy_paste_attempts
        );

        IntegritySummary {
            session_id,
            candidate_id: session.candidate_id,
            started_at: session.started_at,
            ended_at,
            duration_secs: (ended_at - session.started_at).num_seconds(),
            tab_switches: session.tab_switches,
            copy_paste_attempts: session.copy_paste_attempts,
            identity_snapshots: session.snapshots.len(),
            events_recorded: session.events.len(),
            integrity_score: score,
            risk_level: risk,
            recommendation: IntegrityRecommendation::from(risk),
            suspicious_activity: session.suspicious,
            browser_fingerprint: session.fingerprint,
        }
    }

    /// Drops a live record without producing a summary (cancelled sessions).
    pub fn discard(&self, session_id: Uuid) {
        self.sessions.remove(&session_id);
    }

    fn with_session<F>(&self, session_id: Uuid, f: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut AntiCheatSession),
    {
        let mut session = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| AppError::NotFound(format!("anti-cheat session {session_id}")))?;
        f(&mut session);
        Ok(())
    }
}

/// Integrity score: start at 100, subtract per-counter and per-severity
/// penalties, clamp to [0, 100]. Counter-backed suspicion kinds are skipped
/// in the severity pass (their penalty is the counter deduction).
fn integrity_score_for(session: &AntiCheatSession, weights: &IntegrityWeights) -> u8 {
    let mut deduction: u32 = 0;

    deduction += session.tab_switches * weights.tab_switch;
    deduction += session.copy_paste_attempts * weights.copy_paste;

    for activity in &session.suspicious {
        if activity.kind.counter_backed() {
            continue;
        }
        deduction += match activity.severity {
            Severity::High => weights.high_severity,
            Severity::Medium => weights.medium_severity,
            Severity::Low => weights.low_severity,
        };
    }

    if session.snapshots.is_empty() {
        deduction += weights.missing_snapshots;
    }
    let faceless = session.snapshots.iter().filter(|s| !s.face_detected).count() as u32;
    deduction += faceless * weights.missing_face;

    100u32.saturating_sub(deduction).min(100) as u8
}

fn risk_for(score: u8, weights: &IntegrityWeights) -> RiskLevel {
    if score > weights.low_risk_over {
        RiskLevel::Low
    } else if score > weights.medium_risk_over {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}
