use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::anticheat::IntegritySummary;

/// Lifecycle state of one interview attempt.
///
/// `Pending → InProgress → Completed`, with `Cancelled` reachable from the
/// two non-terminal states. `Completed` and `Cancelled` are terminal: no
/// further transition is permitted and their payloads are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SessionStatus::Pending),
            "in_progress" => Some(SessionStatus::InProgress),
            "completed" => Some(SessionStatus::Completed),
            "cancelled" => Some(SessionStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    Behavioral,
    Technical,
    Coding,
    Situational,
    /// Parse default when the generation output carries no usable type line.
    General,
}

impl QuestionCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "behavioral" => Some(QuestionCategory::Behavioral),
            "technical" => Some(QuestionCategory::Technical),
            "coding" => Some(QuestionCategory::Coding),
            "situational" => Some(QuestionCategory::Situational),
            "general" => Some(QuestionCategory::General),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionCategory::Behavioral => "behavioral",
            QuestionCategory::Technical => "technical",
            QuestionCategory::Coding => "coding",
            QuestionCategory::Situational => "situational",
            QuestionCategory::General => "general",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// One interview question in the ordered set for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub index: usize,
    pub text: String,
    pub category: QuestionCategory,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_reason: Option<String>,
}

/// One scored answer. Created exactly once per question index; immutable after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub question_index: usize,
    pub answer: String,
    pub time_taken_secs: u32,
    /// Overall score for this answer, 0–100.
    pub score: u8,
    pub feedback: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiringDecision {
    StronglyRecommend,
    Recommend,
    Neutral,
    NotRecommend,
}

/// Final multi-dimensional evaluation for a completed session.
/// Created once at completion and never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub overall_score: u8,
    pub technical_score: u8,
    pub communication_score: u8,
    pub confidence_score: u8,
    pub problem_solving_score: u8,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendation: String,
    pub hiring_decision: HiringDecision,
}

/// One candidate's attempt at a job's automated interview.
///
/// Invariant: `responses.len() == current_question_index` at all times — a
/// response append and the index advance are a single guarded write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub application_id: Uuid,
    pub questions: Vec<Question>,
    pub responses: Vec<ResponseRecord>,
    pub status: SessionStatus,
    pub current_question_index: usize,
    pub time_limit_minutes: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub evaluation: Option<Evaluation>,
    pub anticheat_summary: Option<IntegritySummary>,
}

impl InterviewSession {
    pub fn new(
        candidate_id: Uuid,
        job_id: Uuid,
        application_id: Uuid,
        questions: Vec<Question>,
        time_limit_minutes: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_id,
            job_id,
            application_id,
            questions,
            responses: Vec::new(),
            status: SessionStatus::InProgress,
            current_question_index: 0,
            time_limit_minutes,
            started_at: Utc::now(),
            completed_at: None,
            evaluation: None,
            anticheat_summary: None,
        }
    }

    pub fn is_last_question(&self, index: usize) -> bool {
        index + 1 >= self.questions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrips_through_str() {
        for status in [
            SessionStatus::Pending,
            SessionStatus::InProgress,
            SessionStatus::Completed,
            SessionStatus::Cancelled,
        ] {
            assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SessionStatus::parse("archived"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(!SessionStatus::Pending.is_terminal());
        assert!(!SessionStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_new_session_starts_in_progress_at_index_zero() {
        let session = InterviewSession::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![],
            60,
        );
        assert_eq!(session.status, SessionStatus::InProgress);
        assert_eq!(session.current_question_index, 0);
        assert!(session.responses.is_empty());
        assert!(session.evaluation.is_none());
    }

    #[test]
    fn test_hiring_decision_serializes_snake_case() {
        let json = serde_json::to_string(&HiringDecision::StronglyRecommend).unwrap();
        assert_eq!(json, r#""strongly_recommend""#);
    }

    #[test]
    fn test_question_category_parse_defaults_are_case_insensitive() {
        assert_eq!(
            QuestionCategory::parse("Technical"),
            Some(QuestionCategory::Technical)
        );
        assert_eq!(QuestionCategory::parse("  coding "), Some(QuestionCategory::Coding));
        assert_eq!(QuestionCategory::parse("trivia"), None);
    }
}
