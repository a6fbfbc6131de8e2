use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Job posting as read from the record store. Only the fields the interview
/// engine consumes — the full job CRUD surface lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub experience_level: String,
    /// "open" | "closed"
    pub status: String,
    pub interview_time_limit_minutes: Option<i32>,
    pub interview_question_count: Option<i32>,
}

impl JobRecord {
    pub fn is_open(&self) -> bool {
        self.status == "open"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Interviewing,
    Interviewed,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Interviewing => "interviewing",
            ApplicationStatus::Interviewed => "interviewed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRecord {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub status: String,
    pub final_score: Option<f64>,
}

/// Job context threaded into generation and evaluation prompts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobContext {
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub experience_level: String,
}

impl From<&JobRecord> for JobContext {
    fn from(job: &JobRecord) -> Self {
        Self {
            title: job.title.clone(),
            description: job.description.clone(),
            required_skills: job.required_skills.clone(),
            experience_level: job.experience_level.clone(),
        }
    }
}
