//! Persistence seams for sessions and job/application records.
//!
//! The Session Manager depends on these traits, not on Postgres; `postgres`
//! backs production and `memory` backs the test suite with identical guarded
//! write semantics.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::anticheat::IntegritySummary;
use crate::errors::AppError;
use crate::models::records::{ApplicationRecord, ApplicationStatus, JobRecord};
use crate::models::session::{Evaluation, InterviewSession, ResponseRecord};

/// Store for interview sessions. Writes to one session are serialized by the
/// backend: mutations carry their expected precondition and report `false`
/// when the record moved underneath them instead of applying twice.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a new session. Fails `Conflict` when a non-terminal session
    /// already exists for the same application.
    async fn insert(&self, session: &InterviewSession) -> Result<(), AppError>;

    async fn get(&self, session_id: Uuid) -> Result<Option<InterviewSession>, AppError>;

    /// Id of the non-terminal session for an application, if any.
    async fn find_active_for_application(
        &self,
        application_id: Uuid,
    ) -> Result<Option<Uuid>, AppError>;

    /// Appends a response and advances the index in one guarded write.
    /// Returns `false` when the optimistic check fails (index already
    /// advanced or session no longer in progress) — the caller must not
    /// have scored twice by then, so it maps this to `InvalidArgument`.
    async fn append_response(
        &self,
        session_id: Uuid,
        expected_index: usize,
        response: &ResponseRecord,
    ) -> Result<bool, AppError>;

    /// Transitions `in_progress → completed`, persisting the evaluation and
    /// integrity summary. Returns `false` when the session was not in
    /// progress (already terminal) — completion idempotency is handled above.
    async fn finalize(
        &self,
        session_id: Uuid,
        evaluation: &Evaluation,
        summary: &IntegritySummary,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Transitions a non-terminal session to `cancelled`. Returns `false`
    /// when the session was already terminal.
    async fn cancel(&self, session_id: Uuid) -> Result<bool, AppError>;
}

/// Read/update access to the job and application records owned by the wider
/// platform. Assumed transactional at the single-record level.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn job(&self, job_id: Uuid) -> Result<Option<JobRecord>, AppError>;

    async fn application(
        &self,
        application_id: Uuid,
    ) -> Result<Option<ApplicationRecord>, AppError>;

    async fn set_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<(), AppError>;

    /// Records the final interview score and flips the application status in
    /// one update.
    async fn record_final_score(
        &self,
        application_id: Uuid,
        score: f64,
        status: ApplicationStatus,
    ) -> Result<(), AppError>;
}
