//! Postgres-backed stores.
//!
//! Session documents (questions, responses, evaluation, integrity summary)
//! live as JSONB columns; lifecycle fields are relational so the guarded
//! UPDATEs can serialize concurrent writers on the row itself.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::anticheat::IntegritySummary;
use crate::errors::AppError;
use crate::models::records::{ApplicationRecord, ApplicationStatus, JobRecord};
use crate::models::session::{
    Evaluation, InterviewSession, ResponseRecord, SessionStatus,
};
use crate::store::{RecordStore, SessionStore};

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SessionRow {
    id: Uuid,
    candidate_id: Uuid,
    job_id: Uuid,
    application_id: Uuid,
    questions: Value,
    responses: Value,
    status: String,
    current_question_index: i32,
    time_limit_minutes: i32,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    evaluation: Option<Value>,
    anticheat_summary: Option<Value>,
}

impl SessionRow {
    fn into_session(self) -> Result<InterviewSession, AppError> {
        let status = SessionStatus::parse(&self.status)
            .ok_or_else(|| anyhow!("Unknown session status '{}'", self.status))?;
        Ok(InterviewSession {
            id: self.id,
            candidate_id: self.candidate_id,
            job_id: self.job_id,
            application_id: self.application_id,
            questions: serde_json::from_value(self.questions)
                .context("Failed to decode session questions")
                .map_err(AppError::Internal)?,
            responses: serde_json::from_value(self.responses)
                .context("Failed to decode session responses")
                .map_err(AppError::Internal)?,
            status,
            current_question_index: self.current_question_index as usize,
            time_limit_minutes: self.time_limit_minutes as u32,
            started_at: self.started_at,
            completed_at: self.completed_at,
            evaluation: self
                .evaluation
                .map(serde_json::from_value)
                .transpose()
                .context("Failed to decode session evaluation")
                .map_err(AppError::Internal)?,
            anticheat_summary: self
                .anticheat_summary
                .map(serde_json::from_value)
                .transpose()
                .context("Failed to decode integrity summary")
                .map_err(AppError::Internal)?,
        })
    }
}

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> Result<Value, AppError> {
    serde_json::to_value(value)
        .map_err(|e| AppError::Internal(anyhow!("Failed to serialize {what}: {e}")))
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &InterviewSession) -> Result<(), AppError> {
        // A partial unique index on (application_id) WHERE status IN
        // ('pending','in_progress') backs the one-active-session invariant.
        let result = sqlx::query(
            r#"
            INSERT INTO interview_sessions
                (id, candidate_id, job_id, application_id, questions, responses,
                 status, current_question_index, time_limit_minutes, started_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(session.id)
        .bind(session.candidate_id)
        .bind(session.job_id)
        .bind(session.application_id)
        .bind(to_json(&session.questions, "questions")?)
        .bind(to_json(&session.responses, "responses")?)
        .bind(session.status.as_str())
        .bind(session.current_question_index as i32)
        .bind(session.time_limit_minutes as i32)
        .bind(session.started_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                "An interview session is already active for this application".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, session_id: Uuid) -> Result<Option<InterviewSession>, AppError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, candidate_id, job_id, application_id, questions, responses,
                   status, current_question_index, time_limit_minutes, started_at,
                   completed_at, evaluation, anticheat_summary
            FROM interview_sessions
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SessionRow::into_session).transpose()
    }

    async fn find_active_for_application(
        &self,
        application_id: Uuid,
    ) -> Result<Option<Uuid>, AppError> {
        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM interview_sessions
            WHERE application_id = $1 AND status IN ('pending', 'in_progress')
            "#,
        )
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn append_response(
        &self,
        session_id: Uuid,
        expected_index: usize,
        response: &ResponseRecord,
    ) -> Result<bool, AppError> {
        // Optimistic check: the write applies only if the index still matches
        // and the session is still in progress. A concurrent duplicate
        // submission loses the race and affects zero rows.
        let result = sqlx::query(
            r#"
            UPDATE interview_sessions
            SET responses = responses || $3::jsonb,
                current_question_index = current_question_index + 1
            WHERE id = $1
              AND status = 'in_progress'
              AND current_question_index = $2
            "#,
        )
        .bind(session_id)
        .bind(expected_index as i32)
        .bind(to_json(response, "response")?)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn finalize(
        &self,
        session_id: Uuid,
        evaluation: &Evaluation,
        summary: &IntegritySummary,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE interview_sessions
            SET status = 'completed',
                completed_at = $2,
                evaluation = $3,
                anticheat_summary = $4
            WHERE id = $1 AND status = 'in_progress'
            "#,
        )
        .bind(session_id)
        .bind(completed_at)
        .bind(to_json(evaluation, "evaluation")?)
        .bind(to_json(summary, "integrity summary")?)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn cancel(&self, session_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE interview_sessions
            SET status = 'cancelled', completed_at = $2
            WHERE id = $1 AND status IN ('pending', 'in_progress')
            "#,
        )
        .bind(session_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn job(&self, job_id: Uuid) -> Result<Option<JobRecord>, AppError> {
        let job = sqlx::query_as(
            r#"
            SELECT id, title, description, required_skills, experience_level,
                   status, interview_time_limit_minutes, interview_question_count
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn application(
        &self,
        application_id: Uuid,
    ) -> Result<Option<ApplicationRecord>, AppError> {
        let application = sqlx::query_as(
            r#"
            SELECT id, candidate_id, job_id, status, final_score
            FROM applications
            WHERE id = $1
            "#,
        )
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(application)
    }

    async fn set_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE applications SET status = $2 WHERE id = $1")
            .bind(application_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_final_score(
        &self,
        application_id: Uuid,
        score: f64,
        status: ApplicationStatus,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE applications SET status = $2, final_score = $3 WHERE id = $1")
            .bind(application_id)
            .bind(status.as_str())
            .bind(score)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
