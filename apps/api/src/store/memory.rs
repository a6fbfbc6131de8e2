//! In-memory stores implementing the same traits and the same guarded-write
//! semantics as the Postgres backends. They serialize per-store mutations
//! under a write lock, which is where the optimistic checks run.

#![allow(dead_code)] // constructed by the test suites, not by the binary

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::anticheat::IntegritySummary;
use crate::errors::AppError;
use crate::models::records::{ApplicationRecord, ApplicationStatus, JobRecord};
use crate::models::session::{Evaluation, InterviewSession, ResponseRecord, SessionStatus};
use crate::store::{RecordStore, SessionStore};

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, InterviewSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: &InterviewSession) -> Result<(), AppError> {
        let mut sessions = self.sessions.write().await;
        let duplicate = sessions
            .values()
            .any(|s| s.application_id == session.application_id && !s.status.is_terminal());
        if duplicate {
            return Err(AppError::Conflict(
                "An interview session is already active for this application".to_string(),
            ));
        }
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get(&self, session_id: Uuid) -> Result<Option<InterviewSession>, AppError> {
        Ok(self.sessions.read().await.get(&session_id).cloned())
    }

    async fn find_active_for_application(
        &self,
        application_id: Uuid,
    ) -> Result<Option<Uuid>, AppError> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .find(|s| s.application_id == application_id && !s.status.is_terminal())
            .map(|s| s.id))
    }

    async fn append_response(
        &self,
        session_id: Uuid,
        expected_index: usize,
        response: &ResponseRecord,
    ) -> Result<bool, AppError> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&session_id) else {
            return Ok(false);
        };
        if session.status != SessionStatus::InProgress
            || session.current_question_index != expected_index
        {
            return Ok(false);
        }
        session.responses.push(response.clone());
        session.current_question_index += 1;
        Ok(true)
    }

    async fn finalize(
        &self,
        session_id: Uuid,
        evaluation: &Evaluation,
        summary: &IntegritySummary,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&session_id) else {
            return Ok(false);
        };
        if session.status != SessionStatus::InProgress {
            return Ok(false);
        }
        session.status = SessionStatus::Completed;
        session.completed_at = Some(completed_at);
        session.evaluation = Some(evaluation.clone());
        session.anticheat_summary = Some(summary.clone());
        Ok(true)
    }

    async fn cancel(&self, session_id: Uuid) -> Result<bool, AppError> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&session_id) else {
            return Ok(false);
        };
        if session.status.is_terminal() {
            return Ok(false);
        }
        session.status = SessionStatus::Cancelled;
        session.completed_at = Some(Utc::now());
        Ok(true)
    }
}

#[derive(Default)]
pub struct InMemoryRecordStore {
    jobs: RwLock<HashMap<Uuid, JobRecord>>,
    applications: RwLock<HashMap<Uuid, ApplicationRecord>>,
    application_updates: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_job(&self, job: JobRecord) {
        self.jobs.write().await.insert(job.id, job);
    }

    pub async fn insert_application(&self, application: ApplicationRecord) {
        self.applications
            .write()
            .await
            .insert(application.id, application);
    }

    /// Number of application status/score updates applied so far.
    pub fn application_updates(&self) -> usize {
        self.application_updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn job(&self, job_id: Uuid) -> Result<Option<JobRecord>, AppError> {
        Ok(self.jobs.read().await.get(&job_id).cloned())
    }

    async fn application(
        &self,
        application_id: Uuid,
    ) -> Result<Option<ApplicationRecord>, AppError> {
        Ok(self.applications.read().await.get(&application_id).cloned())
    }

    async fn set_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<(), AppError> {
        let mut applications = self.applications.write().await;
        let application = applications
            .get_mut(&application_id)
            .ok_or_else(|| AppError::NotFound(format!("application {application_id}")))?;
        application.status = status.as_str().to_string();
        self.application_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn record_final_score(
        &self,
        application_id: Uuid,
        score: f64,
        status: ApplicationStatus,
    ) -> Result<(), AppError> {
        let mut applications = self.applications.write().await;
        let application = applications
            .get_mut(&application_id)
            .ok_or_else(|| AppError::NotFound(format!("application {application_id}")))?;
        application.status = status.as_str().to_string();
        application.final_score = Some(score);
        self.application_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(application_id: Uuid) -> InterviewSession {
        InterviewSession::new(Uuid::new_v4(), Uuid::new_v4(), application_id, vec![], 60)
    }

    fn response(index: usize) -> ResponseRecord {
        ResponseRecord {
            question_index: index,
            answer: "something".to_string(),
            time_taken_secs: 30,
            score: 70,
            feedback: "ok".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_second_active_for_application() {
        let store = InMemorySessionStore::new();
        let application_id = Uuid::new_v4();
        store.insert(&session(application_id)).await.unwrap();
        let err = store.insert(&session(application_id)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_insert_allows_new_session_after_terminal() {
        let store = InMemorySessionStore::new();
        let application_id = Uuid::new_v4();
        let first = session(application_id);
        store.insert(&first).await.unwrap();
        assert!(store.cancel(first.id).await.unwrap());
        store.insert(&session(application_id)).await.unwrap();
    }

    #[tokio::test]
    async fn test_append_response_optimistic_check() {
        let store = InMemorySessionStore::new();
        let s = session(Uuid::new_v4());
        store.insert(&s).await.unwrap();

        assert!(store.append_response(s.id, 0, &response(0)).await.unwrap());
        // Stale expected index loses the race.
        assert!(!store.append_response(s.id, 0, &response(0)).await.unwrap());

        let stored = store.get(s.id).await.unwrap().unwrap();
        assert_eq!(stored.responses.len(), 1);
        assert_eq!(stored.current_question_index, 1);
    }

    #[tokio::test]
    async fn test_cancel_is_rejected_on_terminal_session() {
        let store = InMemorySessionStore::new();
        let s = session(Uuid::new_v4());
        store.insert(&s).await.unwrap();
        assert!(store.cancel(s.id).await.unwrap());
        assert!(!store.cancel(s.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_record_store_counts_updates() {
        let store = InMemoryRecordStore::new();
        let application = ApplicationRecord {
            id: Uuid::new_v4(),
            candidate_id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            status: "applied".to_string(),
            final_score: None,
        };
        store.insert_application(application.clone()).await;

        store
            .set_application_status(application.id, ApplicationStatus::Interviewing)
            .await
            .unwrap();
        store
            .record_final_score(application.id, 82.0, ApplicationStatus::Interviewed)
            .await
            .unwrap();

        assert_eq!(store.application_updates(), 2);
        let stored = store.application(application.id).await.unwrap().unwrap();
        assert_eq!(stored.status, "interviewed");
        assert_eq!(stored.final_score, Some(82.0));
    }
}
