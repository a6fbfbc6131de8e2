//! Session lifecycle orchestration.
//!
//! Flow: start → generate questions → session created (paired anti-cheat
//! tracking) → submit answers one by one (evaluate, guarded append, merge
//! anti-cheat events) → complete (synthesize report, finalize integrity
//! summary, propagate score) — `Cancelled` reachable from any non-terminal
//! state through the abandonment endpoint.
//!
//! This is the only component that mutates session state. Validation and
//! authorization errors surface with stable codes; external-service failures
//! never do — the adapter and evaluator absorb them.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::anticheat::{AntiCheatTracker, ClientEvent, RiskLevel};
use crate::config::{DecisionThresholds, InterviewDefaults};
use crate::errors::AppError;
use crate::evaluation::{evaluate_answer, synthesize_report};
use crate::llm_client::TextGenerator;
use crate::models::records::{ApplicationStatus, JobContext};
use crate::models::session::{
    Evaluation, InterviewSession, Question, QuestionCategory, ResponseRecord, SessionStatus,
};
use crate::notify::Notifier;
use crate::questions::generate_questions;
use crate::store::{RecordStore, SessionStore};

/// Result of starting an interview.
#[derive(Debug, Serialize)]
pub struct StartOutcome {
    pub session_id: Uuid,
    pub questions: Vec<Question>,
    pub time_limit_minutes: u32,
    pub first_question: Question,
}

/// Result of submitting one answer.
#[derive(Debug, Serialize)]
pub struct SubmitOutcome {
    pub next_question: Option<Question>,
    pub is_last_question: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity_warning: Option<String>,
}

/// Result of completing an interview.
#[derive(Debug, Serialize)]
pub struct CompleteOutcome {
    pub session_id: Uuid,
    pub overall_score: u8,
    pub report_available: bool,
}

pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    records: Arc<dyn RecordStore>,
    llm: Arc<dyn TextGenerator>,
    anticheat: Arc<AntiCheatTracker>,
    notifier: Arc<dyn Notifier>,
    defaults: InterviewDefaults,
    thresholds: DecisionThresholds,
}

impl SessionManager {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        records: Arc<dyn RecordStore>,
        llm: Arc<dyn TextGenerator>,
        anticheat: Arc<AntiCheatTracker>,
        notifier: Arc<dyn Notifier>,
        defaults: InterviewDefaults,
        thresholds: DecisionThresholds,
    ) -> Self {
        Self {
            sessions,
            records,
            llm,
            anticheat,
            notifier,
            defaults,
            thresholds,
        }
    }

    /// Starts an interview for an application. Fails `Conflict` when a
    /// non-terminal session already exists for the application.
    pub async fn start(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
        application_id: Uuid,
    ) -> Result<StartOutcome, AppError> {
        let job = self
            .records
            .job(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("job {job_id}")))?;
        if !job.is_open() {
            return Err(AppError::InvalidState(
                "This job is no longer accepting interviews".to_string(),
            ));
        }

        let application = self
            .records
            .application(application_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("application {application_id}")))?;
        if application.candidate_id != candidate_id {
            return Err(AppError::Forbidden);
        }
        if application.job_id != job_id {
            return Err(AppError::InvalidArgument(
                "Application does not belong to this job".to_string(),
            ));
        }

        if self
            .sessions
            .find_active_for_application(application_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "An interview session is already active for this application".to_string(),
            ));
        }

        let count = job
            .interview_question_count
            .map(|c| c.max(0) as usize)
            .unwrap_or(self.defaults.question_count);
        let job_context = JobContext::from(&job);
        let questions =
            generate_questions(self.llm.as_ref(), &job_context, QuestionCategory::General, count)
                .await;

        let time_limit = job
            .interview_time_limit_minutes
            .map(|m| m.max(1) as u32)
            .unwrap_or(self.defaults.time_limit_minutes);

        let session =
            InterviewSession::new(candidate_id, job_id, application_id, questions, time_limit);
        // Insert re-checks the one-active-session invariant at write time;
        // a racing second start fails Conflict here.
        self.sessions.insert(&session).await?;
        self.anticheat.init(session.id, candidate_id);
        self.records
            .set_application_status(application_id, ApplicationStatus::Interviewing)
            .await?;

        info!(
            "Interview session {} started: candidate={candidate_id}, job={job_id}, {} questions, {} min",
            session.id,
            session.questions.len(),
            time_limit
        );

        let first_question = session.questions.first().cloned().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Question generation produced an empty set"))
        })?;
        Ok(StartOutcome {
            session_id: session.id,
            questions: session.questions,
            time_limit_minutes: time_limit,
            first_question,
        })
    }

    /// Scores and records one answer. The submitted index must equal the
    /// session's current index — no skipping, no duplicate submission.
    pub async fn submit_answer(
        &self,
        session_id: Uuid,
        candidate_id: Uuid,
        question_index: usize,
        answer: &str,
        time_taken_secs: u32,
        anticheat_events: Vec<ClientEvent>,
    ) -> Result<SubmitOutcome, AppError> {
        let session = self.load_owned(session_id, candidate_id).await?;

        if session.status != SessionStatus::InProgress {
            return Err(AppError::InvalidState(format!(
                "Session is {}, answers can no longer be submitted",
                session.status.as_str()
            )));
        }
        if question_index != session.current_question_index {
            return Err(AppError::InvalidArgument(format!(
                "Expected question index {}, got {question_index}",
                session.current_question_index
            )));
        }
        let question = session
            .questions
            .get(question_index)
            .ok_or_else(|| {
                AppError::InvalidArgument(format!("No question at index {question_index}"))
            })?
            .clone();

        let job_context = match self.records.job(session.job_id).await? {
            Some(job) => JobContext::from(&job),
            None => JobContext::default(),
        };

        // Total: degrades to a neutral band instead of failing.
        let score = evaluate_answer(self.llm.as_ref(), &question, answer, &job_context).await;
        let response = ResponseRecord {
            question_index,
            answer: answer.to_string(),
            time_taken_secs,
            score: score.overall(),
            feedback: score.feedback,
        };

        let applied = self
            .sessions
            .append_response(session_id, question_index, &response)
            .await?;
        if !applied {
            // Lost the optimistic race: the index advanced (or the session
            // went terminal) between the read and the write.
            return Err(AppError::InvalidArgument(format!(
                "Question {question_index} was already answered"
            )));
        }

        for event in anticheat_events {
            if let Err(e) = self.anticheat.apply(session_id, event) {
                warn!("Dropping anti-cheat event for session {session_id}: {e}");
            }
        }

        let is_last_question = session.is_last_question(question_index);
        let next_question = if is_last_question {
            None
        } else {
            session.questions.get(question_index + 1).cloned()
        };

        info!(
            "Session {session_id}: answer {question_index} scored {} ({}s taken)",
            response.score, time_taken_secs
        );

        Ok(SubmitOutcome {
            next_question,
            is_last_question,
            integrity_warning: self.integrity_warning(session_id),
        })
    }

    /// Completes the interview. Idempotent: a second call returns the stored
    /// evaluation without rescoring, re-notifying, or touching the
    /// application again.
    pub async fn complete(
        &self,
        session_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<CompleteOutcome, AppError> {
        let session = self.load_owned(session_id, candidate_id).await?;

        match session.status {
            SessionStatus::Completed => {
                let evaluation = session.evaluation.as_ref().ok_or_else(|| {
                    AppError::Internal(anyhow::anyhow!(
                        "Completed session {session_id} has no evaluation"
                    ))
                })?;
                // The session finalizes before the application write, so an
                // earlier attempt may have failed in between. Re-propagate the
                // stored score until the application reflects it.
                self.propagate_score_if_pending(&session, evaluation).await?;
                return Ok(CompleteOutcome {
                    session_id,
                    overall_score: evaluation.overall_score,
                    report_available: true,
                });
            }
            SessionStatus::Cancelled => {
                return Err(AppError::InvalidState(
                    "A cancelled interview cannot be completed".to_string(),
                ));
            }
            SessionStatus::Pending | SessionStatus::InProgress => {}
        }

        let job_context = match self.records.job(session.job_id).await? {
            Some(job) => JobContext::from(&job),
            None => JobContext::default(),
        };

        let evaluation = synthesize_report(
            self.llm.as_ref(),
            &session.questions,
            &session.responses,
            &job_context,
            &self.thresholds,
        )
        .await;
        let summary = self.anticheat.end_session(session_id, candidate_id);

        let applied = self
            .sessions
            .finalize(session_id, &evaluation, &summary, Utc::now())
            .await?;
        if !applied {
            // A concurrent complete won the race; serve its result.
            let session = self
                .sessions
                .get(session_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("session {session_id}")))?;
            let evaluation = session.evaluation.ok_or_else(|| {
                AppError::InvalidState("Session is no longer completable".to_string())
            })?;
            return Ok(CompleteOutcome {
                session_id,
                overall_score: evaluation.overall_score,
                report_available: true,
            });
        }

        self.records
            .record_final_score(
                session.application_id,
                evaluation.overall_score as f64,
                ApplicationStatus::Interviewed,
            )
            .await?;
        self.notifier.interview_completed(&session, &evaluation).await;

        info!(
            "Session {session_id} completed: overall={}, decision={:?}, integrity={} ({:?})",
            evaluation.overall_score,
            evaluation.hiring_decision,
            summary.integrity_score,
            summary.risk_level
        );

        Ok(CompleteOutcome {
            session_id,
            overall_score: evaluation.overall_score,
            report_available: true,
        })
    }

    /// Abandonment path: cancels a non-terminal session and drops its live
    /// anti-cheat record without producing a summary.
    pub async fn cancel(&self, session_id: Uuid, candidate_id: Uuid) -> Result<(), AppError> {
        let session = self.load_owned(session_id, candidate_id).await?;
        if session.status.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "Session is already {}",
                session.status.as_str()
            )));
        }
        if !self.sessions.cancel(session_id).await? {
            return Err(AppError::InvalidState(
                "Session is no longer cancellable".to_string(),
            ));
        }
        self.anticheat.discard(session_id);
        info!("Session {session_id} cancelled");
        Ok(())
    }

    /// Full session plus its evaluation, available once completed.
    pub async fn get_report(
        &self,
        session_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<(InterviewSession, Evaluation), AppError> {
        let session = self.load_owned(session_id, candidate_id).await?;
        if session.status != SessionStatus::Completed {
            return Err(AppError::InvalidState(
                "Report is only available for completed interviews".to_string(),
            ));
        }
        let evaluation = session.evaluation.clone().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Completed session {session_id} has no evaluation"
            ))
        })?;
        Ok((session, evaluation))
    }

    /// Applies the final score to the linked application unless it already
    /// reads `interviewed`. Keeps completion retries from writing twice.
    async fn propagate_score_if_pending(
        &self,
        session: &InterviewSession,
        evaluation: &Evaluation,
    ) -> Result<(), AppError> {
        let pending = self
            .records
            .application(session.application_id)
            .await?
            .map(|a| a.status != ApplicationStatus::Interviewed.as_str())
            .unwrap_or(false);
        if pending {
            warn!(
                "Session {} is completed but its application {} never received the final score, propagating now",
                session.id, session.application_id
            );
            self.records
                .record_final_score(
                    session.application_id,
                    evaluation.overall_score as f64,
                    ApplicationStatus::Interviewed,
                )
                .await?;
        }
        Ok(())
    }

    async fn load_owned(
        &self,
        session_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<InterviewSession, AppError> {
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("session {session_id}")))?;
        if session.candidate_id != candidate_id {
            return Err(AppError::Forbidden);
        }
        Ok(session)
    }

    /// Soft in-session warning once the live integrity score leaves the LOW
    /// risk band. Never a hard stop.
    fn integrity_warning(&self, session_id: Uuid) -> Option<String> {
        match self.anticheat.integrity_score(session_id) {
            Ok((_, RiskLevel::Low)) | Err(_) => None,
            Ok((score, _)) => Some(format!(
                "Suspicious activity has been detected in this session \
                 (integrity score {score}). Further violations will be \
                 reflected in your final report."
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IntegrityWeights;
    use crate::llm_client::testing::{FailingGenerator, RepeatingGenerator};
    use crate::models::records::{ApplicationRecord, JobRecord};
    use crate::notify::NoopNotifier;
    use crate::store::memory::{InMemoryRecordStore, InMemorySessionStore};
    use serde_json::Value;

    struct Fixture {
        manager: SessionManager,
        records: Arc<InMemoryRecordStore>,
        anticheat: Arc<AntiCheatTracker>,
        candidate_id: Uuid,
        job_id: Uuid,
        application_id: Uuid,
    }

    async fn fixture(llm: Arc<dyn TextGenerator>) -> Fixture {
        let sessions = Arc::new(InMemorySessionStore::new());
        let records = Arc::new(InMemoryRecordStore::new());
        let anticheat = Arc::new(AntiCheatTracker::new(IntegrityWeights::default()));

        let candidate_id = Uuid::new_v4();
        let job_id = Uuid::new_v4();
        let application_id = Uuid::new_v4();

        records
            .insert_job(JobRecord {
                id: job_id,
                title: "Backend Engineer".to_string(),
                description: "Build services.".to_string(),
                required_skills: vec!["Rust".to_string()],
                experience_level: "senior".to_string(),
                status: "open".to_string(),
                interview_time_limit_minutes: None,
                interview_question_count: None,
            })
            .await;
        records
            .insert_application(ApplicationRecord {
                id: application_id,
                candidate_id,
                job_id,
                status: "applied".to_string(),
                final_score: None,
            })
            .await;

        let manager = SessionManager::new(
            sessions,
            records.clone(),
            llm,
            anticheat.clone(),
            Arc::new(NoopNotifier),
            InterviewDefaults::default(),
            DecisionThresholds::default(),
        );

        Fixture {
            manager,
            records,
            anticheat,
            candidate_id,
            job_id,
            application_id,
        }
    }

    /// Scores every answer at a flat 80 through the labeled-line stage; the
    /// same reply is garbage to the question parser, forcing the fallback set.
    fn scoring_80_llm() -> Arc<dyn TextGenerator> {
        Arc::new(RepeatingGenerator(
            r#"{"technical": 80, "communication": 80, "confidence": 80, "problem_solving": 80, "feedback": "Good answer."}"#
                .to_string(),
        ))
    }

    #[tokio::test]
    async fn test_start_returns_first_question_and_flips_application() {
        let f = fixture(Arc::new(FailingGenerator)).await;
        let outcome = f
            .manager
            .start(f.candidate_id, f.job_id, f.application_id)
            .await
            .unwrap();

        assert_eq!(outcome.questions.len(), 5);
        assert_eq!(outcome.first_question.index, 0);
        assert_eq!(outcome.time_limit_minutes, 60);
        assert!(f.anticheat.is_tracking(outcome.session_id));

        let application = f.records.application(f.application_id).await.unwrap().unwrap();
        assert_eq!(application.status, "interviewing");
    }

    #[tokio::test]
    async fn test_second_start_for_same_application_conflicts() {
        let f = fixture(Arc::new(FailingGenerator)).await;
        f.manager
            .start(f.candidate_id, f.job_id, f.application_id)
            .await
            .unwrap();
        let err = f
            .manager
            .start(f.candidate_id, f.job_id, f.application_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_start_on_closed_job_is_invalid_state() {
        let f = fixture(Arc::new(FailingGenerator)).await;
        let mut job = f.records.job(f.job_id).await.unwrap().unwrap();
        job.status = "closed".to_string();
        f.records.insert_job(job).await;

        let err = f
            .manager
            .start(f.candidate_id, f.job_id, f.application_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_start_with_foreign_application_is_forbidden() {
        let f = fixture(Arc::new(FailingGenerator)).await;
        let err = f
            .manager
            .start(Uuid::new_v4(), f.job_id, f.application_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn test_submit_out_of_order_index_is_invalid_argument() {
        let f = fixture(Arc::new(FailingGenerator)).await;
        let started = f
            .manager
            .start(f.candidate_id, f.job_id, f.application_id)
            .await
            .unwrap();

        let err = f
            .manager
            .submit_answer(started.session_id, f.candidate_id, 2, "answer", 30, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_resubmitting_answered_index_fails_without_duplicate() {
        let f = fixture(Arc::new(FailingGenerator)).await;
        let started = f
            .manager
            .start(f.candidate_id, f.job_id, f.application_id)
            .await
            .unwrap();

        f.manager
            .submit_answer(started.session_id, f.candidate_id, 0, "first", 30, vec![])
            .await
            .unwrap();
        let err = f
            .manager
            .submit_answer(started.session_id, f.candidate_id, 0, "again", 30, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_full_interview_scenario_five_eighties() {
        // 5 questions, each scored 80, no violations, one valid snapshot:
        // overall 80, integrity 100, decision Recommend.
        let f = fixture(scoring_80_llm()).await;
        let started = f
            .manager
            .start(f.candidate_id, f.job_id, f.application_id)
            .await
            .unwrap();
        assert_eq!(started.questions.len(), 5);

        f.anticheat
            .record_identity_snapshot(started.session_id, true, 0.97, Value::Null)
            .unwrap();

        for index in 0..5 {
            let outcome = f
                .manager
                .submit_answer(
                    started.session_id,
                    f.candidate_id,
                    index,
                    "A thorough answer.",
                    45,
                    vec![],
                )
                .await
                .unwrap();
            assert!(outcome.integrity_warning.is_none());
            assert_eq!(outcome.is_last_question, index == 4);
            assert_eq!(outcome.next_question.is_some(), index < 4);
        }

        let completed = f
            .manager
            .complete(started.session_id, f.candidate_id)
            .await
            .unwrap();
        assert_eq!(completed.overall_score, 80);

        let (session, evaluation) = f
            .manager
            .get_report(started.session_id, f.candidate_id)
            .await
            .unwrap();
        assert_eq!(evaluation.hiring_decision, crate::models::session::HiringDecision::Recommend);
        let summary = session.anticheat_summary.unwrap();
        assert_eq!(summary.integrity_score, 100);
        assert!(!f.anticheat.is_tracking(started.session_id));
    }

    #[tokio::test]
    async fn test_complete_is_idempotent_and_updates_application_once() {
        let f = fixture(Arc::new(FailingGenerator)).await;
        let started = f
            .manager
            .start(f.candidate_id, f.job_id, f.application_id)
            .await
            .unwrap();

        for index in 0..5 {
            f.manager
                .submit_answer(started.session_id, f.candidate_id, index, "answer", 30, vec![])
                .await
                .unwrap();
        }

        let first = f
            .manager
            .complete(started.session_id, f.candidate_id)
            .await
            .unwrap();
        let updates_after_first = f.records.application_updates();
        let second = f
            .manager
            .complete(started.session_id, f.candidate_id)
            .await
            .unwrap();

        assert_eq!(first.overall_score, second.overall_score);
        assert_eq!(f.records.application_updates(), updates_after_first);

        let application = f.records.application(f.application_id).await.unwrap().unwrap();
        assert_eq!(application.status, "interviewed");
        assert_eq!(application.final_score, Some(first.overall_score as f64));
    }

    #[tokio::test]
    async fn test_submit_merges_anticheat_events_and_warns() {
        let f = fixture(Arc::new(FailingGenerator)).await;
        let started = f
            .manager
            .start(f.candidate_id, f.job_id, f.application_id)
            .await
            .unwrap();

        let events = vec![
            ClientEvent::CopyPaste {
                content: "pasted".to_string(),
            },
            ClientEvent::CopyPaste {
                content: "pasted more".to_string(),
            },
        ];
        let outcome = f
            .manager
            .submit_answer(started.session_id, f.candidate_id, 0, "answer", 30, events)
            .await
            .unwrap();
        // 100 - 2*15 - 20 (no snapshots yet) = 50 → not LOW risk.
        assert!(outcome.integrity_warning.is_some());
    }

    #[tokio::test]
    async fn test_cancelled_session_rejects_submit_and_complete() {
        let f = fixture(Arc::new(FailingGenerator)).await;
        let started = f
            .manager
            .start(f.candidate_id, f.job_id, f.application_id)
            .await
            .unwrap();

        f.manager
            .cancel(started.session_id, f.candidate_id)
            .await
            .unwrap();
        assert!(!f.anticheat.is_tracking(started.session_id));

        let err = f
            .manager
            .submit_answer(started.session_id, f.candidate_id, 0, "answer", 30, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let err = f
            .manager
            .complete(started.session_id, f.candidate_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let err = f
            .manager
            .cancel(started.session_id, f.candidate_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_report_before_completion_is_invalid_state() {
        let f = fixture(Arc::new(FailingGenerator)).await;
        let started = f
            .manager
            .start(f.candidate_id, f.job_id, f.application_id)
            .await
            .unwrap();
        let err = f
            .manager
            .get_report(started.session_id, f.candidate_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_wrong_candidate_is_forbidden() {
        let f = fixture(Arc::new(FailingGenerator)).await;
        let started = f
            .manager
            .start(f.candidate_id, f.job_id, f.application_id)
            .await
            .unwrap();
        let err = f
            .manager
            .submit_answer(started.session_id, Uuid::new_v4(), 0, "answer", 30, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let f = fixture(Arc::new(FailingGenerator)).await;
        let err = f
            .manager
            .complete(Uuid::new_v4(), f.candidate_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    /// Delegates to an in-memory record store but fails the first N final
    /// score writes, simulating a transient outage between the session
    /// finalize and the application update.
    struct FlakyRecordStore {
        inner: Arc<InMemoryRecordStore>,
        score_write_failures: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl crate::store::RecordStore for FlakyRecordStore {
        async fn job(&self, job_id: Uuid) -> Result<Option<JobRecord>, AppError> {
            self.inner.job(job_id).await
        }

        async fn application(
            &self,
            application_id: Uuid,
        ) -> Result<Option<ApplicationRecord>, AppError> {
            self.inner.application(application_id).await
        }

        async fn set_application_status(
            &self,
            application_id: Uuid,
            status: crate::models::records::ApplicationStatus,
        ) -> Result<(), AppError> {
            self.inner.set_application_status(application_id, status).await
        }

        async fn record_final_score(
            &self,
            application_id: Uuid,
            score: f64,
            status: crate::models::records::ApplicationStatus,
        ) -> Result<(), AppError> {
            use std::sync::atomic::Ordering;
            if self
                .score_write_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "record store temporarily unavailable"
                )));
            }
            self.inner.record_final_score(application_id, score, status).await
        }
    }

    #[tokio::test]
    async fn test_complete_retry_propagates_score_after_transient_store_failure() {
        let sessions = Arc::new(InMemorySessionStore::new());
        let records = Arc::new(InMemoryRecordStore::new());
        let flaky = Arc::new(FlakyRecordStore {
            inner: records.clone(),
            score_write_failures: std::sync::atomic::AtomicUsize::new(1),
        });
        let anticheat = Arc::new(AntiCheatTracker::new(IntegrityWeights::default()));

        let candidate_id = Uuid::new_v4();
        let job_id = Uuid::new_v4();
        let application_id = Uuid::new_v4();
        records
            .insert_job(JobRecord {
                id: job_id,
                title: "Backend Engineer".to_string(),
                description: "Build services.".to_string(),
                required_skills: vec!["Rust".to_string()],
                experience_level: "senior".to_string(),
                status: "open".to_string(),
                interview_time_limit_minutes: None,
                interview_question_count: None,
            })
            .await;
        records
            .insert_application(ApplicationRecord {
                id: application_id,
                candidate_id,
                job_id,
                status: "applied".to_string(),
                final_score: None,
            })
            .await;

        let manager = SessionManager::new(
            sessions,
            flaky,
            Arc::new(FailingGenerator),
            anticheat,
            Arc::new(NoopNotifier),
            InterviewDefaults::default(),
            DecisionThresholds::default(),
        );

        let started = manager.start(candidate_id, job_id, application_id).await.unwrap();
        for index in 0..started.questions.len() {
            manager
                .submit_answer(started.session_id, candidate_id, index, "answer", 30, vec![])
                .await
                .unwrap();
        }

        // First attempt finalizes the session, then fails the score write.
        let err = manager.complete(started.session_id, candidate_id).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        let application = records.application(application_id).await.unwrap().unwrap();
        assert_eq!(application.status, "interviewing");
        assert_eq!(application.final_score, None);

        // Retry serves the stored evaluation and catches the application up.
        let retried = manager.complete(started.session_id, candidate_id).await.unwrap();
        assert_eq!(retried.overall_score, 70);
        let application = records.application(application_id).await.unwrap().unwrap();
        assert_eq!(application.status, "interviewed");
        assert_eq!(application.final_score, Some(70.0));

        // A further retry finds nothing pending and writes nothing more.
        let updates = records.application_updates();
        manager.complete(started.session_id, candidate_id).await.unwrap();
        assert_eq!(records.application_updates(), updates);
    }

    #[tokio::test]
    async fn test_dead_upstream_still_runs_whole_interview() {
        // Generation and evaluation both fail upstream on every call; the
        // interview still runs end to end on fallbacks and neutral scores.
        let f = fixture(Arc::new(FailingGenerator)).await;
        let started = f
            .manager
            .start(f.candidate_id, f.job_id, f.application_id)
            .await
            .unwrap();

        for index in 0..started.questions.len() {
            f.manager
                .submit_answer(started.session_id, f.candidate_id, index, "answer", 20, vec![])
                .await
                .unwrap();
        }
        let completed = f
            .manager
            .complete(started.session_id, f.candidate_id)
            .await
            .unwrap();
        // Neutral evaluator band averages to 70.
        assert_eq!(completed.overall_score, 70);
    }
}
