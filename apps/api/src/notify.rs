//! Best-effort notification sender. Delivery failure is logged and swallowed:
//! notifying is never allowed to abort the interview flow.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::models::session::{Evaluation, InterviewSession};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn interview_completed(&self, session: &InterviewSession, evaluation: &Evaluation);
}

/// Default when no webhook is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn interview_completed(&self, session: &InterviewSession, _evaluation: &Evaluation) {
        debug!(
            "Notification skipped (no webhook configured) for session {}",
            session.id
        );
    }
}

/// POSTs a completion event to a configured webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn interview_completed(&self, session: &InterviewSession, evaluation: &Evaluation) {
        let payload = json!({
            "event": "interview.completed",
            "session_id": session.id,
            "candidate_id": session.candidate_id,
            "job_id": session.job_id,
            "application_id": session.application_id,
            "overall_score": evaluation.overall_score,
            "hiring_decision": evaluation.hiring_decision,
        });

        match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Completion notification delivered for session {}", session.id);
            }
            Ok(response) => {
                warn!(
                    "Completion notification for session {} returned {}",
                    session.id,
                    response.status()
                );
            }
            Err(e) => {
                warn!(
                    "Completion notification for session {} failed: {e}",
                    session.id
                );
            }
        }
    }
}
