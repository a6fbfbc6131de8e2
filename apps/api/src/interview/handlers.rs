use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::anticheat::ClientEvent;
use crate::errors::AppError;
use crate::interview::manager::{CompleteOutcome, StartOutcome, SubmitOutcome};
use crate::models::session::{Evaluation, InterviewSession};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StartInterviewRequest {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub application_id: Uuid,
}

#[derive(Deserialize)]
pub struct SubmitAnswerRequest {
    pub candidate_id: Uuid,
    pub question_index: usize,
    pub answer: String,
    pub time_taken_secs: u32,
    #[serde(default)]
    pub anticheat_events: Vec<ClientEvent>,
}

#[derive(Deserialize)]
pub struct CandidateQuery {
    pub candidate_id: Uuid,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub session: InterviewSession,
    pub evaluation: Evaluation,
}

/// POST /api/v1/interviews
pub async fn handle_start(
    State(state): State<AppState>,
    Json(req): Json<StartInterviewRequest>,
) -> Result<Json<StartOutcome>, AppError> {
    let outcome = state
        .manager
        .start(req.candidate_id, req.job_id, req.application_id)
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/interviews/:id/answers
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmitOutcome>, AppError> {
    let outcome = state
        .manager
        .submit_answer(
            session_id,
            req.candidate_id,
            req.question_index,
            &req.answer,
            req.time_taken_secs,
            req.anticheat_events,
        )
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/interviews/:id/complete
pub async fn handle_complete(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<CandidateQuery>,
) -> Result<Json<CompleteOutcome>, AppError> {
    let outcome = state.manager.complete(session_id, req.candidate_id).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/interviews/:id/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<CandidateQuery>,
) -> Result<Json<Value>, AppError> {
    state.manager.cancel(session_id, req.candidate_id).await?;
    Ok(Json(json!({ "session_id": session_id, "status": "cancelled" })))
}

/// GET /api/v1/interviews/:id/report
pub async fn handle_get_report(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<CandidateQuery>,
) -> Result<Json<ReportResponse>, AppError> {
    let (session, evaluation) = state
        .manager
        .get_report(session_id, params.candidate_id)
        .await?;
    Ok(Json(ReportResponse {
        session,
        evaluation,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Discrete anti-cheat ingestion — one endpoint per signal type, each event
// timestamped at receipt rather than batched.
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CopyPasteBody {
    pub content: String,
}

#[derive(Deserialize)]
pub struct WindowBlurBody {
    pub duration_ms: u64,
}

#[derive(Deserialize)]
pub struct KeyboardShortcutBody {
    pub keys: String,
}

#[derive(Deserialize)]
pub struct IdentitySnapshotBody {
    pub face_detected: bool,
    pub confidence: f64,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Deserialize)]
pub struct FingerprintBody {
    pub fingerprint: String,
}

fn recorded(session_id: Uuid) -> Json<Value> {
    Json(json!({ "session_id": session_id, "recorded": true }))
}

/// POST /api/v1/interviews/:id/anticheat/tab-switch
pub async fn handle_tab_switch(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.anticheat.record_tab_switch(session_id)?;
    Ok(recorded(session_id))
}

/// POST /api/v1/interviews/:id/anticheat/copy-paste
pub async fn handle_copy_paste(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<CopyPasteBody>,
) -> Result<Json<Value>, AppError> {
    state.anticheat.record_copy_paste(session_id, &body.content)?;
    Ok(recorded(session_id))
}

/// POST /api/v1/interviews/:id/anticheat/window-blur
pub async fn handle_window_blur(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<WindowBlurBody>,
) -> Result<Json<Value>, AppError> {
    state
        .anticheat
        .record_window_blur(session_id, body.duration_ms)?;
    Ok(recorded(session_id))
}

/// POST /api/v1/interviews/:id/anticheat/right-click
pub async fn handle_right_click(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.anticheat.record_right_click(session_id)?;
    Ok(recorded(session_id))
}

/// POST /api/v1/interviews/:id/anticheat/keyboard-shortcut
pub async fn handle_keyboard_shortcut(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<KeyboardShortcutBody>,
) -> Result<Json<Value>, AppError> {
    state
        .anticheat
        .record_keyboard_shortcut(session_id, &body.keys)?;
    Ok(recorded(session_id))
}

/// POST /api/v1/interviews/:id/anticheat/identity-snapshot
pub async fn handle_identity_snapshot(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<IdentitySnapshotBody>,
) -> Result<Json<Value>, AppError> {
    state.anticheat.record_identity_snapshot(
        session_id,
        body.face_detected,
        body.confidence,
        body.metadata,
    )?;
    Ok(recorded(session_id))
}

/// POST /api/v1/interviews/:id/anticheat/fingerprint
pub async fn handle_fingerprint(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<FingerprintBody>,
) -> Result<Json<Value>, AppError> {
    state
        .anticheat
        .record_browser_fingerprint(session_id, &body.fingerprint)?;
    Ok(recorded(session_id))
}
