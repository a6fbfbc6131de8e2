pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::interview::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Interview lifecycle
        .route("/api/v1/interviews", post(handlers::handle_start))
        .route(
            "/api/v1/interviews/:id/answers",
            post(handlers::handle_submit_answer),
        )
        .route(
            "/api/v1/interviews/:id/complete",
            post(handlers::handle_complete),
        )
        .route(
            "/api/v1/interviews/:id/cancel",
            post(handlers::handle_cancel),
        )
        .route(
            "/api/v1/interviews/:id/report",
            get(handlers::handle_get_report),
        )
        // Discrete anti-cheat ingestion, one endpoint per signal type
        .route(
            "/api/v1/interviews/:id/anticheat/tab-switch",
            post(handlers::handle_tab_switch),
        )
        .route(
            "/api/v1/interviews/:id/anticheat/copy-paste",
            post(handlers::handle_copy_paste),
        )
        .route(
            "/api/v1/interviews/:id/anticheat/window-blur",
            post(handlers::handle_window_blur),
        )
        .route(
            "/api/v1/interviews/:id/anticheat/right-click",
            post(handlers::handle_right_click),
        )
        .route(
            "/api/v1/interviews/:id/anticheat/keyboard-shortcut",
            post(handlers::handle_keyboard_shortcut),
        )
        .route(
            "/api/v1/interviews/:id/anticheat/identity-snapshot",
            post(handlers::handle_identity_snapshot),
        )
        .route(
            "/api/v1/interviews/:id/anticheat/fingerprint",
            post(handlers::handle_fingerprint),
        )
        .with_state(state)
}
