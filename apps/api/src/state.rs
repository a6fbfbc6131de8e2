use std::sync::Arc;

use crate::anticheat::AntiCheatTracker;
use crate::interview::SessionManager;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// The manager owns every collaborator that touches session state; the
/// tracker is exposed directly only for the discrete anti-cheat ingestion
/// endpoints.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SessionManager>,
    pub anticheat: Arc<AntiCheatTracker>,
}
