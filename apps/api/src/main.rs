mod anticheat;
mod config;
mod db;
mod errors;
mod evaluation;
mod interview;
mod llm_client;
mod models;
mod notify;
mod questions;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::anticheat::AntiCheatTracker;
use crate::config::Config;
use crate::db::create_pool;
use crate::interview::SessionManager;
use crate::llm_client::LlmClient;
use crate::notify::{Notifier, NoopNotifier, WebhookNotifier};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::postgres::{PgRecordStore, PgSessionStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Proctor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize LLM client
    let llm = Arc::new(LlmClient::new(config.anthropic_api_key.clone()));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Anti-cheat tracker: one explicit service object owning the keyed store
    let anticheat = Arc::new(AntiCheatTracker::new(config.integrity));

    // Best-effort notifier — webhook if configured, noop otherwise
    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => {
            info!("Completion notifications will be sent to {url}");
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => Arc::new(NoopNotifier),
    };

    // Session manager wires the stores, the LLM seam, and the tracker
    let manager = Arc::new(SessionManager::new(
        Arc::new(PgSessionStore::new(db.clone())),
        Arc::new(PgRecordStore::new(db)),
        llm,
        anticheat.clone(),
        notifier,
        config.defaults,
        config.thresholds,
    ));

    let state = AppState { manager, anticheat };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
