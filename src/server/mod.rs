//! Status API
//!
//! Read-only status plus the forced-resolicitation command. Handlers never
//! touch engine state directly: status is a copy-on-read snapshot and
//! resolicitation is enqueued onto the same serialized loop as scheduled
//! ticks.

use crate::engine::{EngineCommand, PeriodEngine, ResolicitResponse, StatusSnapshot};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// State shared across handlers
pub struct AppState {
    pub engine: Arc<PeriodEngine>,
    pub commands: mpsc::Sender<EngineCommand>,
}

async fn health_check() -> &'static str {
    "OK"
}

/// Aggregated engine state
async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusSnapshot> {
    Json(state.engine.status().await)
}

/// Enqueue a forced fetch+solicit cycle and wait for its result
async fn post_resolicit(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ResolicitResponse>, (StatusCode, String)> {
    let (reply_tx, reply_rx) = oneshot::channel();

    state
        .commands
        .send(EngineCommand::Resolicit { reply: reply_tx })
        .await
        .map_err(|_| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Engine loop not running".to_string(),
            )
        })?;

    match reply_rx.await {
        Ok(Ok(response)) => Ok(Json(response)),
        Ok(Err(e)) => Err((StatusCode::BAD_GATEWAY, e.to_string())),
        Err(_) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Engine loop dropped the request".to_string(),
        )),
    }
}

/// Create the status router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/resolicit", post(post_resolicit))
        .with_state(state)
}

/// Bind and serve until the process exits
pub async fn start_server(
    state: Arc<AppState>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Status server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
