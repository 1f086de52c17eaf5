//! HTTP REST endpoints for third-party access
//!
//! Read-only; toggling goes through the WebSocket method-call interface.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use deckshot_protocol::{ApiError, BackendStatus};
use std::sync::Arc;

use crate::state::BackendState;

/// GET /api/status
pub async fn get_status(State(state): State<Arc<BackendState>>) -> impl IntoResponse {
    let mut supervisor = state.supervisor.lock().await;

    Json(BackendStatus {
        running: supervisor.is_running(),
        enabled: supervisor.config().is_enabled().unwrap_or(false),
        config_path: supervisor.config().path().display().to_string(),
    })
}

/// GET /api/config
pub async fn get_config(State(state): State<Arc<BackendState>>) -> impl IntoResponse {
    let supervisor = state.supervisor.lock().await;

    match supervisor.config().read_summary() {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError { error: e.to_string() }),
        )
            .into_response(),
    }
}
