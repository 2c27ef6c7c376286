//! # Health Check Handlers

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::web::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    monitor_running: bool,
}

/// Basic health check endpoint: GET /health
///
/// Returns OK while the process is serving; also reports whether status
/// monitoring is active.
pub async fn basic_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        monitor_running: state.app.monitor().is_running(),
    })
}
