//! # Workflow Handlers
//!
//! Settings panel, persistence, launch and status overview of the workflow.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::{debug, info};

use crate::app::WorkflowView;
use crate::web::response_types::ApiResult;
use crate::web::state::AppState;
use crate::workflow::{BoardSnapshot, SaveOutcome, SelectionRequirements};

#[derive(Debug, Deserialize)]
pub struct SelectProjectRequest {
    pub project_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SelectDatasetRequest {
    pub dataset_id: Option<i64>,
}

/// Full workflow view: GET /api/v1/workflow
pub async fn get_workflow(State(state): State<AppState>) -> Json<WorkflowView> {
    Json(state.app.view().await)
}

/// Choose the source project: POST /api/v1/workflow/project
pub async fn select_project(
    State(state): State<AppState>,
    Json(request): Json<SelectProjectRequest>,
) -> ApiResult<Json<WorkflowView>> {
    info!(project_id = request.project_id, "Selecting source project");
    Ok(Json(state.app.select_project(request.project_id).await?))
}

/// Choose the source dataset: POST /api/v1/workflow/dataset
pub async fn select_dataset(
    State(state): State<AppState>,
    Json(request): Json<SelectDatasetRequest>,
) -> ApiResult<Json<WorkflowView>> {
    Ok(Json(state.app.select_dataset(request.dataset_id).await?))
}

/// Toggle class and tag requirements: PUT /api/v1/workflow/requirements
pub async fn set_requirements(
    State(state): State<AppState>,
    Json(requirements): Json<SelectionRequirements>,
) -> Json<WorkflowView> {
    Json(state.app.set_requirements(requirements).await)
}

/// Persist the current selections: POST /api/v1/workflow/save
pub async fn save(State(state): State<AppState>) -> ApiResult<Json<SaveOutcome>> {
    Ok(Json(state.app.save().await?))
}

/// Reset, or reload the saved configuration: POST /api/v1/workflow/reset
pub async fn reset_or_update(State(state): State<AppState>) -> ApiResult<Json<WorkflowView>> {
    Ok(Json(state.app.reset_or_update().await?))
}

/// Start progression monitoring: POST /api/v1/workflow/launch
pub async fn launch(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<BoardSnapshot>)> {
    let snapshot = state.app.launch().await?;
    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

/// Stop progression monitoring: DELETE /api/v1/workflow/monitor
///
/// Idempotent: answers 204 whether or not a monitor was running.
pub async fn close_overview(State(state): State<AppState>) -> StatusCode {
    let stopped = state.app.close_overview().await;
    debug!(stopped, "Progression overview closed");
    StatusCode::NO_CONTENT
}

/// Current status board: GET /api/v1/workflow/status
pub async fn get_status(State(state): State<AppState>) -> Json<BoardSnapshot> {
    Json(state.app.status())
}

/// Refresh the status board now: POST /api/v1/workflow/status/refresh
pub async fn refresh_status(State(state): State<AppState>) -> ApiResult<Json<BoardSnapshot>> {
    Ok(Json(state.app.refresh_now().await?))
}
