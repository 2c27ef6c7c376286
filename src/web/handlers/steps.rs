//! # Step Handlers

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::app::{StepUpdate, StepView, UserRole};
use crate::models::UserInfo;
use crate::web::response_types::{ApiError, ApiResult};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub role: String,
}

/// Update a step's selections: PATCH /api/v1/steps/{step_number}
pub async fn update_step(
    State(state): State<AppState>,
    Path(step_number): Path<u32>,
    Json(update): Json<StepUpdate>,
) -> ApiResult<Json<StepView>> {
    Ok(Json(state.app.update_step(step_number, update).await?))
}

/// Candidates for a step's user selector: GET /api/v1/steps/{step_number}/users?role=
pub async fn available_users(
    State(state): State<AppState>,
    Path(step_number): Path<u32>,
    Query(query): Query<UsersQuery>,
) -> ApiResult<Json<Vec<UserInfo>>> {
    let role: UserRole = query.role.parse().map_err(ApiError::bad_request)?;
    Ok(Json(state.app.available_users(step_number, role).await?))
}
