//! # Web API
//!
//! JSON surface of the workflow application, served with axum.
//!
//! ## Endpoints
//!
//! - `GET /health`
//! - `GET /api/v1/workflow` and the settings, save, reset and launch commands under it
//! - `PATCH /api/v1/steps/{step_number}` and `GET /api/v1/steps/{step_number}/users`
//! - `GET /api/v1/workflow/status` for the status board

pub mod handlers;
pub mod response_types;
pub mod state;

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use std::sync::Arc;

use crate::app::LabelingApp;

pub use response_types::{ApiError, ApiResult};
pub use state::AppState;

/// Build the application router
pub fn create_app(app: Arc<LabelingApp>) -> Router {
    let workflow_routes = Router::new()
        .route("/workflow", get(handlers::workflow::get_workflow))
        .route("/workflow/project", post(handlers::workflow::select_project))
        .route("/workflow/dataset", post(handlers::workflow::select_dataset))
        .route("/workflow/requirements", put(handlers::workflow::set_requirements))
        .route("/workflow/save", post(handlers::workflow::save))
        .route("/workflow/reset", post(handlers::workflow::reset_or_update))
        .route("/workflow/launch", post(handlers::workflow::launch))
        .route("/workflow/monitor", delete(handlers::workflow::close_overview))
        .route("/workflow/status", get(handlers::workflow::get_status))
        .route("/workflow/status/refresh", post(handlers::workflow::refresh_status))
        .route("/steps/{step_number}", patch(handlers::steps::update_step))
        .route("/steps/{step_number}/users", get(handlers::steps::available_users));

    Router::new()
        .route("/health", get(handlers::health::basic_health))
        .nest("/api/v1", workflow_routes)
        .with_state(AppState::new(app))
}
