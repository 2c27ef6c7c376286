//! # Web API Error Types
//!
//! HTTP error responses of the workflow API. Every error renders as
//! `{"error": {"code": ..., "message": ...}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::error::WorkflowError;
use crate::platform::PlatformError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    NotFound { message: String },

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    /// The request conflicts with the workflow's current state
    #[error("{message}")]
    Conflict { message: String },

    #[error("Labeling platform request failed: {message}")]
    BadGateway { message: String },

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_code) = match &self {
            ApiError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::BadGateway { .. } => (StatusCode::BAD_GATEWAY, "PLATFORM_ERROR"),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let error_response = json!({
            "error": {
                "code": error_code,
                "message": self.to_string()
            }
        });

        (status_code, Json(error_response)).into_response()
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::UnknownStep { .. } => ApiError::not_found(err.to_string()),
            WorkflowError::NotReady { .. }
            | WorkflowError::MoveForwardFailed { .. }
            | WorkflowError::DuplicateQueue { .. } => ApiError::Conflict {
                message: err.to_string(),
            },
            WorkflowError::Platform(PlatformError::NotFound { .. }) => {
                ApiError::not_found(err.to_string())
            }
            WorkflowError::Platform(platform) => ApiError::BadGateway {
                message: platform.to_string(),
            },
            WorkflowError::Configuration(_) | WorkflowError::Serialization(_) => {
                error!(error = %err, "Workflow request failed");
                ApiError::Internal
            }
        }
    }
}

/// Result type alias for web API operations
pub type ApiResult<T> = Result<T, ApiError>;
