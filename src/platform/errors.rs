//! # Platform Error Types
//!
//! Failures talking to the labeling platform, using thiserror for structured
//! variants instead of stringly errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Platform request {method} failed with status {status}: {message}")]
    Http {
        method: String,
        status: u16,
        message: String,
    },

    #[error("Platform transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from {method}: {message}")]
    Decode { method: String, message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
}

impl PlatformError {
    pub fn decode(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            method: method.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;
