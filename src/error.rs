//! # Workflow Error Types
//!
//! Crate-level error type for workflow orchestration. Platform transport
//! failures and configuration problems convert into it so `?` works across
//! the step, coordinator and application layers.

use crate::config::ConfigurationError;
use crate::platform::PlatformError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Progression was expected but the step ended up without a queue.
    #[error("Failed to move forward for step {step_number}")]
    MoveForwardFailed { step_number: u32 },

    /// More than one marker-tagged labeling queue points at one dataset.
    #[error("Multiple labeling queues with marker found for dataset {dataset_id} ({count} matches)")]
    DuplicateQueue { dataset_id: i64, count: usize },

    #[error("Unknown workflow step: {step_number}")]
    UnknownStep { step_number: u32 },

    #[error("Workflow is not ready to launch: step {step_number} is not fully filled")]
    NotReady { step_number: u32 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WorkflowError {
    /// Errors that indicate the platform state is inconsistent with the workflow.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Self::MoveForwardFailed { .. } | Self::DuplicateQueue { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
