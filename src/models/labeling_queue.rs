use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::QUEUE_MARKER;

/// Labeling queue status as reported by the platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    /// Any status string this crate does not know about
    #[serde(other)]
    Unknown,
}

impl QueueStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Labeling queue record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelingQueueInfo {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub status: QueueStatus,
    pub dataset_id: i64,
}

impl LabelingQueueInfo {
    /// Whether this queue was created by the workflow for `dataset_id`
    pub fn is_workflow_queue_for(&self, dataset_id: i64) -> bool {
        self.dataset_id == dataset_id && self.name.contains(QUEUE_MARKER)
    }
}

/// Parameters of a labeling queue creation request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQueueRequest {
    pub name: String,
    pub user_ids: Vec<i64>,
    pub reviewer_ids: Vec<i64>,
    pub dataset_id: i64,
    pub classes_to_label: Vec<String>,
    pub tags_to_label: Vec<String>,
}
