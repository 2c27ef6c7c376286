//! Per-step status reports and the shared display board.
//!
//! The board is written by the status monitor and read by request handlers.
//! Entries are overwritten wholesale, last writer wins; the platform remains
//! the authority and is re-queried on every refresh.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::constants::{LOADING_TEXT, NOT_AVAILABLE};
use crate::models::QueueStatus;

/// Observed state of a workflow step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// No queue yet, waiting for the previous step or for prerequisites
    #[default]
    Pending,
    /// A queue exists and is not completed
    InProgress,
    /// The step's queue is completed
    Completed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Outcome of evaluating one step during a status refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub step_number: u32,
    pub dataset_id: Option<i64>,
    pub queue_id: Option<i64>,
    pub queue_status: Option<QueueStatus>,
    pub status: StepStatus,
}

impl StepReport {
    /// One-line summary shown next to the step
    pub fn summary(&self) -> String {
        fn or_na<T: ToString>(value: Option<T>) -> String {
            value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
        }

        format!(
            "Dataset ID: {} | Queue ID: {} | Status: {}",
            or_na(self.dataset_id),
            or_na(self.queue_id),
            or_na(self.queue_status)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepDisplay {
    pub step_number: u32,
    pub text: String,
    pub status: StepStatus,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BoardSnapshot {
    pub steps: Vec<StepDisplay>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct BoardState {
    steps: BTreeMap<u32, StepDisplay>,
    last_refresh: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Shared per-step display state
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<BoardState>>,
}

impl StatusBoard {
    pub fn new(number_of_steps: u32) -> Self {
        let board = Self::default();
        board.clear(number_of_steps);
        board
    }

    /// Put every step back to the loading placeholder
    pub fn clear(&self, number_of_steps: u32) {
        let mut state = self.inner.write();
        state.steps = (1..=number_of_steps)
            .map(|step_number| {
                (
                    step_number,
                    StepDisplay {
                        step_number,
                        text: LOADING_TEXT.to_string(),
                        status: StepStatus::Pending,
                        updated_at: None,
                    },
                )
            })
            .collect();
        state.last_refresh = None;
        state.last_error = None;
    }

    pub fn publish_step(&self, report: &StepReport) {
        let display = StepDisplay {
            step_number: report.step_number,
            text: report.summary(),
            status: report.status,
            updated_at: Some(Utc::now()),
        };
        self.inner.write().steps.insert(report.step_number, display);
    }

    /// Mark a refresh pass as finished
    pub fn record_refresh(&self) {
        let mut state = self.inner.write();
        state.last_refresh = Some(Utc::now());
        state.last_error = None;
    }

    pub fn record_error(&self, message: impl Into<String>) {
        let mut state = self.inner.write();
        state.last_refresh = Some(Utc::now());
        state.last_error = Some(message.into());
    }

    pub fn step(&self, step_number: u32) -> Option<StepDisplay> {
        self.inner.read().steps.get(&step_number).cloned()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let state = self.inner.read();
        BoardSnapshot {
            steps: state.steps.values().cloned().collect(),
            last_refresh: state.last_refresh,
            last_error: state.last_error.clone(),
        }
    }
}
