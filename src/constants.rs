//! # Workflow Constants
//!
//! Names, markers and timing defaults shared by the step model, the
//! coordinator, the monitor and the platform client.

use std::time::Duration;

/// Marker embedded in every labeling queue name created by the workflow.
pub const QUEUE_MARKER: &str = "MTLWQ";

/// Top-level key of the workflow document inside a project's custom data.
pub const WORKFLOW_CONFIG_KEY: &str = "multi_team_labeling_workflow";

/// Text shown for a step before the first status refresh.
pub const LOADING_TEXT: &str = "Loading...";

/// Placeholder for identifiers that are not resolved yet.
pub const NOT_AVAILABLE: &str = "N/A";

pub mod timing {
    use super::Duration;

    /// Delay after a dataset copy before existence is re-checked.
    pub const COPY_SETTLE_DELAY: Duration = Duration::from_secs(5);
    /// Pause between two monitor refreshes.
    pub const MONITOR_INTERVAL: Duration = Duration::from_secs(10);
    /// Granularity at which the monitor checks its stop flag.
    pub const MONITOR_TICK: Duration = Duration::from_secs(1);
    /// Upper bound for joining a stopped monitor loop.
    pub const MONITOR_STOP_TIMEOUT: Duration = Duration::from_secs(2);
}

/// Platform user roles that may be picked per selector.
pub mod roles {
    pub const ANNOTATOR: &str = "annotator";
    pub const REVIEWER: &str = "reviewer";
    pub const MANAGER: &str = "manager";

    pub const REVIEWER_ROLES: &[&str] = &[ANNOTATOR, REVIEWER, MANAGER];
    pub const LABELER_ROLES: &[&str] = &[ANNOTATOR, REVIEWER];
}

/// Operation names used in structured log records.
pub mod operations {
    pub const DATASET_EXISTS: &str = "step.dataset_exists";
    pub const CREATE_QUEUE: &str = "step.create_labeling_queue";
    pub const UPDATE_META: &str = "step.update_project_meta";
    pub const COPY_DATASET: &str = "step.copy_dataset";
    pub const MOVE_FORWARD: &str = "step.move_forward";
    pub const REFRESH_STATUS: &str = "workflow.refresh_status";
    pub const SAVE: &str = "workflow.save";
    pub const LOAD: &str = "workflow.load";
    pub const RESET: &str = "workflow.reset";
    pub const LAUNCH: &str = "workflow.launch";
}

/// Build the deterministic, marker-tagged labeling queue name for a step.
pub fn labeling_queue_name(dataset_id: i64, team_id: Option<i64>, step_number: u32) -> String {
    let team = team_id.map_or_else(|| "None".to_string(), |id| id.to_string());
    format!("{QUEUE_MARKER}_Dataset_{dataset_id}_Team_{team}_Step_{step_number}")
}
