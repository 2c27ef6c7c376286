use serde::Serialize;

use crate::models::{DatasetInfo, ProjectInfo};

/// Source project and dataset chosen in the settings panel.
///
/// Their names double as the target names in every team's workspace.
#[derive(Debug, Clone, Default)]
pub struct WorkflowSettings {
    pub selected_project_id: Option<i64>,
    pub selected_dataset_id: Option<i64>,
    pub project: Option<ProjectInfo>,
    pub dataset: Option<DatasetInfo>,
}

impl WorkflowSettings {
    pub fn project_name(&self) -> Option<&str> {
        self.project.as_ref().map(|project| project.name.as_str())
    }

    pub fn dataset_name(&self) -> Option<&str> {
        self.dataset.as_ref().map(|dataset| dataset.name.as_str())
    }

    pub fn view(&self) -> SettingsView {
        SettingsView {
            project_id: self.selected_project_id,
            dataset_id: self.selected_dataset_id,
            project_name: self.project_name().map(str::to_string),
            dataset_name: self.dataset_name().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsView {
    pub project_id: Option<i64>,
    pub dataset_id: Option<i64>,
    pub project_name: Option<String>,
    pub dataset_name: Option<String>,
}

/// Team and workspace the application was launched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LaunchOrigin {
    pub team_id: i64,
    pub workspace_id: i64,
}
