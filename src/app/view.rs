//! Serializable views and command payloads of the application.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::roles;
use crate::workflow::{SelectionRequirements, SettingsView, WorkflowStep};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepView {
    pub step_number: u32,
    pub team_id: Option<i64>,
    pub workspace_id: Option<i64>,
    pub project_id: Option<i64>,
    pub dataset_id: Option<i64>,
    pub class_options: Vec<String>,
    pub selected_classes: Vec<String>,
    pub tag_options: Vec<String>,
    pub selected_tags: Vec<String>,
    pub reviewer_ids: Vec<i64>,
    pub labeler_ids: Vec<i64>,
    pub filled: bool,
}

impl StepView {
    pub fn new(step: &WorkflowStep, requirements: SelectionRequirements) -> Self {
        Self {
            step_number: step.step_number(),
            team_id: step.team_id(),
            workspace_id: step.workspace_id(),
            project_id: step.project_id(),
            dataset_id: step.dataset_id(),
            class_options: step.class_options().iter().map(|c| c.name.clone()).collect(),
            selected_classes: step.selected_classes().iter().map(|c| c.name.clone()).collect(),
            tag_options: step.tag_options().iter().map(|t| t.name.clone()).collect(),
            selected_tags: step.selected_tags().iter().map(|t| t.name.clone()).collect(),
            reviewer_ids: step.reviewer_ids().to_vec(),
            labeler_ids: step.labeler_ids().to_vec(),
            filled: step.is_filled(requirements),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowView {
    pub settings: SettingsView,
    pub requirements: SelectionRequirements,
    pub steps: Vec<StepView>,
    pub launch_enabled: bool,
    pub monitor_running: bool,
    /// What the reset button does next
    pub reset_action: ResetAction,
}

/// Partial update of a step's selections, applied field by field in
/// declaration order
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StepUpdate {
    #[serde(default)]
    pub team_id: Option<i64>,
    #[serde(default)]
    pub workspace_id: Option<i64>,
    #[serde(default)]
    pub classes: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub reviewer_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub labeler_ids: Option<Vec<i64>>,
}

/// Toggle state of the reset button
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetAction {
    /// Clear every step's selections
    #[default]
    Reset,
    /// Reload the saved configuration of the selected dataset
    Update,
}

/// User selector of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Reviewer,
    Labeler,
}

impl UserRole {
    /// Team roles eligible for this selector
    pub fn eligible_roles(&self) -> &'static [&'static str] {
        match self {
            Self::Reviewer => roles::REVIEWER_ROLES,
            Self::Labeler => roles::LABELER_ROLES,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reviewer => write!(f, "reviewer"),
            Self::Labeler => write!(f, "labeler"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reviewer" | "reviewers" => Ok(Self::Reviewer),
            "labeler" | "labelers" => Ok(Self::Labeler),
            other => Err(format!("Unknown user role: {other}")),
        }
    }
}
