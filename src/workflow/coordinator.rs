//! # Workflow Coordinator
//!
//! Owns the ordered steps and drives progression. A status refresh is a
//! top-to-bottom pass: first every step is observed (dataset, queue), then
//! each step is processed in order, so a completed queue at step N can pull
//! its dataset into step N+1 within the same pass.
//!
//! The coordinator also carries the settings-panel state (source project and
//! dataset, requirement toggles) and persists step selections into the source
//! project's custom data.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::persistence::{self, WorkflowSnapshot};
use super::settings::{LaunchOrigin, WorkflowSettings};
use super::status::{StepReport, StepStatus};
use super::step::{SelectionRequirements, StepContext, WorkflowStep};
use crate::config::LabelingConfig;
use crate::constants::operations;
use crate::error::{Result, WorkflowError};
use crate::logging::log_workflow_operation;
use crate::models::{DatasetInfo, LabelingQueueInfo};
use crate::platform::PlatformServices;

/// What the observation pass found for one step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepObservation {
    pub dataset: Option<DatasetInfo>,
    pub queue: Option<LabelingQueueInfo>,
}

/// Result of processing one step
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub status: StepStatus,
    pub queue: Option<LabelingQueueInfo>,
    /// Whether the next step should pull this step's dataset
    pub move_forward_needed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SaveOutcome {
    Saved { project_id: i64, dataset_id: i64 },
    /// Nothing to save against; project or dataset is not selected
    Skipped,
}

#[derive(Debug)]
pub struct WorkflowCoordinator {
    steps: BTreeMap<u32, WorkflowStep>,
    platform: PlatformServices,
    settings: WorkflowSettings,
    requirements: SelectionRequirements,
    origin: Option<LaunchOrigin>,
    copy_settle_delay: Duration,
    launch_enabled: bool,
}

impl WorkflowCoordinator {
    /// Create `number_of_steps` empty steps numbered from 1
    pub fn new(number_of_steps: u32, platform: PlatformServices) -> Self {
        let steps = (1..=number_of_steps)
            .map(|step_number| (step_number, WorkflowStep::new(step_number)))
            .collect();

        Self {
            steps,
            platform,
            settings: WorkflowSettings::default(),
            requirements: SelectionRequirements::default(),
            origin: None,
            copy_settle_delay: crate::constants::timing::COPY_SETTLE_DELAY,
            launch_enabled: false,
        }
    }

    pub fn from_config(config: &LabelingConfig, platform: PlatformServices) -> Self {
        Self::new(config.launch.number_of_teams, platform)
            .with_origin(LaunchOrigin {
                team_id: config.launch.team_id,
                workspace_id: config.launch.workspace_id,
            })
            .with_requirements(SelectionRequirements {
                classes_required: config.workflow.classes_required,
                tags_required: config.workflow.tags_required,
            })
            .with_copy_settle_delay(config.workflow.copy_settle_delay())
    }

    pub fn with_origin(mut self, origin: LaunchOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_requirements(mut self, requirements: SelectionRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn with_copy_settle_delay(mut self, delay: Duration) -> Self {
        self.copy_settle_delay = delay;
        self
    }

    pub fn number_of_steps(&self) -> u32 {
        self.steps.len() as u32
    }

    pub fn steps(&self) -> impl Iterator<Item = &WorkflowStep> {
        self.steps.values()
    }

    pub fn step(&self, step_number: u32) -> Result<&WorkflowStep> {
        self.steps
            .get(&step_number)
            .ok_or(WorkflowError::UnknownStep { step_number })
    }

    pub fn step_mut(&mut self, step_number: u32) -> Result<&mut WorkflowStep> {
        self.steps
            .get_mut(&step_number)
            .ok_or(WorkflowError::UnknownStep { step_number })
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn requirements(&self) -> SelectionRequirements {
        self.requirements
    }

    pub fn launch_enabled(&self) -> bool {
        self.launch_enabled
    }

    pub fn platform(&self) -> &PlatformServices {
        &self.platform
    }

    pub fn set_requirements(&mut self, requirements: SelectionRequirements) -> bool {
        self.requirements = requirements;
        self.all_steps_filled()
    }

    /// First step that is missing a required selection
    pub fn first_unfilled_step(&self) -> Option<u32> {
        self.steps
            .values()
            .find(|step| !step.is_filled(self.requirements))
            .map(WorkflowStep::step_number)
    }

    /// Check every step and enable launch only when all are filled
    pub fn all_steps_filled(&mut self) -> bool {
        match self.first_unfilled_step() {
            Some(step_number) => {
                info!(step_number, "Step is not fully filled, launch disabled");
                self.launch_enabled = false;
                false
            }
            None => {
                self.launch_enabled = true;
                true
            }
        }
    }

    /// Observe every step's dataset and queue on the platform
    pub async fn observe_steps(&mut self) -> Result<BTreeMap<u32, StepObservation>> {
        let platform = self.platform.clone();
        let ctx = StepContext {
            platform: &platform,
            settings: &self.settings,
            copy_settle_delay: self.copy_settle_delay,
        };

        let mut observations = BTreeMap::new();
        for (step_number, step) in self.steps.iter_mut() {
            let mut observation = StepObservation::default();
            if step.dataset_exists(&ctx).await? {
                if let Some(dataset_id) = step.dataset_id() {
                    observation.dataset = Some(platform.datasets.get_info_by_id(dataset_id).await?);
                }
                observation.queue = step.get_labeling_queue(&ctx).await?;
            }
            observations.insert(*step_number, observation);
        }
        Ok(observations)
    }

    /// Decide one step's status, creating or moving forward its queue when due
    #[instrument(skip(self, observation))]
    pub async fn process_workflow_step(
        &mut self,
        step_number: u32,
        observation: &StepObservation,
        move_forward_needed: bool,
    ) -> Result<StepOutcome> {
        if let Some(queue) = &observation.queue {
            let completed = queue.status.is_completed();
            debug!(queue_id = queue.id, status = %queue.status, "Step has a labeling queue");
            return Ok(StepOutcome {
                status: if completed {
                    StepStatus::Completed
                } else {
                    StepStatus::InProgress
                },
                queue: Some(queue.clone()),
                move_forward_needed: completed,
            });
        }

        let previous = match step_number.checked_sub(1) {
            Some(previous_number) if previous_number > 0 => {
                Some(self.step(previous_number)?.location())
            }
            _ => None,
        };

        let platform = self.platform.clone();
        let ctx = StepContext {
            platform: &platform,
            settings: &self.settings,
            copy_settle_delay: self.copy_settle_delay,
        };
        let step = self
            .steps
            .get_mut(&step_number)
            .ok_or(WorkflowError::UnknownStep { step_number })?;

        let queue = if step_number == 1 && observation.dataset.is_some() {
            step.create_labeling_queue(&ctx).await?
        } else if step_number > 1 && move_forward_needed {
            match step.move_forward(previous, &ctx).await? {
                Some(queue) => Some(queue),
                None => return Err(WorkflowError::MoveForwardFailed { step_number }),
            }
        } else {
            None
        };

        Ok(StepOutcome {
            status: if queue.is_some() {
                StepStatus::InProgress
            } else {
                StepStatus::Pending
            },
            queue,
            move_forward_needed: false,
        })
    }

    pub async fn update_workflow_status(&mut self) -> Result<Vec<StepReport>> {
        self.update_workflow_status_with(&mut |_: &StepReport| {}).await
    }

    /// Full refresh pass. `on_report` sees each step's report as soon as it is
    /// decided, so earlier steps are published even when a later one fails.
    #[instrument(skip(self, on_report))]
    pub async fn update_workflow_status_with(
        &mut self,
        on_report: &mut (dyn FnMut(&StepReport) + Send),
    ) -> Result<Vec<StepReport>> {
        let observations = self.observe_steps().await?;

        let mut reports = Vec::with_capacity(observations.len());
        let mut move_forward_needed = false;
        for (step_number, observation) in &observations {
            let outcome = self
                .process_workflow_step(*step_number, observation, move_forward_needed)
                .await?;
            move_forward_needed = outcome.move_forward_needed;

            let queue = outcome.queue.as_ref();
            let report = StepReport {
                step_number: *step_number,
                dataset_id: queue
                    .map(|q| q.dataset_id)
                    .or_else(|| observation.dataset.as_ref().map(|d| d.id)),
                queue_id: queue.map(|q| q.id),
                queue_status: queue.map(|q| q.status),
                status: outcome.status,
            };
            on_report(&report);
            reports.push(report);
        }

        log_workflow_operation(
            operations::REFRESH_STATUS,
            self.settings.selected_project_id,
            self.settings.selected_dataset_id,
            "refreshed",
            None,
        );
        Ok(reports)
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.steps
            .iter()
            .map(|(step_number, step)| (*step_number, step.to_snapshot()))
            .collect()
    }

    /// Apply saved selections. Entries for unknown step numbers are ignored.
    pub fn restore(&mut self, snapshot: &WorkflowSnapshot) {
        for (step_number, step_snapshot) in snapshot {
            match self.steps.get_mut(step_number) {
                Some(step) => step.apply_snapshot(step_snapshot),
                None => warn!(step_number, "Saved configuration has a step this workflow does not have"),
            }
        }
    }

    /// Persist the current selections for the selected dataset
    pub async fn save(&self) -> Result<SaveOutcome> {
        let (Some(project_id), Some(dataset_id)) = (
            self.settings.selected_project_id,
            self.settings.selected_dataset_id,
        ) else {
            warn!("Project or dataset is not selected, configuration not saved");
            return Ok(SaveOutcome::Skipped);
        };

        persistence::save_dataset_snapshot(
            self.platform.projects.as_ref(),
            project_id,
            dataset_id,
            &self.snapshot(),
        )
        .await?;

        log_workflow_operation(
            operations::SAVE,
            Some(project_id),
            Some(dataset_id),
            "saved",
            None,
        );
        Ok(SaveOutcome::Saved {
            project_id,
            dataset_id,
        })
    }

    /// Load and apply the saved configuration for the selected dataset
    pub async fn load_saved(&mut self) -> Result<bool> {
        let (Some(project_id), Some(dataset_id)) = (
            self.settings.selected_project_id,
            self.settings.selected_dataset_id,
        ) else {
            return Ok(false);
        };

        let Some(snapshot) =
            persistence::load_dataset_snapshot(self.platform.projects.as_ref(), project_id, dataset_id)
                .await?
        else {
            return Ok(false);
        };

        self.restore(&snapshot);
        log_workflow_operation(
            operations::LOAD,
            Some(project_id),
            Some(dataset_id),
            "loaded",
            Some(&format!("{} steps", snapshot.len())),
        );
        Ok(true)
    }

    /// Clear every step's selections
    pub fn reset(&mut self) {
        for step in self.steps.values_mut() {
            step.reset();
        }
        self.launch_enabled = false;
        log_workflow_operation(
            operations::RESET,
            self.settings.selected_project_id,
            self.settings.selected_dataset_id,
            "reset",
            None,
        );
    }

    /// Use `project_id` as the source project and offer its classes and tags
    #[instrument(skip(self))]
    pub async fn select_project(&mut self, project_id: i64) -> Result<()> {
        let project = self.platform.projects.get_info_by_id(project_id).await?;
        let meta = self.platform.projects.get_meta(project_id).await?;

        if self.settings.selected_project_id != Some(project_id) {
            self.settings.selected_dataset_id = None;
            self.settings.dataset = None;
        }
        self.settings.selected_project_id = Some(project_id);
        self.settings.project = Some(project);

        let origin = self.origin;
        let first = self.step_mut(1)?;
        if let Some(origin) = origin {
            first.set_team(Some(origin.team_id));
            first.set_workspace(Some(origin.workspace_id));
        }
        first.set_class_options(meta.classes);
        first.set_tag_options(meta.tags);

        info!(project_id, "Source project selected");
        Ok(())
    }

    /// Use `dataset_id` as the source dataset and load its saved configuration
    #[instrument(skip(self))]
    pub async fn select_dataset(&mut self, dataset_id: Option<i64>) -> Result<bool> {
        let Some(dataset_id) = dataset_id else {
            warn!("No dataset selected");
            return Ok(false);
        };

        let dataset = self.platform.datasets.get_info_by_id(dataset_id).await?;
        if self.settings.selected_project_id != Some(dataset.project_id) {
            self.select_project(dataset.project_id).await?;
        }
        self.settings.selected_dataset_id = Some(dataset_id);
        self.settings.dataset = Some(dataset);

        let loaded = self.load_saved().await?;
        self.all_steps_filled();
        info!(dataset_id, loaded, "Source dataset selected");
        Ok(loaded)
    }

    /// Classes and tags of a step's target project, falling back to the source project
    pub async fn refresh_step_options(&mut self, step_number: u32) -> Result<()> {
        let project_id = self
            .step(step_number)?
            .project_id()
            .or(self.settings.selected_project_id);
        let Some(project_id) = project_id else {
            return Ok(());
        };

        let meta = self.platform.projects.get_meta(project_id).await?;
        let step = self.step_mut(step_number)?;
        let mut classes = meta.classes;
        for class in step.selected_classes() {
            if !classes.iter().any(|c| c.name == class.name) {
                classes.push(class.clone());
            }
        }
        let mut tags = meta.tags;
        for tag in step.selected_tags() {
            if !tags.iter().any(|t| t.name == tag.name) {
                tags.push(tag.clone());
            }
        }
        step.set_class_options(classes);
        step.set_tag_options(tags);
        Ok(())
    }
}
