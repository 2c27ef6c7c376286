//! # Labeling Application
//!
//! Process-scoped application context. [`LabelingApp`] is created once at
//! startup and shared by handle; every user command goes through it.
//! Commands are serialized on the coordinator mutex, which the status monitor
//! also takes for each refresh, so a refresh never interleaves with a command.

pub mod view;

use std::sync::Arc;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::config::LabelingConfig;
use crate::constants::operations;
use crate::error::{Result, WorkflowError};
use crate::logging::log_workflow_operation;
use crate::models::UserInfo;
use crate::platform::PlatformServices;
use crate::workflow::{
    BoardSnapshot, CoordinatorRefresher, SaveOutcome, SelectionRequirements, StatusBoard,
    StatusMonitor, StatusRefresher, WorkflowCoordinator,
};

pub use view::{ResetAction, StepUpdate, StepView, UserRole, WorkflowView};

#[derive(Debug)]
pub struct LabelingApp {
    coordinator: Arc<Mutex<WorkflowCoordinator>>,
    board: StatusBoard,
    refresher: CoordinatorRefresher,
    monitor: StatusMonitor,
    reset_action: SyncMutex<ResetAction>,
    number_of_steps: u32,
}

impl LabelingApp {
    pub fn new(config: &LabelingConfig, platform: PlatformServices) -> Self {
        let coordinator = WorkflowCoordinator::from_config(config, platform);
        Self::with_coordinator(coordinator, config.monitor.clone())
    }

    pub fn with_coordinator(
        coordinator: WorkflowCoordinator,
        monitor_config: crate::config::MonitorConfig,
    ) -> Self {
        let number_of_steps = coordinator.number_of_steps();
        let coordinator = Arc::new(Mutex::new(coordinator));
        let board = StatusBoard::new(number_of_steps);
        let refresher = CoordinatorRefresher::new(coordinator.clone(), board.clone());
        let monitor = StatusMonitor::new(Arc::new(refresher.clone()), monitor_config);

        Self {
            coordinator,
            board,
            refresher,
            monitor,
            reset_action: SyncMutex::new(ResetAction::Reset),
            number_of_steps,
        }
    }

    /// Apply the project and dataset the application was launched with
    pub async fn bootstrap(&self, config: &LabelingConfig) -> Result<()> {
        if let Some(project_id) = config.launch.project_id {
            self.select_project(project_id).await?;
        }
        if config.launch.dataset_id.is_some() {
            self.select_dataset(config.launch.dataset_id).await?;
        }
        Ok(())
    }

    pub async fn select_project(&self, project_id: i64) -> Result<WorkflowView> {
        {
            let mut coordinator = self.coordinator.lock().await;
            coordinator.select_project(project_id).await?;
            coordinator.all_steps_filled();
        }
        Ok(self.view().await)
    }

    pub async fn select_dataset(&self, dataset_id: Option<i64>) -> Result<WorkflowView> {
        {
            let mut coordinator = self.coordinator.lock().await;
            coordinator.select_dataset(dataset_id).await?;
        }
        Ok(self.view().await)
    }

    pub async fn set_requirements(&self, requirements: SelectionRequirements) -> WorkflowView {
        {
            let mut coordinator = self.coordinator.lock().await;
            coordinator.set_requirements(requirements);
        }
        self.view().await
    }

    /// Apply a partial selection change to one step
    #[instrument(skip(self, update))]
    pub async fn update_step(&self, step_number: u32, update: StepUpdate) -> Result<StepView> {
        let mut coordinator = self.coordinator.lock().await;
        {
            let step = coordinator.step_mut(step_number)?;
            if let Some(team_id) = update.team_id {
                step.set_team(Some(team_id));
            }
            if let Some(workspace_id) = update.workspace_id {
                step.set_workspace(Some(workspace_id));
            }
        }

        if update.classes.is_some() || update.tags.is_some() {
            coordinator.refresh_step_options(step_number).await?;
            let step = coordinator.step_mut(step_number)?;
            if let Some(classes) = &update.classes {
                let unknown = step.select_classes(classes.as_slice());
                if !unknown.is_empty() {
                    warn!(?unknown, "Ignoring classes that are not offered for this step");
                }
            }
            if let Some(tags) = &update.tags {
                let unknown = step.select_tags(tags.as_slice());
                if !unknown.is_empty() {
                    warn!(?unknown, "Ignoring tags that are not offered for this step");
                }
            }
        }

        if update.reviewer_ids.is_some() || update.labeler_ids.is_some() {
            let team_id = coordinator.step(step_number)?.team_id();
            let members = team_members(coordinator.platform(), team_id).await?;
            let step = coordinator.step_mut(step_number)?;
            if let Some(reviewer_ids) = update.reviewer_ids {
                step.set_reviewers(eligible_ids(&members, UserRole::Reviewer, reviewer_ids));
            }
            if let Some(labeler_ids) = update.labeler_ids {
                step.set_labelers(eligible_ids(&members, UserRole::Labeler, labeler_ids));
            }
        }

        coordinator.all_steps_filled();
        let requirements = coordinator.requirements();
        Ok(StepView::new(coordinator.step(step_number)?, requirements))
    }

    /// Team members of a step's team that may fill the given selector
    pub async fn available_users(&self, step_number: u32, role: UserRole) -> Result<Vec<UserInfo>> {
        let coordinator = self.coordinator.lock().await;
        let team_id = coordinator.step(step_number)?.team_id();
        let members = team_members(coordinator.platform(), team_id).await?;
        Ok(members
            .into_iter()
            .filter(|user| user.has_any_role(role.eligible_roles()))
            .collect())
    }

    pub async fn save(&self) -> Result<SaveOutcome> {
        self.coordinator.lock().await.save().await
    }

    /// Reset on the first press, reload the saved configuration on the next
    pub async fn reset_or_update(&self) -> Result<WorkflowView> {
        let action = *self.reset_action.lock();
        {
            let mut coordinator = self.coordinator.lock().await;
            match action {
                ResetAction::Reset => coordinator.reset(),
                ResetAction::Update => {
                    let dataset_id = coordinator.settings().selected_dataset_id;
                    coordinator.select_dataset(dataset_id).await?;
                }
            }
        }

        *self.reset_action.lock() = match action {
            ResetAction::Reset => ResetAction::Update,
            ResetAction::Update => ResetAction::Reset,
        };
        Ok(self.view().await)
    }

    /// Open the status overview and start monitoring
    pub async fn launch(&self) -> Result<BoardSnapshot> {
        {
            let mut coordinator = self.coordinator.lock().await;
            if let Some(step_number) = coordinator.first_unfilled_step() {
                coordinator.all_steps_filled();
                return Err(WorkflowError::NotReady { step_number });
            }
            coordinator.all_steps_filled();
            log_workflow_operation(
                operations::LAUNCH,
                coordinator.settings().selected_project_id,
                coordinator.settings().selected_dataset_id,
                "launched",
                None,
            );
        }

        self.board.clear(self.number_of_steps);
        self.monitor.start().await;
        Ok(self.board.snapshot())
    }

    /// Close the status overview. Returns whether monitoring was running.
    pub async fn close_overview(&self) -> bool {
        info!("Closing workflow overview");
        self.monitor.stop().await
    }

    /// Run one status refresh outside the monitor's schedule
    pub async fn refresh_now(&self) -> Result<BoardSnapshot> {
        self.refresher.refresh_status().await?;
        Ok(self.board.snapshot())
    }

    pub fn status(&self) -> BoardSnapshot {
        self.board.snapshot()
    }

    pub fn monitor(&self) -> &StatusMonitor {
        &self.monitor
    }

    pub async fn view(&self) -> WorkflowView {
        let monitor_running = self.monitor.is_running();
        let reset_action = *self.reset_action.lock();
        let coordinator = self.coordinator.lock().await;
        let requirements = coordinator.requirements();

        WorkflowView {
            settings: coordinator.settings().view(),
            requirements,
            steps: coordinator
                .steps()
                .map(|step| StepView::new(step, requirements))
                .collect(),
            launch_enabled: coordinator.launch_enabled(),
            monitor_running,
            reset_action,
        }
    }

    pub async fn shutdown(&self) {
        if self.monitor.stop().await {
            info!("Status monitor stopped on shutdown");
        }
    }
}

async fn team_members(platform: &PlatformServices, team_id: Option<i64>) -> Result<Vec<UserInfo>> {
    match team_id {
        Some(team_id) => Ok(platform.users.team_members(team_id).await?),
        None => {
            warn!("Team is not selected, no users available");
            Ok(Vec::new())
        }
    }
}

/// Keep the requested ids that belong to eligible team members
fn eligible_ids(members: &[UserInfo], role: UserRole, requested: Vec<i64>) -> Vec<i64> {
    let roles = role.eligible_roles();
    let (kept, dropped): (Vec<i64>, Vec<i64>) = requested.into_iter().partition(|id| {
        members
            .iter()
            .any(|user| user.id == *id && user.has_any_role(roles))
    });
    if !dropped.is_empty() {
        warn!(%role, ?dropped, "Ignoring users that are not eligible for this selector");
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: i64, role: &str) -> UserInfo {
        UserInfo {
            id,
            login: format!("user{id}"),
            role: role.to_string(),
        }
    }

    #[test]
    fn test_eligible_ids_filters_by_role_and_membership() {
        let members = vec![member(1, "annotator"), member(2, "manager"), member(3, "viewer")];

        assert_eq!(eligible_ids(&members, UserRole::Reviewer, vec![1, 2, 3, 4]), vec![1, 2]);
        assert_eq!(eligible_ids(&members, UserRole::Labeler, vec![2, 1]), vec![1]);
    }
}
