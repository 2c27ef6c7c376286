//! Shared fixtures for integration tests.
#![allow(dead_code)]

pub mod fake_platform;

use std::sync::Arc;
use std::time::Duration;

use multiteam_labeling::config::{
    LabelingConfig, LaunchConfig, MonitorConfig, PlatformConfig, ProgressionConfig, WebConfig,
};
use multiteam_labeling::models::{DatasetInfo, ObjClass, ProjectInfo, ProjectMeta, TagMeta, UserInfo};
use multiteam_labeling::workflow::{LaunchOrigin, WorkflowCoordinator};

pub use fake_platform::FakePlatform;

pub const SOURCE_PROJECT: &str = "Street Scenes";
pub const SOURCE_DATASET: &str = "batch-01";

/// (team id, workspace id) of each step
pub const STEP_TEAMS: [(i64, i64); 3] = [(10, 1), (20, 2), (30, 3)];

pub fn user(id: i64, role: &str) -> UserInfo {
    UserInfo {
        id,
        login: format!("user{id}"),
        role: role.to_string(),
    }
}

/// Source project and dataset living in the first team's workspace
pub struct Source {
    pub project: ProjectInfo,
    pub dataset: DatasetInfo,
}

pub fn seed_source(platform: &FakePlatform) -> Source {
    let project = platform.add_project(STEP_TEAMS[0].1, SOURCE_PROJECT);
    platform.set_meta(
        project.id,
        ProjectMeta {
            classes: vec![ObjClass::new("car", "rectangle"), ObjClass::new("person", "polygon")],
            tags: vec![TagMeta::new("night", "none")],
            ..ProjectMeta::default()
        },
    );
    let dataset = platform.add_dataset(project.id, SOURCE_DATASET);

    for (index, (team_id, _)) in STEP_TEAMS.iter().enumerate() {
        let base = (index as i64 + 1) * 10;
        platform.set_members(
            *team_id,
            vec![
                user(base + 1, "annotator"),
                user(base + 2, "reviewer"),
                user(base + 3, "manager"),
                user(base + 4, "viewer"),
            ],
        );
    }

    Source { project, dataset }
}

pub fn coordinator(platform: &Arc<FakePlatform>, number_of_steps: u32) -> WorkflowCoordinator {
    WorkflowCoordinator::new(number_of_steps, platform.services())
        .with_origin(LaunchOrigin {
            team_id: STEP_TEAMS[0].0,
            workspace_id: STEP_TEAMS[0].1,
        })
        .with_copy_settle_delay(Duration::ZERO)
}

/// Give step `step_number` its team, workspace and one reviewer and labeler
pub fn fill_step(coordinator: &mut WorkflowCoordinator, step_number: u32) {
    let (team_id, workspace_id) = STEP_TEAMS[(step_number - 1) as usize];
    let base = step_number as i64 * 10;
    let step = coordinator.step_mut(step_number).unwrap();
    step.set_team(Some(team_id));
    step.set_workspace(Some(workspace_id));
    step.set_reviewers([base + 2]);
    step.set_labelers([base + 1]);
}

pub fn test_config(number_of_teams: u32) -> LabelingConfig {
    LabelingConfig {
        platform: PlatformConfig {
            server_address: "http://platform.invalid".to_string(),
            api_token: "test-token".to_string(),
            request_timeout_seconds: 5,
        },
        launch: LaunchConfig {
            team_id: STEP_TEAMS[0].0,
            workspace_id: STEP_TEAMS[0].1,
            project_id: None,
            dataset_id: None,
            number_of_teams,
        },
        workflow: ProgressionConfig {
            copy_settle_delay_ms: 0,
            classes_required: false,
            tags_required: false,
        },
        monitor: MonitorConfig {
            interval_ms: 1_000,
            tick_ms: 100,
            stop_timeout_ms: 2_000,
        },
        web: WebConfig::default(),
    }
}
