//! # Workflow Step
//!
//! One team's slot in the sequence: who labels, who reviews, which classes
//! and tags, and where the step's copy of the dataset lives. Platform work is
//! done through a [`StepContext`]; every operation that cannot proceed because
//! a selection is missing logs the reason and returns an empty result instead
//! of failing.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::settings::WorkflowSettings;
use crate::constants::{labeling_queue_name, operations};
use crate::error::{Result, WorkflowError};
use crate::logging::log_step_operation;
use crate::models::{CreateQueueRequest, LabelingQueueInfo, ObjClass, TagMeta};
use crate::platform::PlatformServices;

/// Which optional selections a step must have to count as filled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRequirements {
    #[serde(default)]
    pub classes_required: bool,
    #[serde(default)]
    pub tags_required: bool,
}

/// Resolved project and dataset of a step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepLocation {
    pub project_id: Option<i64>,
    pub dataset_id: Option<i64>,
}

/// Everything a step needs to talk to the platform
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub platform: &'a PlatformServices,
    pub settings: &'a WorkflowSettings,
    pub copy_settle_delay: Duration,
}

/// Persisted form of a step's selections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub step_number: u32,
    #[serde(default)]
    pub team_id: Option<i64>,
    #[serde(default)]
    pub workspace_id: Option<i64>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub dataset_id: Option<i64>,
    #[serde(default)]
    pub selected_classes: Vec<ObjClass>,
    #[serde(default)]
    pub selected_tags: Vec<TagMeta>,
    #[serde(default)]
    pub reviewer_ids: Vec<i64>,
    #[serde(default)]
    pub labeler_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowStep {
    step_number: u32,
    team_id: Option<i64>,
    workspace_id: Option<i64>,
    project_id: Option<i64>,
    dataset_id: Option<i64>,
    class_options: Vec<ObjClass>,
    tag_options: Vec<TagMeta>,
    selected_classes: Vec<ObjClass>,
    selected_tags: Vec<TagMeta>,
    reviewer_ids: Vec<i64>,
    labeler_ids: Vec<i64>,
}

impl WorkflowStep {
    pub fn new(step_number: u32) -> Self {
        Self {
            step_number,
            team_id: None,
            workspace_id: None,
            project_id: None,
            dataset_id: None,
            class_options: Vec::new(),
            tag_options: Vec::new(),
            selected_classes: Vec::new(),
            selected_tags: Vec::new(),
            reviewer_ids: Vec::new(),
            labeler_ids: Vec::new(),
        }
    }

    pub fn step_number(&self) -> u32 {
        self.step_number
    }

    pub fn team_id(&self) -> Option<i64> {
        self.team_id
    }

    pub fn workspace_id(&self) -> Option<i64> {
        self.workspace_id
    }

    pub fn project_id(&self) -> Option<i64> {
        self.project_id
    }

    pub fn dataset_id(&self) -> Option<i64> {
        self.dataset_id
    }

    pub fn location(&self) -> StepLocation {
        StepLocation {
            project_id: self.project_id,
            dataset_id: self.dataset_id,
        }
    }

    pub fn class_options(&self) -> &[ObjClass] {
        &self.class_options
    }

    pub fn tag_options(&self) -> &[TagMeta] {
        &self.tag_options
    }

    pub fn selected_classes(&self) -> &[ObjClass] {
        &self.selected_classes
    }

    pub fn selected_tags(&self) -> &[TagMeta] {
        &self.selected_tags
    }

    pub fn reviewer_ids(&self) -> &[i64] {
        &self.reviewer_ids
    }

    pub fn labeler_ids(&self) -> &[i64] {
        &self.labeler_ids
    }

    /// Select a team. A different team invalidates the team-scoped selections.
    pub fn set_team(&mut self, team_id: Option<i64>) -> bool {
        if self.team_id == team_id {
            return false;
        }
        self.team_id = team_id;
        self.workspace_id = None;
        self.project_id = None;
        self.dataset_id = None;
        self.reviewer_ids.clear();
        self.labeler_ids.clear();
        true
    }

    /// Select a workspace. Project and dataset are re-resolved in the new one.
    pub fn set_workspace(&mut self, workspace_id: Option<i64>) -> bool {
        if self.workspace_id == workspace_id {
            return false;
        }
        self.workspace_id = workspace_id;
        self.project_id = None;
        self.dataset_id = None;
        true
    }

    /// Replace the class options, keeping selections that are still offered
    pub fn set_class_options(&mut self, options: Vec<ObjClass>) {
        self.selected_classes
            .retain(|selected| options.iter().any(|option| option.name == selected.name));
        self.class_options = options;
    }

    /// Replace the tag options, keeping selections that are still offered
    pub fn set_tag_options(&mut self, options: Vec<TagMeta>) {
        self.selected_tags
            .retain(|selected| options.iter().any(|option| option.name == selected.name));
        self.tag_options = options;
    }

    /// Select classes by name. Returns names that are not among the options.
    pub fn select_classes<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<String> {
        let mut unknown = Vec::new();
        let mut selected: Vec<ObjClass> = Vec::new();
        for name in names {
            let name = name.as_ref();
            if selected.iter().any(|class| class.name == name) {
                continue;
            }
            match self.class_options.iter().find(|class| class.name == name) {
                Some(class) => selected.push(class.clone()),
                None => unknown.push(name.to_string()),
            }
        }
        self.selected_classes = selected;
        unknown
    }

    /// Select tags by name. Returns names that are not among the options.
    pub fn select_tags<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<String> {
        let mut unknown = Vec::new();
        let mut selected: Vec<TagMeta> = Vec::new();
        for name in names {
            let name = name.as_ref();
            if selected.iter().any(|tag| tag.name == name) {
                continue;
            }
            match self.tag_options.iter().find(|tag| tag.name == name) {
                Some(tag) => selected.push(tag.clone()),
                None => unknown.push(name.to_string()),
            }
        }
        self.selected_tags = selected;
        unknown
    }

    pub fn set_reviewers(&mut self, user_ids: impl IntoIterator<Item = i64>) {
        self.reviewer_ids = dedup_ids(user_ids);
    }

    pub fn set_labelers(&mut self, user_ids: impl IntoIterator<Item = i64>) {
        self.labeler_ids = dedup_ids(user_ids);
    }

    /// Clear every selection. Selector options are kept.
    pub fn reset(&mut self) {
        self.set_team(None);
        self.set_workspace(None);
        self.selected_classes.clear();
        self.selected_tags.clear();
        self.reviewer_ids.clear();
        self.labeler_ids.clear();
    }

    pub fn is_filled(&self, requirements: SelectionRequirements) -> bool {
        self.team_id.is_some()
            && self.workspace_id.is_some()
            && !self.reviewer_ids.is_empty()
            && !self.labeler_ids.is_empty()
            && (!requirements.classes_required || !self.selected_classes.is_empty())
            && (!requirements.tags_required || !self.selected_tags.is_empty())
    }

    pub fn to_snapshot(&self) -> StepSnapshot {
        StepSnapshot {
            step_number: self.step_number,
            team_id: self.team_id,
            workspace_id: self.workspace_id,
            project_id: self.project_id,
            dataset_id: self.dataset_id,
            selected_classes: self.selected_classes.clone(),
            selected_tags: self.selected_tags.clone(),
            reviewer_ids: self.reviewer_ids.clone(),
            labeler_ids: self.labeler_ids.clone(),
        }
    }

    /// Restore selections. Team and workspace go first so their resets do
    /// not wipe the restored users and ids.
    pub fn apply_snapshot(&mut self, snapshot: &StepSnapshot) {
        self.set_team(snapshot.team_id);
        self.set_workspace(snapshot.workspace_id);
        self.project_id = snapshot.project_id;
        self.dataset_id = snapshot.dataset_id;

        for class in &snapshot.selected_classes {
            if !self.class_options.iter().any(|option| option.name == class.name) {
                self.class_options.push(class.clone());
            }
        }
        for tag in &snapshot.selected_tags {
            if !self.tag_options.iter().any(|option| option.name == tag.name) {
                self.tag_options.push(tag.clone());
            }
        }
        self.selected_classes = snapshot.selected_classes.clone();
        self.selected_tags = snapshot.selected_tags.clone();
        self.reviewer_ids = dedup_ids(snapshot.reviewer_ids.iter().copied());
        self.labeler_ids = dedup_ids(snapshot.labeler_ids.iter().copied());
    }

    /// Resolve this step's project and dataset in its workspace by the source names
    #[instrument(skip(self, ctx), fields(step_number = self.step_number))]
    pub async fn dataset_exists(&mut self, ctx: &StepContext<'_>) -> Result<bool> {
        if self.team_id.is_none() {
            warn!("Team is not selected");
            return Ok(false);
        }
        let Some(workspace_id) = self.workspace_id else {
            warn!("Workspace is not selected");
            return Ok(false);
        };
        let Some(project_name) = ctx.settings.project_name() else {
            warn!("Source project is not selected");
            return Ok(false);
        };

        let Some(project) = ctx
            .platform
            .projects
            .get_info_by_name(workspace_id, project_name)
            .await?
        else {
            info!(workspace_id, project_name, "Project not found in workspace");
            return Ok(false);
        };
        self.project_id = Some(project.id);

        let Some(dataset_name) = ctx.settings.dataset_name() else {
            warn!("Source dataset is not selected");
            return Ok(false);
        };
        let Some(dataset) = ctx
            .platform
            .datasets
            .get_info_by_name(project.id, dataset_name)
            .await?
        else {
            info!(project_id = project.id, dataset_name, "Dataset not found in project");
            return Ok(false);
        };
        self.dataset_id = Some(dataset.id);

        log_step_operation(
            operations::DATASET_EXISTS,
            self.step_number,
            self.dataset_id,
            None,
            "found",
            Some(project_name),
        );
        Ok(true)
    }

    /// The workflow's queue for this step's dataset, if one was created
    pub async fn get_labeling_queue(
        &self,
        ctx: &StepContext<'_>,
    ) -> Result<Option<LabelingQueueInfo>> {
        let (Some(team_id), Some(dataset_id)) = (self.team_id, self.dataset_id) else {
            debug!(step_number = self.step_number, "Team or dataset not resolved, no queue lookup");
            return Ok(None);
        };

        let mut matches: Vec<LabelingQueueInfo> = ctx
            .platform
            .queues
            .get_list(team_id, dataset_id)
            .await?
            .into_iter()
            .filter(|queue| queue.is_workflow_queue_for(dataset_id))
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            count => Err(WorkflowError::DuplicateQueue { dataset_id, count }),
        }
    }

    /// Create the step's labeling queue, or return the one that already exists
    #[instrument(skip(self, ctx), fields(step_number = self.step_number))]
    pub async fn create_labeling_queue(
        &mut self,
        ctx: &StepContext<'_>,
    ) -> Result<Option<LabelingQueueInfo>> {
        let Some(dataset_id) = self.dataset_id else {
            warn!("Dataset is not resolved, cannot create labeling queue");
            return Ok(None);
        };
        if self.labeler_ids.is_empty() || self.reviewer_ids.is_empty() {
            warn!(
                labelers = self.labeler_ids.len(),
                reviewers = self.reviewer_ids.len(),
                "Labelers and reviewers are required to create a labeling queue"
            );
            return Ok(None);
        }

        if let Some(existing) = self.get_labeling_queue(ctx).await? {
            info!(queue_id = existing.id, "Labeling queue already exists");
            return Ok(Some(existing));
        }

        self.update_project_meta(ctx).await?;

        let request = CreateQueueRequest {
            name: labeling_queue_name(dataset_id, self.team_id, self.step_number),
            user_ids: self.labeler_ids.clone(),
            reviewer_ids: self.reviewer_ids.clone(),
            dataset_id,
            classes_to_label: self.selected_classes.iter().map(|c| c.name.clone()).collect(),
            tags_to_label: self.selected_tags.iter().map(|t| t.name.clone()).collect(),
        };
        let queue_id = ctx.platform.queues.create(&request).await?;
        let queue = ctx.platform.queues.get_info_by_id(queue_id).await?;

        log_step_operation(
            operations::CREATE_QUEUE,
            self.step_number,
            Some(dataset_id),
            Some(queue.id),
            "created",
            Some(&queue.name),
        );
        Ok(Some(queue))
    }

    /// Register selected classes and tags the step's project does not know yet
    async fn update_project_meta(&self, ctx: &StepContext<'_>) -> Result<()> {
        let Some(project_id) = self.project_id else {
            warn!(step_number = self.step_number, "Project is not resolved, meta not updated");
            return Ok(());
        };

        let mut meta = ctx.platform.projects.get_meta(project_id).await?;
        let added = meta.merge_classes(&self.selected_classes) + meta.merge_tags(&self.selected_tags);
        if added == 0 {
            return Ok(());
        }

        ctx.platform.projects.update_meta(project_id, &meta).await?;
        log_step_operation(
            operations::UPDATE_META,
            self.step_number,
            self.dataset_id,
            None,
            "updated",
            Some(&format!("{added} definitions added")),
        );
        Ok(())
    }

    /// Bring the previous step's output into this step and open its queue
    #[instrument(skip(self, previous, ctx), fields(step_number = self.step_number))]
    pub async fn move_forward(
        &mut self,
        previous: Option<StepLocation>,
        ctx: &StepContext<'_>,
    ) -> Result<Option<LabelingQueueInfo>> {
        if !self.dataset_exists(ctx).await? {
            info!("Dataset does not exist yet, copying it from the previous step");
            self.copy_from_previous_step(previous, ctx).await?;
            debug!(delay_ms = ctx.copy_settle_delay.as_millis() as u64, "Waiting for the copy to settle");
            tokio::time::sleep(ctx.copy_settle_delay).await;
        }

        if !self.dataset_exists(ctx).await? {
            warn!("Dataset is still missing after copying");
            return Ok(None);
        }

        let queue = self.create_labeling_queue(ctx).await?;
        log_step_operation(
            operations::MOVE_FORWARD,
            self.step_number,
            self.dataset_id,
            queue.as_ref().map(|q| q.id),
            if queue.is_some() { "moved" } else { "no_queue" },
            None,
        );
        Ok(queue)
    }

    async fn copy_from_previous_step(
        &mut self,
        previous: Option<StepLocation>,
        ctx: &StepContext<'_>,
    ) -> Result<()> {
        if self.step_number <= 1 {
            info!("First step has nothing to copy from");
            return Ok(());
        }
        let Some(workspace_id) = self.workspace_id else {
            warn!("Workspace is not selected, cannot copy");
            return Ok(());
        };
        let Some(StepLocation {
            project_id: Some(previous_project_id),
            dataset_id: Some(previous_dataset_id),
        }) = previous
        else {
            warn!("Previous step has no resolved dataset, cannot copy");
            return Ok(());
        };
        let (Some(project_name), Some(dataset_name)) =
            (ctx.settings.project_name(), ctx.settings.dataset_name())
        else {
            warn!("Source project or dataset is not selected, cannot copy");
            return Ok(());
        };

        let previous_meta = ctx.platform.projects.get_meta(previous_project_id).await?;

        // A project left behind by an interrupted copy is reused so the
        // by-name lookup keeps resolving to a single project.
        let project = match ctx
            .platform
            .projects
            .get_info_by_name(workspace_id, project_name)
            .await?
        {
            Some(project) => {
                let mut meta = ctx.platform.projects.get_meta(project.id).await?;
                if meta.merge_classes(&previous_meta.classes) + meta.merge_tags(&previous_meta.tags) > 0 {
                    ctx.platform.projects.update_meta(project.id, &meta).await?;
                }
                project
            }
            None => {
                let project = ctx.platform.projects.create(workspace_id, project_name).await?;
                ctx.platform.projects.update_meta(project.id, &previous_meta).await?;
                project
            }
        };
        self.project_id = Some(project.id);

        let copied = ctx
            .platform
            .datasets
            .copy(project.id, previous_dataset_id, dataset_name, true)
            .await?;
        if let Some(dataset) = &copied {
            self.dataset_id = Some(dataset.id);
        }

        log_step_operation(
            operations::COPY_DATASET,
            self.step_number,
            copied.as_ref().map(|d| d.id),
            None,
            if copied.is_some() { "copied" } else { "copy_pending" },
            Some(&format!("from dataset {previous_dataset_id} into project {}", project.id)),
        );
        Ok(())
    }
}

fn dedup_ids(user_ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut ids = Vec::new();
    for id in user_ids {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn filled_step() -> WorkflowStep {
        let mut step = WorkflowStep::new(2);
        step.set_team(Some(10));
        step.set_workspace(Some(20));
        step.set_class_options(vec![ObjClass::new("car", "rectangle"), ObjClass::new("person", "polygon")]);
        step.set_tag_options(vec![TagMeta::new("night", "none")]);
        step.select_classes(&["car"]);
        step.select_tags(&["night"]);
        step.set_reviewers([1]);
        step.set_labelers([2, 3]);
        step
    }

    #[test]
    fn test_team_change_clears_team_scoped_selections() {
        let mut step = filled_step();
        assert!(!step.set_team(Some(10)));
        assert_eq!(step.workspace_id(), Some(20));

        assert!(step.set_team(Some(11)));
        assert_eq!(step.workspace_id(), None);
        assert!(step.reviewer_ids().is_empty());
        assert!(step.labeler_ids().is_empty());
        assert_eq!(step.selected_classes().len(), 1);
    }

    #[test]
    fn test_select_by_name_reports_unknown_and_dedups() {
        let mut step = filled_step();
        let unknown = step.select_classes(&["person", "truck", "person"]);
        assert_eq!(unknown, vec!["truck".to_string()]);
        assert_eq!(step.selected_classes().len(), 1);
        assert_eq!(step.selected_classes()[0].name, "person");
    }

    #[test]
    fn test_new_options_drop_stale_selections() {
        let mut step = filled_step();
        step.set_class_options(vec![ObjClass::new("person", "polygon")]);
        assert!(step.selected_classes().is_empty());
    }

    #[test]
    fn test_reset_keeps_options() {
        let mut step = filled_step();
        step.reset();
        assert!(!step.is_filled(SelectionRequirements::default()));
        assert_eq!(step.team_id(), None);
        assert!(step.selected_tags().is_empty());
        assert_eq!(step.class_options().len(), 2);
    }

    #[test]
    fn test_apply_snapshot_restores_users_despite_team_reset() {
        let source = filled_step();
        let mut restored = WorkflowStep::new(2);
        restored.set_team(Some(99));
        restored.set_reviewers([42]);

        restored.apply_snapshot(&source.to_snapshot());
        assert_eq!(restored.team_id(), Some(10));
        assert_eq!(restored.reviewer_ids(), &[1]);
        assert_eq!(restored.labeler_ids(), &[2, 3]);
        assert_eq!(restored.selected_classes()[0].name, "car");
        assert!(restored.class_options().iter().any(|class| class.name == "car"));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let value = serde_json::to_value(filled_step().to_snapshot()).unwrap();
        assert_eq!(value["step_number"], 2);
        assert_eq!(value["team_id"], 10);
        assert_eq!(value["selected_classes"][0]["title"], "car");
        assert_eq!(value["labeler_ids"], serde_json::json!([2, 3]));

        let partial: StepSnapshot = serde_json::from_value(serde_json::json!({"step_number": 4})).unwrap();
        assert_eq!(partial.team_id, None);
        assert!(partial.reviewer_ids.is_empty());
    }

    proptest! {
        #[test]
        fn test_is_filled_matches_definition(
            team in proptest::option::of(1i64..100),
            workspace in proptest::option::of(1i64..100),
            reviewers in proptest::collection::vec(1i64..50, 0..3),
            labelers in proptest::collection::vec(1i64..50, 0..3),
            with_class in any::<bool>(),
            with_tag in any::<bool>(),
            classes_required in any::<bool>(),
            tags_required in any::<bool>(),
        ) {
            let mut step = WorkflowStep::new(1);
            step.set_team(team);
            step.set_workspace(workspace);
            step.set_reviewers(reviewers.clone());
            step.set_labelers(labelers.clone());
            step.set_class_options(vec![ObjClass::new("car", "rectangle")]);
            step.set_tag_options(vec![TagMeta::new("night", "none")]);
            if with_class {
                step.select_classes(&["car"]);
            }
            if with_tag {
                step.select_tags(&["night"]);
            }

            let requirements = SelectionRequirements { classes_required, tags_required };
            let expected = team.is_some()
                && workspace.is_some()
                && !reviewers.is_empty()
                && !labelers.is_empty()
                && (!classes_required || with_class)
                && (!tags_required || with_tag);
            prop_assert_eq!(step.is_filled(requirements), expected);
        }

        #[test]
        fn test_snapshot_round_trip(
            team in proptest::option::of(1i64..100),
            workspace in proptest::option::of(1i64..100),
            project in proptest::option::of(1i64..1000),
            dataset in proptest::option::of(1i64..1000),
            class_names in proptest::collection::btree_set("[a-z]{1,8}", 0..4),
            tag_names in proptest::collection::btree_set("[a-z]{1,8}", 0..4),
            reviewers in proptest::collection::vec(1i64..50, 0..4),
            labelers in proptest::collection::vec(1i64..50, 0..4),
        ) {
            let snapshot = StepSnapshot {
                step_number: 3,
                team_id: team,
                workspace_id: workspace,
                project_id: project,
                dataset_id: dataset,
                selected_classes: class_names.iter().map(|n| ObjClass::new(n.as_str(), "rectangle")).collect(),
                selected_tags: tag_names.iter().map(|n| TagMeta::new(n.as_str(), "none")).collect(),
                reviewer_ids: reviewers.clone(),
                labeler_ids: labelers.clone(),
            };

            let mut step = WorkflowStep::new(3);
            step.apply_snapshot(&snapshot);
            let json = serde_json::to_value(step.to_snapshot()).unwrap();
            let restored: StepSnapshot = serde_json::from_value(json).unwrap();

            prop_assert_eq!(restored.team_id, team);
            prop_assert_eq!(restored.workspace_id, workspace);
            prop_assert_eq!(restored.project_id, project);
            prop_assert_eq!(restored.dataset_id, dataset);
            let restored_classes: std::collections::BTreeSet<String> =
                restored.selected_classes.iter().map(|c| c.name.clone()).collect();
            prop_assert_eq!(restored_classes, class_names);
            let restored_tags: std::collections::BTreeSet<String> =
                restored.selected_tags.iter().map(|t| t.name.clone()).collect();
            prop_assert_eq!(restored_tags, tag_names);
            prop_assert_eq!(restored.reviewer_ids, dedup_ids(reviewers));
            prop_assert_eq!(restored.labeler_ids, dedup_ids(labelers));
        }
    }
}
