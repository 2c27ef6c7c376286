//! In-memory labeling platform for integration tests.
//!
//! Implements every platform contract over shared state and records the calls
//! it receives so tests can assert on side effects.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use multiteam_labeling::models::{
    CreateQueueRequest, DatasetInfo, LabelingQueueInfo, ProjectInfo, ProjectMeta, QueueStatus,
    UserInfo,
};
use multiteam_labeling::platform::{
    DatasetApi, LabelingQueueApi, PlatformError, PlatformResult, PlatformServices, ProjectApi,
    UserDirectory,
};

#[derive(Debug, Clone)]
pub struct StoredQueue {
    pub info: LabelingQueueInfo,
    pub request: Option<CreateQueueRequest>,
}

#[derive(Debug, Default)]
pub struct FakePlatformState {
    next_id: i64,
    pub projects: BTreeMap<i64, ProjectInfo>,
    pub metas: HashMap<i64, ProjectMeta>,
    pub datasets: BTreeMap<i64, DatasetInfo>,
    pub queues: BTreeMap<i64, StoredQueue>,
    pub members: HashMap<i64, Vec<UserInfo>>,
    /// (destination project, source dataset) of every copy request
    pub copies: Vec<(i64, i64)>,
    /// Accept copy requests without making the copy visible
    pub hide_copies: bool,
    /// Copies stay invisible to name lookups for this long
    pub copy_visible_after: Option<Duration>,
    /// Dataset id -> instant from which name lookups see it
    pub visible_at: HashMap<i64, Instant>,
    pub calls: Vec<String>,
    pub timeline: Vec<(String, Instant)>,
}

impl FakePlatformState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        100 + self.next_id
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePlatform {
    state: Arc<Mutex<FakePlatformState>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn services(self: &Arc<Self>) -> PlatformServices {
        PlatformServices::from_shared(self.clone())
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, FakePlatformState> {
        self.state.lock().unwrap()
    }

    pub fn add_project(&self, workspace_id: i64, name: &str) -> ProjectInfo {
        let mut state = self.state();
        let project = ProjectInfo {
            id: state.next_id(),
            name: name.to_string(),
            workspace_id,
            custom_data: Map::new(),
        };
        state.projects.insert(project.id, project.clone());
        state.metas.insert(project.id, ProjectMeta::default());
        project
    }

    pub fn add_dataset(&self, project_id: i64, name: &str) -> DatasetInfo {
        let mut state = self.state();
        let dataset = DatasetInfo {
            id: state.next_id(),
            name: name.to_string(),
            project_id,
        };
        state.datasets.insert(dataset.id, dataset.clone());
        dataset
    }

    pub fn add_queue(&self, dataset_id: i64, name: &str, status: QueueStatus) -> i64 {
        let mut state = self.state();
        let id = state.next_id();
        state.queues.insert(
            id,
            StoredQueue {
                info: LabelingQueueInfo {
                    id,
                    name: name.to_string(),
                    status,
                    dataset_id,
                },
                request: None,
            },
        );
        id
    }

    pub fn set_queue_status(&self, queue_id: i64, status: QueueStatus) {
        if let Some(queue) = self.state().queues.get_mut(&queue_id) {
            queue.info.status = status;
        }
    }

    pub fn set_meta(&self, project_id: i64, meta: ProjectMeta) {
        self.state().metas.insert(project_id, meta);
    }

    pub fn meta(&self, project_id: i64) -> ProjectMeta {
        self.state().metas.get(&project_id).cloned().unwrap_or_default()
    }

    pub fn set_members(&self, team_id: i64, members: Vec<UserInfo>) {
        self.state().members.insert(team_id, members);
    }

    pub fn set_custom_data(&self, project_id: i64, custom_data: Map<String, Value>) {
        if let Some(project) = self.state().projects.get_mut(&project_id) {
            project.custom_data = custom_data;
        }
    }

    pub fn custom_data(&self, project_id: i64) -> Map<String, Value> {
        self.state()
            .projects
            .get(&project_id)
            .map(|project| project.custom_data.clone())
            .unwrap_or_default()
    }

    pub fn hide_copies(&self, hide: bool) {
        self.state().hide_copies = hide;
    }

    pub fn delay_copy_visibility(&self, delay: Duration) {
        self.state().copy_visible_after = Some(delay);
    }

    pub fn projects_in(&self, workspace_id: i64) -> Vec<ProjectInfo> {
        self.state()
            .projects
            .values()
            .filter(|project| project.workspace_id == workspace_id)
            .cloned()
            .collect()
    }

    /// Datasets of a project that name lookups can currently see
    pub fn datasets_in(&self, project_id: i64) -> Vec<DatasetInfo> {
        let now = Instant::now();
        let state = self.state();
        state
            .datasets
            .values()
            .filter(|dataset| dataset.project_id == project_id)
            .filter(|dataset| state.visible_at.get(&dataset.id).map_or(true, |at| *at <= now))
            .cloned()
            .collect()
    }

    pub fn queues_for(&self, dataset_id: i64) -> Vec<StoredQueue> {
        self.state()
            .queues
            .values()
            .filter(|queue| queue.info.dataset_id == dataset_id)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.state().calls.iter().filter(|c| c.as_str() == call).count()
    }

    /// Instants at which `call` was received, in order
    pub fn call_times(&self, call: &str) -> Vec<Instant> {
        self.state()
            .timeline
            .iter()
            .filter(|(c, _)| c.as_str() == call)
            .map(|(_, at)| *at)
            .collect()
    }

    fn record(&self, call: &str) {
        let mut state = self.state();
        state.calls.push(call.to_string());
        state.timeline.push((call.to_string(), Instant::now()));
    }
}

#[async_trait]
impl LabelingQueueApi for FakePlatform {
    async fn create(&self, request: &CreateQueueRequest) -> PlatformResult<i64> {
        self.record("queues.create");
        let mut state = self.state();
        let id = state.next_id();
        state.queues.insert(
            id,
            StoredQueue {
                info: LabelingQueueInfo {
                    id,
                    name: request.name.clone(),
                    status: QueueStatus::Pending,
                    dataset_id: request.dataset_id,
                },
                request: Some(request.clone()),
            },
        );
        Ok(id)
    }

    async fn get_info_by_id(&self, queue_id: i64) -> PlatformResult<LabelingQueueInfo> {
        self.state()
            .queues
            .get(&queue_id)
            .map(|queue| queue.info.clone())
            .ok_or_else(|| PlatformError::not_found("LabelingQueue", queue_id))
    }

    async fn get_list(
        &self,
        _team_id: i64,
        dataset_id: i64,
    ) -> PlatformResult<Vec<LabelingQueueInfo>> {
        self.record("queues.list");
        Ok(self
            .queues_for(dataset_id)
            .into_iter()
            .map(|queue| queue.info)
            .collect())
    }
}

#[async_trait]
impl ProjectApi for FakePlatform {
    async fn get_info_by_id(&self, project_id: i64) -> PlatformResult<ProjectInfo> {
        self.state()
            .projects
            .get(&project_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found("Project", project_id))
    }

    async fn get_info_by_name(
        &self,
        workspace_id: i64,
        name: &str,
    ) -> PlatformResult<Option<ProjectInfo>> {
        Ok(self
            .projects_in(workspace_id)
            .into_iter()
            .find(|project| project.name == name))
    }

    async fn create(&self, workspace_id: i64, name: &str) -> PlatformResult<ProjectInfo> {
        self.record("projects.create");
        Ok(self.add_project(workspace_id, name))
    }

    async fn get_meta(&self, project_id: i64) -> PlatformResult<ProjectMeta> {
        self.state()
            .metas
            .get(&project_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found("Project", project_id))
    }

    async fn update_meta(&self, project_id: i64, meta: &ProjectMeta) -> PlatformResult<()> {
        self.record("projects.update_meta");
        self.set_meta(project_id, meta.clone());
        Ok(())
    }

    async fn get_custom_data(&self, project_id: i64) -> PlatformResult<Map<String, Value>> {
        Ok(ProjectApi::get_info_by_id(self, project_id).await?.custom_data)
    }

    async fn update_custom_data(
        &self,
        project_id: i64,
        custom_data: &Map<String, Value>,
    ) -> PlatformResult<()> {
        self.record("projects.update_custom_data");
        self.set_custom_data(project_id, custom_data.clone());
        Ok(())
    }
}

#[async_trait]
impl DatasetApi for FakePlatform {
    async fn get_info_by_id(&self, dataset_id: i64) -> PlatformResult<DatasetInfo> {
        self.state()
            .datasets
            .get(&dataset_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found("Dataset", dataset_id))
    }

    async fn get_info_by_name(
        &self,
        project_id: i64,
        name: &str,
    ) -> PlatformResult<Option<DatasetInfo>> {
        self.record("datasets.find");
        Ok(self
            .datasets_in(project_id)
            .into_iter()
            .find(|dataset| dataset.name == name))
    }

    async fn copy(
        &self,
        dst_project_id: i64,
        src_dataset_id: i64,
        new_name: &str,
        _with_annotations: bool,
    ) -> PlatformResult<Option<DatasetInfo>> {
        self.record("datasets.copy");
        let (hidden, visible_after) = {
            let mut state = self.state();
            state.copies.push((dst_project_id, src_dataset_id));
            (state.hide_copies, state.copy_visible_after)
        };
        if hidden {
            return Ok(None);
        }
        let copied = self.add_dataset(dst_project_id, new_name);
        if let Some(delay) = visible_after {
            self.state().visible_at.insert(copied.id, Instant::now() + delay);
        }
        Ok(Some(copied))
    }
}

#[async_trait]
impl UserDirectory for FakePlatform {
    async fn team_members(&self, team_id: i64) -> PlatformResult<Vec<UserInfo>> {
        Ok(self.state().members.get(&team_id).cloned().unwrap_or_default())
    }
}
