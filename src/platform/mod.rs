//! # Platform Collaborators
//!
//! Contracts of the labeling platform services the workflow consumes, and the
//! bundle of implementations handed to the coordinator.
//!
//! - [`LabelingQueueApi`] - create and look up labeling queues
//! - [`ProjectApi`] - projects, their class/tag meta and custom data
//! - [`DatasetApi`] - datasets and dataset copies
//! - [`UserDirectory`] - team members and their roles
//!
//! [`client::PlatformClient`] implements all four over the platform REST API.

pub mod client;
pub mod errors;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::models::{
    CreateQueueRequest, DatasetInfo, LabelingQueueInfo, ProjectInfo, ProjectMeta, UserInfo,
};

pub use client::PlatformClient;
pub use errors::{PlatformError, PlatformResult};

#[async_trait]
pub trait LabelingQueueApi: Send + Sync {
    /// Create a queue and return its id
    async fn create(&self, request: &CreateQueueRequest) -> PlatformResult<i64>;

    async fn get_info_by_id(&self, queue_id: i64) -> PlatformResult<LabelingQueueInfo>;

    /// Queues of a team that label the given dataset
    async fn get_list(&self, team_id: i64, dataset_id: i64)
        -> PlatformResult<Vec<LabelingQueueInfo>>;
}

#[async_trait]
pub trait ProjectApi: Send + Sync {
    async fn get_info_by_id(&self, project_id: i64) -> PlatformResult<ProjectInfo>;

    async fn get_info_by_name(
        &self,
        workspace_id: i64,
        name: &str,
    ) -> PlatformResult<Option<ProjectInfo>>;

    async fn create(&self, workspace_id: i64, name: &str) -> PlatformResult<ProjectInfo>;

    async fn get_meta(&self, project_id: i64) -> PlatformResult<ProjectMeta>;

    async fn update_meta(&self, project_id: i64, meta: &ProjectMeta) -> PlatformResult<()>;

    async fn get_custom_data(&self, project_id: i64) -> PlatformResult<Map<String, Value>>;

    async fn update_custom_data(
        &self,
        project_id: i64,
        custom_data: &Map<String, Value>,
    ) -> PlatformResult<()>;
}

#[async_trait]
pub trait DatasetApi: Send + Sync {
    async fn get_info_by_id(&self, dataset_id: i64) -> PlatformResult<DatasetInfo>;

    async fn get_info_by_name(
        &self,
        project_id: i64,
        name: &str,
    ) -> PlatformResult<Option<DatasetInfo>>;

    /// Copy a dataset into another project under a new name
    async fn copy(
        &self,
        dst_project_id: i64,
        src_dataset_id: i64,
        new_name: &str,
        with_annotations: bool,
    ) -> PlatformResult<Option<DatasetInfo>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn team_members(&self, team_id: i64) -> PlatformResult<Vec<UserInfo>>;
}

/// Handles to every platform service the workflow talks to
#[derive(Clone)]
pub struct PlatformServices {
    pub queues: Arc<dyn LabelingQueueApi>,
    pub projects: Arc<dyn ProjectApi>,
    pub datasets: Arc<dyn DatasetApi>,
    pub users: Arc<dyn UserDirectory>,
}

impl PlatformServices {
    /// Use one value that implements every service
    pub fn from_shared<T>(platform: Arc<T>) -> Self
    where
        T: LabelingQueueApi + ProjectApi + DatasetApi + UserDirectory + 'static,
    {
        Self {
            queues: platform.clone(),
            projects: platform.clone(),
            datasets: platform.clone(),
            users: platform,
        }
    }
}

impl std::fmt::Debug for PlatformServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformServices").finish_non_exhaustive()
    }
}
