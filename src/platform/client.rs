//! HTTP client for the labeling platform's public REST API.
//!
//! Every call is `POST {server}/public/api/v3/{method}` with a JSON body and
//! the `x-api-key` header. List endpoints wrap their rows in `entities`.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};

use super::errors::{PlatformError, PlatformResult};
use super::{DatasetApi, LabelingQueueApi, ProjectApi, UserDirectory};
use crate::config::PlatformConfig;
use crate::logging::log_platform_call;
use crate::models::{
    CreateQueueRequest, DatasetInfo, LabelingQueueInfo, ProjectInfo, ProjectMeta, UserInfo,
};

const API_PREFIX: &str = "/public/api/v3";
const API_KEY_HEADER: &str = "x-api-key";

/// REST method names
mod methods {
    pub const PROJECT_INFO: &str = "projects.info";
    pub const PROJECT_LIST: &str = "projects.list";
    pub const PROJECT_ADD: &str = "projects.add";
    pub const PROJECT_META: &str = "projects.meta";
    pub const PROJECT_META_UPDATE: &str = "projects.meta.update";
    pub const PROJECT_EDIT_INFO: &str = "projects.editInfo";
    pub const DATASET_INFO: &str = "datasets.info";
    pub const DATASET_LIST: &str = "datasets.list";
    pub const DATASET_BULK_COPY: &str = "datasets.bulk.copy";
    pub const DATASET_EDIT_INFO: &str = "datasets.editInfo";
    pub const QUEUE_ADD: &str = "labeling-queues.add";
    pub const QUEUE_INFO: &str = "labeling-queues.info";
    pub const QUEUE_LIST: &str = "labeling-queues.list";
    pub const MEMBERS_LIST: &str = "members.list";
}

#[derive(Debug, Deserialize)]
struct EntityList<T> {
    #[serde(default = "Vec::new")]
    entities: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CreatedId {
    id: i64,
}

/// Platform REST client implementing every collaborator contract
#[derive(Clone, Debug)]
pub struct PlatformClient {
    client: Client,
    base_url: String,
    api_token: String,
}

impl PlatformClient {
    pub fn new(config: &PlatformConfig) -> PlatformResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.server_address.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}{}/{}", self.base_url, API_PREFIX, method)
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: &str,
        body: &B,
    ) -> PlatformResult<T> {
        let value = self.post_raw(method, body).await?;
        serde_json::from_value(value).map_err(|e| PlatformError::decode(method, e.to_string()))
    }

    async fn post_raw<B: Serialize + ?Sized>(&self, method: &str, body: &B) -> PlatformResult<Value> {
        let started = Instant::now();
        let response = match self
            .client
            .post(self.method_url(method))
            .header(API_KEY_HEADER, &self.api_token)
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                log_platform_call(method, None, started.elapsed().as_millis() as u64, false);
                return Err(error.into());
            }
        };

        let status = response.status();
        log_platform_call(
            method,
            Some(status.as_u16()),
            started.elapsed().as_millis() as u64,
            status.is_success(),
        );
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PlatformError::Http {
                method: method.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| PlatformError::decode(method, e.to_string()))
    }

    fn name_filter(name: &str) -> Value {
        json!([{ "field": "name", "operator": "=", "value": name }])
    }
}

#[async_trait]
impl LabelingQueueApi for PlatformClient {
    async fn create(&self, request: &CreateQueueRequest) -> PlatformResult<i64> {
        let created: CreatedId = self.post(methods::QUEUE_ADD, request).await?;
        Ok(created.id)
    }

    async fn get_info_by_id(&self, queue_id: i64) -> PlatformResult<LabelingQueueInfo> {
        self.post(methods::QUEUE_INFO, &json!({ "id": queue_id })).await
    }

    async fn get_list(
        &self,
        team_id: i64,
        dataset_id: i64,
    ) -> PlatformResult<Vec<LabelingQueueInfo>> {
        let body = json!({
            "teamId": team_id,
            "filter": [{ "field": "datasetId", "operator": "=", "value": dataset_id }],
        });
        let list: EntityList<LabelingQueueInfo> = self.post(methods::QUEUE_LIST, &body).await?;
        Ok(list.entities)
    }
}

#[async_trait]
impl ProjectApi for PlatformClient {
    async fn get_info_by_id(&self, project_id: i64) -> PlatformResult<ProjectInfo> {
        let value = self
            .post_raw(methods::PROJECT_INFO, &json!({ "id": project_id }))
            .await?;
        if value.is_null() {
            return Err(PlatformError::not_found("Project", project_id));
        }
        serde_json::from_value(value)
            .map_err(|e| PlatformError::decode(methods::PROJECT_INFO, e.to_string()))
    }

    async fn get_info_by_name(
        &self,
        workspace_id: i64,
        name: &str,
    ) -> PlatformResult<Option<ProjectInfo>> {
        let body = json!({ "workspaceId": workspace_id, "filter": Self::name_filter(name) });
        let list: EntityList<ProjectInfo> = self.post(methods::PROJECT_LIST, &body).await?;
        Ok(list.entities.into_iter().find(|project| project.name == name))
    }

    async fn create(&self, workspace_id: i64, name: &str) -> PlatformResult<ProjectInfo> {
        let body = json!({
            "workspaceId": workspace_id,
            "title": name,
            "type": "images",
            "changeDescriptionIfConflict": false,
        });
        self.post(methods::PROJECT_ADD, &body).await
    }

    async fn get_meta(&self, project_id: i64) -> PlatformResult<ProjectMeta> {
        self.post(methods::PROJECT_META, &json!({ "id": project_id }))
            .await
    }

    async fn update_meta(&self, project_id: i64, meta: &ProjectMeta) -> PlatformResult<()> {
        self.post_raw(
            methods::PROJECT_META_UPDATE,
            &json!({ "id": project_id, "meta": meta }),
        )
        .await?;
        Ok(())
    }

    async fn get_custom_data(&self, project_id: i64) -> PlatformResult<Map<String, Value>> {
        let project = ProjectApi::get_info_by_id(self, project_id).await?;
        Ok(project.custom_data)
    }

    async fn update_custom_data(
        &self,
        project_id: i64,
        custom_data: &Map<String, Value>,
    ) -> PlatformResult<()> {
        self.post_raw(
            methods::PROJECT_EDIT_INFO,
            &json!({ "id": project_id, "customData": custom_data }),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DatasetApi for PlatformClient {
    async fn get_info_by_id(&self, dataset_id: i64) -> PlatformResult<DatasetInfo> {
        let value = self
            .post_raw(methods::DATASET_INFO, &json!({ "id": dataset_id }))
            .await?;
        if value.is_null() {
            return Err(PlatformError::not_found("Dataset", dataset_id));
        }
        serde_json::from_value(value)
            .map_err(|e| PlatformError::decode(methods::DATASET_INFO, e.to_string()))
    }

    async fn get_info_by_name(
        &self,
        project_id: i64,
        name: &str,
    ) -> PlatformResult<Option<DatasetInfo>> {
        let body = json!({ "projectId": project_id, "filter": Self::name_filter(name) });
        let list: EntityList<DatasetInfo> = self.post(methods::DATASET_LIST, &body).await?;
        Ok(list.entities.into_iter().find(|dataset| dataset.name == name))
    }

    async fn copy(
        &self,
        dst_project_id: i64,
        src_dataset_id: i64,
        new_name: &str,
        with_annotations: bool,
    ) -> PlatformResult<Option<DatasetInfo>> {
        let body = json!({
            "ids": [src_dataset_id],
            "destProjectId": dst_project_id,
            "withAnnotations": with_annotations,
        });
        let copied: Vec<DatasetInfo> = self.post(methods::DATASET_BULK_COPY, &body).await?;
        let Some(dataset) = copied.into_iter().next() else {
            return Ok(None);
        };

        if dataset.name == new_name {
            return Ok(Some(dataset));
        }

        let renamed: DatasetInfo = self
            .post(
                methods::DATASET_EDIT_INFO,
                &json!({ "id": dataset.id, "name": new_name }),
            )
            .await?;
        Ok(Some(renamed))
    }
}

#[async_trait]
impl UserDirectory for PlatformClient {
    async fn team_members(&self, team_id: i64) -> PlatformResult<Vec<UserInfo>> {
        let list: EntityList<UserInfo> = self
            .post(methods::MEMBERS_LIST, &json!({ "teamId": team_id }))
            .await?;
        Ok(list.entities)
    }
}
