//! Saved workflow configurations.
//!
//! Configurations live in the source project's custom data:
//! `custom_data[WORKFLOW_CONFIG_KEY][dataset_id][step_number] = StepSnapshot`.
//! Writes replace a single dataset entry and leave everything else in the
//! document untouched.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::step::StepSnapshot;
use crate::constants::WORKFLOW_CONFIG_KEY;
use crate::error::Result;
use crate::platform::ProjectApi;

/// Snapshots of every step, keyed by step number
pub type WorkflowSnapshot = BTreeMap<u32, StepSnapshot>;

/// Saved configuration of one dataset, if there is a readable one
pub async fn load_dataset_snapshot(
    projects: &dyn ProjectApi,
    project_id: i64,
    dataset_id: i64,
) -> Result<Option<WorkflowSnapshot>> {
    let custom_data = projects.get_custom_data(project_id).await?;
    let Some(entry) = custom_data
        .get(WORKFLOW_CONFIG_KEY)
        .and_then(|document| document.get(dataset_id.to_string()))
    else {
        debug!(project_id, dataset_id, "No saved workflow configuration");
        return Ok(None);
    };

    match serde_json::from_value::<WorkflowSnapshot>(entry.clone()) {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(error) => {
            warn!(project_id, dataset_id, error = %error, "Ignoring unreadable saved workflow configuration");
            Ok(None)
        }
    }
}

/// Replace the saved configuration of one dataset
pub async fn save_dataset_snapshot(
    projects: &dyn ProjectApi,
    project_id: i64,
    dataset_id: i64,
    snapshot: &WorkflowSnapshot,
) -> Result<()> {
    let mut custom_data = projects.get_custom_data(project_id).await?;
    merge_dataset_entry(&mut custom_data, dataset_id, serde_json::to_value(snapshot)?);
    projects.update_custom_data(project_id, &custom_data).await?;
    Ok(())
}

fn merge_dataset_entry(custom_data: &mut Map<String, Value>, dataset_id: i64, entry: Value) {
    let document = custom_data
        .entry(WORKFLOW_CONFIG_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    if !document.is_object() {
        warn!("Workflow configuration document is not an object, replacing it");
        *document = Value::Object(Map::new());
    }
    if let Value::Object(datasets) = document {
        datasets.insert(dataset_id.to_string(), entry);
    }
}
