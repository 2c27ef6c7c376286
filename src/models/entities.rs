use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Project record as reported by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub id: i64,
    pub name: String,
    pub workspace_id: i64,
    /// Free-form JSON document attached to the project
    #[serde(default)]
    pub custom_data: Map<String, Value>,
}

/// Dataset record as reported by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetInfo {
    pub id: i64,
    pub name: String,
    pub project_id: i64,
}

/// Team member with the role they hold in that team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub role: String,
}

impl UserInfo {
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.role.eq_ignore_ascii_case(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_info_from_platform_json() {
        let project: ProjectInfo = serde_json::from_value(json!({
            "id": 12,
            "name": "Cars",
            "workspaceId": 3,
            "customData": {"owner": "ops"},
            "type": "images"
        }))
        .unwrap();

        assert_eq!(project.workspace_id, 3);
        assert_eq!(project.custom_data["owner"], "ops");
    }

    #[test]
    fn test_missing_custom_data_defaults_to_empty() {
        let project: ProjectInfo =
            serde_json::from_value(json!({"id": 1, "name": "p", "workspaceId": 2})).unwrap();
        assert!(project.custom_data.is_empty());
    }

    #[test]
    fn test_user_role_matching() {
        let user = UserInfo {
            id: 1,
            login: "alice".to_string(),
            role: "Manager".to_string(),
        };
        assert!(user.has_any_role(&["manager"]));
        assert!(!user.has_any_role(&["annotator", "reviewer"]));
    }
}
