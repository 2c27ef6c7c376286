//! Configuration Loader
//!
//! Environment-aware loading: defaults, optional TOML file, prefixed
//! environment variables, then the platform's native launch variables.

use config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

use super::error::ConfigResult;
use super::LabelingConfig;

const ENV_PREFIX: &str = "LABELING";
const CONFIG_PATH_VAR: &str = "LABELING_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/labeling.toml";

/// Platform launch variables, first match wins
const NATIVE_OVERRIDES: &[(&str, &[&str])] = &[
    ("platform.server_address", &["SERVER_ADDRESS"]),
    ("platform.api_token", &["API_TOKEN"]),
    ("launch.team_id", &["TEAM_ID", "context.teamId"]),
    ("launch.workspace_id", &["WORKSPACE_ID", "context.workspaceId"]),
    (
        "launch.project_id",
        &["PROJECT_ID", "modal.state.slyProjectId", "context.projectId"],
    ),
    (
        "launch.dataset_id",
        &["DATASET_ID", "modal.state.slyDatasetId", "context.datasetId"],
    ),
    (
        "launch.number_of_teams",
        &["modal.state.numberOfTeams", "NUMBER_OF_TEAMS"],
    ),
];

/// Current deployment environment name
pub fn detect_environment() -> String {
    std::env::var("LABELING_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .or_else(|_| std::env::var("ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Layered configuration loader
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    vars: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// Read the process environment (and dotenv files in development)
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Use an explicit variable set instead of the process environment
    pub fn from_vars(vars: HashMap<String, String>) -> Self {
        Self {
            file: None,
            vars: Some(vars),
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn load(&self) -> ConfigResult<LabelingConfig> {
        let vars = match &self.vars {
            Some(vars) => vars.clone(),
            None => {
                Self::load_dotenv_files();
                std::env::vars().collect()
            }
        };

        let file = self
            .file
            .clone()
            .or_else(|| vars.get(CONFIG_PATH_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        debug!(config_file = %file.display(), "Loading labeling workflow configuration");

        let mut builder = Config::builder()
            .set_default("platform.server_address", "")?
            .set_default("platform.api_token", "")?
            .set_default("platform.request_timeout_seconds", 60_i64)?
            .set_default("launch.team_id", 0_i64)?
            .set_default("launch.workspace_id", 0_i64)?
            .set_default("launch.number_of_teams", 0_i64)?
            .set_default("workflow.copy_settle_delay_ms", 5_000_i64)?
            .set_default("workflow.classes_required", false)?
            .set_default("workflow.tags_required", false)?
            .set_default("monitor.interval_ms", 10_000_i64)?
            .set_default("monitor.tick_ms", 1_000_i64)?
            .set_default("monitor.stop_timeout_ms", 2_000_i64)?
            .set_default("web.bind_address", "0.0.0.0:8000")?
            .add_source(File::from(file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars.clone())),
            );

        for (key, names) in NATIVE_OVERRIDES {
            let value = names
                .iter()
                .find_map(|name| vars.get(*name).filter(|value| !value.trim().is_empty()));
            if let Some(value) = value {
                builder = builder.set_override(*key, value.trim())?;
            }
        }

        let config: LabelingConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            "Configuration loaded: {}",
            serde_json::to_string(&config.sanitized())
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        Ok(config)
    }

    fn load_dotenv_files() {
        if detect_environment() != "development" {
            return;
        }
        if dotenvy::from_filename("local.env").is_ok() {
            debug!("Loaded local.env");
        }
        if let Ok(home) = std::env::var("HOME") {
            let path = PathBuf::from(home).join("supervisely.env");
            if dotenvy::from_path(&path).is_ok() {
                debug!(path = %path.display(), "Loaded platform credentials file");
            }
        }
    }
}
