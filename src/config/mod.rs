//! # Labeling Workflow Configuration
//!
//! Startup parameters and tunables of the workflow application. Values are
//! layered by [`ConfigLoader`]: built-in defaults, an optional TOML file,
//! `LABELING__*` environment variables, then the platform's native launch
//! variables (`SERVER_ADDRESS`, `TEAM_ID`, `modal.state.numberOfTeams`, ...).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use multiteam_labeling::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::from_env().load()?;
//! println!("{} teams", config.launch.number_of_teams);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::timing;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::{detect_environment, ConfigLoader};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LabelingConfig {
    pub platform: PlatformConfig,
    pub launch: LaunchConfig,
    pub workflow: ProgressionConfig,
    pub monitor: MonitorConfig,
    pub web: WebConfig,
}

/// Connection to the labeling platform
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformConfig {
    pub server_address: String,
    pub api_token: String,
    pub request_timeout_seconds: u64,
}

/// Context the application was launched with
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LaunchConfig {
    pub team_id: i64,
    pub workspace_id: i64,
    pub project_id: Option<i64>,
    pub dataset_id: Option<i64>,
    /// Number of sequential team steps
    pub number_of_teams: u32,
}

/// Step progression tunables
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProgressionConfig {
    pub copy_settle_delay_ms: u64,
    pub classes_required: bool,
    pub tags_required: bool,
}

impl ProgressionConfig {
    pub fn copy_settle_delay(&self) -> Duration {
        Duration::from_millis(self.copy_settle_delay_ms)
    }
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            copy_settle_delay_ms: timing::COPY_SETTLE_DELAY.as_millis() as u64,
            classes_required: false,
            tags_required: false,
        }
    }
}

/// Status monitor timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    pub interval_ms: u64,
    pub tick_ms: u64,
    pub stop_timeout_ms: u64,
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: timing::MONITOR_INTERVAL.as_millis() as u64,
            tick_ms: timing::MONITOR_TICK.as_millis() as u64,
            stop_timeout_ms: timing::MONITOR_STOP_TIMEOUT.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebConfig {
    pub bind_address: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

impl LabelingConfig {
    /// Reject configurations the workflow cannot start with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.platform.server_address.trim().is_empty() {
            return Err(ConfigurationError::missing("platform.server_address"));
        }
        if self.platform.api_token.trim().is_empty() {
            return Err(ConfigurationError::missing("platform.api_token"));
        }
        if self.launch.number_of_teams == 0 {
            return Err(ConfigurationError::missing("launch.number_of_teams"));
        }
        if self.launch.team_id <= 0 {
            return Err(ConfigurationError::invalid_value(
                "launch.team_id",
                self.launch.team_id.to_string(),
                "must be a positive platform id",
            ));
        }
        if self.launch.workspace_id <= 0 {
            return Err(ConfigurationError::invalid_value(
                "launch.workspace_id",
                self.launch.workspace_id.to_string(),
                "must be a positive platform id",
            ));
        }
        if self.monitor.tick_ms == 0 || self.monitor.interval_ms < self.monitor.tick_ms {
            return Err(ConfigurationError::invalid_value(
                "monitor.tick_ms",
                self.monitor.tick_ms.to_string(),
                "must be non-zero and not exceed monitor.interval_ms",
            ));
        }
        Ok(())
    }

    /// JSON view of the configuration with the API token masked
    pub fn sanitized(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(token) = value.pointer_mut("/platform/api_token") {
            *token = serde_json::Value::String("***REDACTED***".to_string());
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> LabelingConfig {
        LabelingConfig {
            platform: PlatformConfig {
                server_address: "https://labeling.example.com".to_string(),
                api_token: "secret".to_string(),
                request_timeout_seconds: 60,
            },
            launch: LaunchConfig {
                team_id: 1,
                workspace_id: 2,
                project_id: None,
                dataset_id: None,
                number_of_teams: 3,
            },
            workflow: ProgressionConfig::default(),
            monitor: MonitorConfig::default(),
            web: WebConfig::default(),
        }
    }

    #[test]
    fn test_defaults_match_workflow_timing() {
        let monitor = MonitorConfig::default();
        assert_eq!(monitor.interval(), Duration::from_secs(10));
        assert_eq!(monitor.tick(), Duration::from_secs(1));
        assert_eq!(monitor.stop_timeout(), Duration::from_secs(2));
        assert_eq!(
            ProgressionConfig::default().copy_settle_delay(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_validate_rejects_zero_teams() {
        let mut config = valid_config();
        assert!(config.validate().is_ok());

        config.launch.number_of_teams = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::MissingValue { key }) if key == "launch.number_of_teams"
        ));
    }

    #[test]
    fn test_validate_rejects_tick_longer_than_interval() {
        let mut config = valid_config();
        config.monitor.tick_ms = config.monitor.interval_ms + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_requires_token() {
        let mut config = valid_config();
        config.platform.api_token = " ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::MissingValue { key }) if key == "platform.api_token"
        ));
    }

    #[test]
    fn test_sanitized_masks_token() {
        let sanitized = valid_config().sanitized();
        assert_eq!(sanitized["platform"]["api_token"], "***REDACTED***");
        assert_eq!(sanitized["launch"]["number_of_teams"], 3);
    }
}
