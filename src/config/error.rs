use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Missing required configuration value: {key}")]
    MissingValue { key: String },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigurationError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingValue { key: key.into() }
    }

    pub fn invalid_value(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;
