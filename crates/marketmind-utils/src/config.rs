//! Configuration management utilities

use crate::LogFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Unknown log format name
    #[error("Unknown log format '{0}' (expected 'text' or 'json')")]
    InvalidLogFormat(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application name
    pub app_name: String,
    /// Environment (development, production, etc.)
    pub environment: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "marketmind".to_string(),
            environment: "development".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Load from `MARKETMIND_ENV` and `MARKETMIND_LOG_FORMAT`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(env) = std::env::var("MARKETMIND_ENV") {
            config.environment = env;
        }
        if let Ok(format) = std::env::var("MARKETMIND_LOG_FORMAT") {
            config.log_format = format.parse()?;
        }
        Ok(config)
    }

    /// Whether this is a production deployment
    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "prod")
    }
}
