//! Configuration loading for the crossbill CLI.

use anyhow::{Context, Result};
use cb_client::{AuthConfig, CommerceConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Platform API connection.
    pub platform: CommerceConfig,

    /// Worker pool width for the report pipeline.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,
}

fn default_workers() -> usize {
    cb_core::DEFAULT_CONCURRENCY
}

/// Logging section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON-formatted logs.
    #[serde(default)]
    pub json_format: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Creates a copy with secrets redacted.
    pub fn redact_secrets(&self) -> Self {
        let mut config = self.clone();
        config.platform.client.auth = match &config.platform.client.auth {
            AuthConfig::None => AuthConfig::None,
            AuthConfig::BearerToken { .. } => AuthConfig::BearerToken {
                token: "***REDACTED***".to_string(),
            },
            AuthConfig::ApiKey { header_name, .. } => AuthConfig::ApiKey {
                key: "***REDACTED***".to_string(),
                header_name: header_name.clone(),
            },
        };
        config
    }
}
