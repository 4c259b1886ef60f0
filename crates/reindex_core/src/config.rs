//! Configuration for reindex runs.

use crate::error::{ReindexError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Name of the optional config file inside the mail directory.
pub const CONFIG_FILE_NAME: &str = "reindex.toml";

/// Comprehensive configuration for a reindex run.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Progress reporting configuration.
    #[serde(default)]
    pub progress: ProgressConfig,

    /// Search index writer configuration.
    #[serde(default)]
    pub index: IndexConfig,
}

impl Config {
    /// Load configuration from `reindex.toml` in the mail directory.
    ///
    /// A missing file yields the defaults.
    pub fn load(mail_dir: &Path) -> Result<Self> {
        let path = mail_dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| ReindexError::ConfigError(format!("failed to read config: {}", e)))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| ReindexError::ConfigError(format!("failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to `reindex.toml` in the mail directory.
    pub fn save(&self, mail_dir: &Path) -> Result<()> {
        let path = mail_dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self).map_err(|e| {
            ReindexError::ConfigError(format!("failed to serialize config: {}", e))
        })?;
        fs::write(&path, content)
            .map_err(|e| ReindexError::ConfigError(format!("failed to write config: {}", e)))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.index.flush_every == 0 {
            return Err(ReindexError::ConfigError(
                "index.flush_every must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Progress reporting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressConfig {
    /// Seconds between progress lines (default: 5).
    pub interval_secs: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

impl ProgressConfig {
    /// Returns the reporting interval as a Duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Search index writer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexConfig {
    /// Documents buffered in memory before a write transaction (default: 1000).
    pub flush_every: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { flush_every: 1000 }
    }
}
