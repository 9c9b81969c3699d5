//! Config loading, validation, and derived values.

use super::model::Config;
use crate::error::{Result, SubrunError};
use std::io;
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            SubrunError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content).map(Some)
    }

    /// Load config from a YAML file, falling back to defaults when absent.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::load(path)?.unwrap_or_default())
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| SubrunError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            SubrunError::io("failed to serialize config to YAML", io::Error::other(e))
        })
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - `codex_cmd` must not be empty
    /// - `idle_timeout_seconds`, `poll_interval_ms` and `chunk_size` must be positive
    /// - `extra_args` must split as shell words
    pub fn validate(&self) -> Result<()> {
        if self.codex_cmd.trim().is_empty() {
            return Err(SubrunError::UserError(
                "config validation failed: codex_cmd must not be empty".to_string(),
            ));
        }

        if self.idle_timeout_seconds == 0 {
            return Err(SubrunError::UserError(
                "config validation failed: idle_timeout_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(SubrunError::UserError(
                "config validation failed: poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.chunk_size == 0 {
            return Err(SubrunError::UserError(
                "config validation failed: chunk_size must be greater than 0".to_string(),
            ));
        }

        self.extra_args()?;
        Ok(())
    }

    /// Split `extra_args` into an argument vector.
    pub fn extra_args(&self) -> Result<Vec<String>> {
        shell_words::split(&self.extra_args).map_err(|e| {
            SubrunError::UserError(format!(
                "config validation failed: extra_args '{}' cannot be parsed: {}\n\
                 Fix: check for unmatched quotes or invalid escape sequences.",
                self.extra_args, e
            ))
        })
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
