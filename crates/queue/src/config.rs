//! Queue configuration.
//!
//! Stored as TOML; every field has a default so partial files are valid.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::QueueError;

/// How finished transfers are confirmed with the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// `complete()` right after each transfer.
    #[default]
    PerItem,
    /// One `batch_complete()` plus `batch_status()` when the round settles.
    Batched,
}

/// Runtime settings for an [`UploadQueue`](crate::UploadQueue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum simultaneous transfers.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Batches kept in history (0 = unbounded).
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default)]
    pub completion_mode: CompletionMode,

    /// Capacity of the event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_concurrency_limit() -> usize {
    5
}

fn default_history_limit() -> usize {
    10
}

fn default_event_buffer() -> usize {
    256
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            history_limit: default_history_limit(),
            completion_mode: CompletionMode::default(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn check_permits(field: &str, value: usize) -> Result<(), QueueError> {
    if value == 0 {
        return Err(QueueError::InvalidConfig(format!(
            "{field} must be at least 1"
        )));
    }
    if value > Semaphore::MAX_PERMITS {
        return Err(QueueError::InvalidConfig(format!(
            "{field} must be at most {}",
            Semaphore::MAX_PERMITS
        )));
    }
    Ok(())
}

impl QueueConfig {
    /// Returns a default config with the given slot count.
    pub fn with_concurrency(concurrency_limit: usize) -> Self {
        Self {
            concurrency_limit,
            ..Self::default()
        }
    }

    /// Both counts size tokio semaphores, so they must lie in
    /// `1..=Semaphore::MAX_PERMITS`.
    pub fn validate(&self) -> Result<(), QueueError> {
        check_permits("concurrency_limit", self.concurrency_limit)?;
        check_permits("event_buffer", self.event_buffer)
    }

    /// Reads a config file; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, QueueError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: QueueConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the config as pretty TOML, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), QueueError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}
