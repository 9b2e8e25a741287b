//! Runtime configuration resolved from environment variables.
//!
//! # Invariants
//! - Unset or blank variables fall back to defaults.
//! - Set but unparsable variables are errors, never silently ignored.

use std::path::PathBuf;
use thiserror::Error;

use crate::board::sync::{PatchFailurePolicy, SyncOptions};
use crate::logging::default_log_level;
use crate::model::patch::UpcomingDatePolicy;

pub const ENV_DB_PATH: &str = "TASKBOARD_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TASKBOARD_LOG_LEVEL";
pub const ENV_UPCOMING_POLICY: &str = "TASKBOARD_UPCOMING_POLICY";
pub const ENV_PATCH_FAILURE: &str = "TASKBOARD_PATCH_FAILURE";

const DEFAULT_DB_FILE_NAME: &str = "taskboard.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value for {key}: {message}")]
pub struct ConfigError {
    pub key: &'static str,
    pub message: String,
}

/// Resolved configuration for hosts (CLI, FFI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub sync: SyncOptions,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            sync: SyncOptions::default(),
        }
    }
}

impl BoardConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through `lookup`, which returns raw values by key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(raw) = read(ENV_UPCOMING_POLICY) {
            config.sync.upcoming_policy = raw.parse().map_err(|message| ConfigError {
                key: ENV_UPCOMING_POLICY,
                message,
            })?;
        }
        if let Some(raw) = read(ENV_PATCH_FAILURE) {
            config.sync.failure_policy = raw.parse().map_err(|message| ConfigError {
                key: ENV_PATCH_FAILURE,
                message,
            })?;
        }

        Ok(config)
    }

    pub fn with_upcoming_policy(mut self, policy: UpcomingDatePolicy) -> Self {
        self.sync.upcoming_policy = policy;
        self
    }

    pub fn with_failure_policy(mut self, policy: PatchFailurePolicy) -> Self {
        self.sync.failure_policy = policy;
        self
    }
}
