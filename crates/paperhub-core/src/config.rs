//! Configuration for paperhub-core
//!
//! Where the database lives and how the SQLite connection is tuned.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable overriding the database path.
pub const DATABASE_ENV: &str = "PAPERHUB_DATABASE";
/// Environment variable overriding the busy timeout.
pub const BUSY_TIMEOUT_ENV: &str = "PAPERHUB_BUSY_TIMEOUT_MS";

/// Upper bound accepted for the busy timeout (one minute).
const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Wal,
    Delete,
    Memory,
}

impl JournalMode {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
            JournalMode::Memory => "MEMORY",
        }
    }
}

impl std::str::FromStr for JournalMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wal" => Ok(JournalMode::Wal),
            "delete" => Ok(JournalMode::Delete),
            "memory" => Ok(JournalMode::Memory),
            other => Err(ConfigError::InvalidValue(format!(
                "unknown journal mode {:?}",
                other
            ))),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file; `None` opens an in-memory database
    pub path: Option<PathBuf>,
    pub journal_mode: JournalMode,
    /// How long a writer waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            journal_mode: JournalMode::Wal,
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    /// Configuration for a file-backed database at `path`
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json_str)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Apply `PAPERHUB_DATABASE` / `PAPERHUB_BUSY_TIMEOUT_MS` overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(
            std::env::var(DATABASE_ENV).ok(),
            std::env::var(BUSY_TIMEOUT_ENV).ok(),
        )
    }

    fn with_overrides(
        mut self,
        path: Option<String>,
        busy_timeout: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            self.path = Some(PathBuf::from(path));
        }
        if let Some(raw) = busy_timeout {
            self.busy_timeout_ms = raw.trim().parse().map_err(|_| {
                ConfigError::InvalidValue(format!("{} must be an integer, got {:?}", BUSY_TIMEOUT_ENV, raw))
            })?;
        }
        Ok(self)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::OutOfRange(format!(
                "busy_timeout_ms must be at most {}",
                MAX_BUSY_TIMEOUT_MS
            )));
        }

        if let Some(path) = &self.path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "path must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}
