//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::models::session::SessionKind;
use crate::{AppError, Result};

/// Durable store sizing.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct StorageConfig {
    /// Projected usage above this logs a warning; the write is still attempted.
    pub soft_warning_bytes: u64,
    /// Hard quota; writes that would exceed it fail with `QuotaExceeded`.
    pub hard_quota_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            soft_warning_bytes: 4_500_000,
            hard_quota_bytes: 5_242_880,
        }
    }
}

/// History caps for persisted collections and in-memory diagram history.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct HistoryConfig {
    /// Maximum number of retained exam sessions.
    pub exam_sessions: usize,
    /// Maximum number of retained quiz sessions.
    pub quiz_sessions: usize,
    /// Maximum number of undo snapshots kept per diagram.
    pub diagram_snapshots: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            exam_sessions: 20,
            quiz_sessions: 10,
            diagram_snapshots: 200,
        }
    }
}

impl HistoryConfig {
    /// Retention cap for the given session kind.
    #[must_use]
    pub fn cap_for(&self, kind: SessionKind) -> usize {
        match kind {
            SessionKind::Exam => self.exam_sessions,
            SessionKind::Quiz => self.quiz_sessions,
        }
    }
}

/// Sandbox bootstrap and execution limits.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct SandboxConfig {
    /// Upper bound on interpreter bootstrap.
    pub bootstrap_timeout_seconds: u64,
    /// Operation budget for a single script run.
    pub script_max_operations: u64,
    /// Wall-clock budget for a single script run.
    pub script_timeout_seconds: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            bootstrap_timeout_seconds: 30,
            script_max_operations: 5_000_000,
            script_timeout_seconds: 10,
        }
    }
}

impl SandboxConfig {
    /// Bootstrap timeout as a [`Duration`].
    #[must_use]
    pub fn bootstrap_timeout(&self) -> Duration {
        Duration::from_secs(self.bootstrap_timeout_seconds)
    }

    /// Script run timeout as a [`Duration`].
    #[must_use]
    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_seconds)
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".assessment")
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Directory holding the local database file.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Durable store sizing.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Collection caps.
    #[serde(default)]
    pub history: HistoryConfig,
    /// Sandbox limits.
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage: StorageConfig::default(),
            history: HistoryConfig::default(),
            sandbox: SandboxConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Path of the `SQLite` database file inside `data_dir`.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("assessment.db")
    }

    fn validate(&self) -> Result<()> {
        if self.history.exam_sessions == 0 || self.history.quiz_sessions == 0 {
            return Err(AppError::Config(
                "history caps must be greater than zero".into(),
            ));
        }

        if self.history.diagram_snapshots == 0 {
            return Err(AppError::Config(
                "diagram_snapshots must be greater than zero".into(),
            ));
        }

        if self.storage.soft_warning_bytes > self.storage.hard_quota_bytes {
            return Err(AppError::Config(
                "soft_warning_bytes must not exceed hard_quota_bytes".into(),
            ));
        }

        if self.sandbox.bootstrap_timeout_seconds == 0
            || self.sandbox.script_timeout_seconds == 0
            || self.sandbox.script_max_operations == 0
        {
            return Err(AppError::Config(
                "sandbox limits must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
