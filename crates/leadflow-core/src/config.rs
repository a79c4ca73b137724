//! Configuration for the lead state machine, loaded from TOML.
//!
//! Every field has a default; a missing file means all defaults.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::DEFAULT_TIMER_MAX_ATTEMPTS;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadMachineConfig {
    /// Delay of the no-response (`TIMER_7D`) timer after first contact.
    #[serde(default = "default_retarget_after_days")]
    pub retarget_after_days: u32,

    /// Delay of the escalation (`TIMER_14D`) timer after first contact.
    #[serde(default = "default_escalate_after_days")]
    pub escalate_after_days: u32,

    #[serde(default = "default_timer_max_attempts")]
    pub timer_max_attempts: u32,

    /// Due timers handled per sweep.
    #[serde(default = "default_sweep_batch_size")]
    pub sweep_batch_size: usize,

    /// Re-validate-and-retry rounds when a concurrent writer wins.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
}

fn default_retarget_after_days() -> u32 {
    7
}

fn default_escalate_after_days() -> u32 {
    14
}

fn default_timer_max_attempts() -> u32 {
    DEFAULT_TIMER_MAX_ATTEMPTS
}

fn default_sweep_batch_size() -> usize {
    100
}

fn default_max_conflict_retries() -> u32 {
    3
}

impl Default for LeadMachineConfig {
    fn default() -> Self {
        Self {
            retarget_after_days: default_retarget_after_days(),
            escalate_after_days: default_escalate_after_days(),
            timer_max_attempts: default_timer_max_attempts(),
            sweep_batch_size: default_sweep_batch_size(),
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

impl LeadMachineConfig {
    /// Load from `path`, or defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retarget_after_days == 0 {
            return Err(ConfigError::Invalid(
                "retarget_after_days must be at least 1".into(),
            ));
        }
        if self.escalate_after_days <= self.retarget_after_days {
            return Err(ConfigError::Invalid(format!(
                "escalate_after_days ({}) must be later than retarget_after_days ({})",
                self.escalate_after_days, self.retarget_after_days
            )));
        }
        if self.timer_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "timer_max_attempts must be at least 1".into(),
            ));
        }
        if self.sweep_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "sweep_batch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn retarget_after(&self) -> Duration {
        Duration::days(i64::from(self.retarget_after_days))
    }

    pub fn escalate_after(&self) -> Duration {
        Duration::days(i64::from(self.escalate_after_days))
    }
}
