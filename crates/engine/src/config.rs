// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller configuration.
//!
//! Defaults, then an optional TOML file, then `CJ_*` environment variables.
//!
//! ```toml
//! max_missed_runs = 100
//! status_write_attempts = 3
//! base_backoff = "1s"
//! max_backoff = "5m"
//! min_requeue = "1s"
//! reconcile_timeout = "30s"
//! timer_check_interval = "1s"
//! ```

use crate::duration::parse_duration;
use crate::env;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Tunables for the controller and manager loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Cap on enumerated missed fire times per pass
    pub max_missed_runs: usize,
    /// Attempts at writing status when the record keeps moving
    pub status_write_attempts: u32,
    /// First retry delay after a failed pass
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    /// Floor on how soon a pass may schedule the next one
    pub min_requeue: Duration,
    /// Upper bound on a single pass
    pub reconcile_timeout: Duration,
    /// How often the manager checks for due requeues
    pub timer_check_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_missed_runs: 100,
            status_write_attempts: 3,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(300),
            min_requeue: Duration::from_secs(1),
            reconcile_timeout: Duration::from_secs(30),
            timer_check_interval: Duration::from_secs(1),
        }
    }
}

/// Durations may be written as strings ("500ms") or bare seconds
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DurationValue {
    Seconds(u64),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    max_missed_runs: Option<usize>,
    status_write_attempts: Option<u32>,
    base_backoff: Option<DurationValue>,
    max_backoff: Option<DurationValue>,
    min_requeue: Option<DurationValue>,
    reconcile_timeout: Option<DurationValue>,
    timer_check_interval: Option<DurationValue>,
}

fn duration_value(key: &str, value: Option<DurationValue>) -> Result<Option<Duration>, ConfigError> {
    match value {
        None => Ok(None),
        Some(DurationValue::Seconds(secs)) => Ok(Some(Duration::from_secs(secs))),
        Some(DurationValue::Text(text)) => {
            parse_duration(&text)
                .map(Some)
                .map_err(|e| ConfigError::Invalid {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
        }
    }
}

impl ControllerConfig {
    /// Parse a TOML document over the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        let mut config = Self::default();
        if let Some(v) = file.max_missed_runs {
            config.max_missed_runs = v;
        }
        if let Some(v) = file.status_write_attempts {
            config.status_write_attempts = v;
        }
        if let Some(v) = duration_value("base_backoff", file.base_backoff)? {
            config.base_backoff = v;
        }
        if let Some(v) = duration_value("max_backoff", file.max_backoff)? {
            config.max_backoff = v;
        }
        if let Some(v) = duration_value("min_requeue", file.min_requeue)? {
            config.min_requeue = v;
        }
        if let Some(v) = duration_value("reconcile_timeout", file.reconcile_timeout)? {
            config.reconcile_timeout = v;
        }
        if let Some(v) = duration_value("timer_check_interval", file.timer_check_interval)? {
            config.timer_check_interval = v;
        }
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)?.with_env_overrides()
    }

    /// Defaults with environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(v) = env::max_missed_runs()? {
            self.max_missed_runs = v;
        }
        if let Some(v) = env::status_write_attempts()? {
            self.status_write_attempts = v;
        }
        if let Some(v) = env::base_backoff()? {
            self.base_backoff = v;
        }
        if let Some(v) = env::max_backoff()? {
            self.max_backoff = v;
        }
        if let Some(v) = env::min_requeue()? {
            self.min_requeue = v;
        }
        if let Some(v) = env::reconcile_timeout()? {
            self.reconcile_timeout = v;
        }
        if let Some(v) = env::timer_check_interval()? {
            self.timer_check_interval = v;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, reason: &str| {
            Err(ConfigError::Invalid {
                key: key.to_string(),
                reason: reason.to_string(),
            })
        };
        if self.max_missed_runs == 0 {
            return invalid("max_missed_runs", "must be at least 1");
        }
        if self.status_write_attempts == 0 {
            return invalid("status_write_attempts", "must be at least 1");
        }
        if self.base_backoff.is_zero() {
            return invalid("base_backoff", "must be positive");
        }
        if self.max_backoff < self.base_backoff {
            return invalid("max_backoff", "must not be less than base_backoff");
        }
        if self.reconcile_timeout.is_zero() {
            return invalid("reconcile_timeout", "must be positive");
        }
        if self.timer_check_interval.is_zero() {
            return invalid("timer_check_interval", "must be positive");
        }
        Ok(())
    }

    /// Retry delay after `failures` consecutive failed passes (1-based).
    pub fn backoff(&self, failures: u32) -> Duration {
        let factor = 1u32
            .checked_shl(failures.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
