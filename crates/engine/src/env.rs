// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

use crate::config::ConfigError;
use std::str::FromStr;
use std::time::Duration;

pub const MAX_MISSED_RUNS: &str = "CJ_MAX_MISSED_RUNS";
pub const STATUS_WRITE_ATTEMPTS: &str = "CJ_STATUS_WRITE_ATTEMPTS";
pub const BASE_BACKOFF_MS: &str = "CJ_BASE_BACKOFF_MS";
pub const MAX_BACKOFF_MS: &str = "CJ_MAX_BACKOFF_MS";
pub const MIN_REQUEUE_MS: &str = "CJ_MIN_REQUEUE_MS";
pub const RECONCILE_TIMEOUT_MS: &str = "CJ_RECONCILE_TIMEOUT_MS";
pub const TIMER_CHECK_MS: &str = "CJ_TIMER_CHECK_MS";

/// Missed fire time enumeration cap override
pub fn max_missed_runs() -> Result<Option<usize>, ConfigError> {
    parsed(MAX_MISSED_RUNS)
}

/// Status write attempts per pass override
pub fn status_write_attempts() -> Result<Option<u32>, ConfigError> {
    parsed(STATUS_WRITE_ATTEMPTS)
}

pub fn base_backoff() -> Result<Option<Duration>, ConfigError> {
    millis(BASE_BACKOFF_MS)
}

pub fn max_backoff() -> Result<Option<Duration>, ConfigError> {
    millis(MAX_BACKOFF_MS)
}

pub fn min_requeue() -> Result<Option<Duration>, ConfigError> {
    millis(MIN_REQUEUE_MS)
}

pub fn reconcile_timeout() -> Result<Option<Duration>, ConfigError> {
    millis(RECONCILE_TIMEOUT_MS)
}

/// Timer check interval override
pub fn timer_check_interval() -> Result<Option<Duration>, ConfigError> {
    millis(TIMER_CHECK_MS)
}

fn millis(key: &'static str) -> Result<Option<Duration>, ConfigError> {
    Ok(parsed::<u64>(key)?.map(Duration::from_millis))
}

fn parsed<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            reason: format!("cannot parse {raw:?}"),
        })
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
