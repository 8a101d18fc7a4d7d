// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution substrate port
//!
//! The substrate runs work and reports outcomes. The controller only asks it
//! to create, delete, and list runs; it never executes anything itself.

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSubstrate, SubstrateCall};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cj_core::{CronJobId, JobTemplate, Run, RunId, RunOutcome};
use thiserror::Error;

/// Errors from substrate operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubstrateError {
    /// A run with this scheduling identity already exists
    #[error("run already exists: {0}")]
    AlreadyExists(RunId),
    #[error("run not found: {0}")]
    NotFound(RunId),
    /// Throttling, timeouts, unavailable backends; safe to retry later
    #[error("transient substrate error: {0}")]
    Transient(String),
}

impl SubstrateError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SubstrateError::Transient(_))
    }
}

/// Request to materialize one fire time as a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub owner: CronJobId,
    /// Scheduling identity; the substrate must reject duplicates
    pub id: RunId,
    pub scheduled_for: DateTime<Utc>,
    pub template: JobTemplate,
}

/// Adapter for the system that executes runs
#[async_trait]
pub trait SubstrateAdapter: Clone + Send + Sync + 'static {
    /// Create a run. Fails with `AlreadyExists` if `request.id` is taken.
    async fn create_run(&self, request: RunRequest) -> Result<Run, SubstrateError>;

    /// Delete a run, terminating it if still running.
    async fn delete_run(&self, id: &RunId) -> Result<(), SubstrateError>;

    /// Every run of `owner` still present in the substrate, live or finished.
    async fn list_runs(&self, owner: &CronJobId) -> Result<Vec<Run>, SubstrateError>;

    /// Current outcome of a single run.
    async fn run_outcome(&self, id: &RunId) -> Result<RunOutcome, SubstrateError>;
}
