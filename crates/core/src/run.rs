// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs: concrete executions owned by the execution substrate.
//!
//! The controller only references runs. A run's id doubles as its
//! scheduling identity, `"{owner}-{unix_seconds}"`, so the substrate can
//! reject a second creation for the same fire time.

use crate::cronjob::CronJobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identity of a run in the execution substrate.
    pub struct RunId;
}

impl RunId {
    /// Scheduling identity for the run materializing `fire_time` of `owner`.
    pub fn scheduled(owner: &CronJobId, fire_time: DateTime<Utc>) -> Self {
        Self::new(format!("{}-{}", owner, fire_time.timestamp()))
    }

    /// Fire time encoded in a scheduling identity, if this id is one.
    pub fn fire_time(&self) -> Option<DateTime<Utc>> {
        let (_, secs) = self.0.rsplit_once('-')?;
        let secs = secs.parse::<i64>().ok()?;
        DateTime::<Utc>::from_timestamp(secs, 0)
    }
}

/// Observed state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunOutcome {
    Running,
    Succeeded,
    Failed,
}

impl RunOutcome {
    pub fn is_finished(&self) -> bool {
        !matches!(self, RunOutcome::Running)
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Running => f.write_str("running"),
            RunOutcome::Succeeded => f.write_str("succeeded"),
            RunOutcome::Failed => f.write_str("failed"),
        }
    }
}

/// A run as reported by the execution substrate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub owner: CronJobId,
    /// Fire time this run was created for
    pub scheduled_for: DateTime<Utc>,
    pub outcome: RunOutcome,
    /// Completion time; set once `outcome` is terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Run {
    /// A freshly created, still running run.
    pub fn running(id: RunId, owner: CronJobId, scheduled_for: DateTime<Utc>) -> Self {
        Self {
            id,
            owner,
            scheduled_for,
            outcome: RunOutcome::Running,
            finished_at: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_finished()
    }

    /// Completion time used for history ordering. Falls back to the
    /// scheduled time when the substrate did not report one.
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.finished_at.unwrap_or(self.scheduled_for)
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
