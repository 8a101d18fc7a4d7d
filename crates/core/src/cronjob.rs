// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CronJob resource: user-authored desired state.

use crate::status::CronJobStatus;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

crate::define_id! {
    /// Identity of a CronJob resource.
    ///
    /// Also the owner identity the execution substrate uses to list runs
    /// belonging to this resource.
    pub struct CronJobId;
}

/// How a new run interacts with runs that are still active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConcurrencyPolicy {
    /// Start new runs regardless of active ones.
    #[default]
    Allow,
    /// Skip a due run while any run is active.
    Forbid,
    /// Terminate active runs and start the new one.
    Replace,
}

impl ConcurrencyPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcurrencyPolicy::Allow => "Allow",
            ConcurrencyPolicy::Forbid => "Forbid",
            ConcurrencyPolicy::Replace => "Replace",
        }
    }
}

impl std::fmt::Display for ConcurrencyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque work template, handed to the execution substrate verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobTemplate(pub serde_json::Value);

impl JobTemplate {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Rejected spec field values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("schedule must not be empty")]
    EmptySchedule,
    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: i64 },
}

/// Desired state of a CronJob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJobSpec {
    /// Cron-style schedule expression
    pub schedule: String,
    /// Seconds after a fire time during which a late run may still start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_deadline_seconds: Option<i64>,
    #[serde(default)]
    pub concurrency_policy: ConcurrencyPolicy,
    /// Freezes creation of new runs; active runs are left alone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspend: Option<bool>,
    pub job_template: JobTemplate,
    #[serde(
        default,
        rename = "successfulJobsHistoryLimit",
        skip_serializing_if = "Option::is_none"
    )]
    pub successful_history_limit: Option<i32>,
    #[serde(
        default,
        rename = "failedJobsHistoryLimit",
        skip_serializing_if = "Option::is_none"
    )]
    pub failed_history_limit: Option<i32>,
}

impl CronJobSpec {
    /// Create a builder for a spec with the given schedule.
    pub fn builder(schedule: impl Into<String>) -> CronJobSpecBuilder {
        CronJobSpecBuilder {
            spec: CronJobSpec {
                schedule: schedule.into(),
                starting_deadline_seconds: None,
                concurrency_policy: ConcurrencyPolicy::Allow,
                suspend: None,
                job_template: JobTemplate::default(),
                successful_history_limit: None,
                failed_history_limit: None,
            },
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspend.unwrap_or(false)
    }

    pub fn starting_deadline(&self) -> Option<Duration> {
        self.starting_deadline_seconds
            .map(|secs| Duration::try_seconds(secs).unwrap_or(Duration::MAX))
    }

    /// Retention for successful runs. `None` means unbounded.
    pub fn successful_limit(&self) -> Option<usize> {
        self.successful_history_limit
            .map(|n| usize::try_from(n).unwrap_or(0))
    }

    /// Retention for failed runs. `None` means unbounded.
    pub fn failed_limit(&self) -> Option<usize> {
        self.failed_history_limit
            .map(|n| usize::try_from(n).unwrap_or(0))
    }

    /// Check field constraints that the schedule parser does not cover.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.schedule.trim().is_empty() {
            return Err(SpecError::EmptySchedule);
        }
        if let Some(value) = self.starting_deadline_seconds.filter(|v| *v < 0) {
            return Err(SpecError::Negative {
                field: "startingDeadlineSeconds",
                value,
            });
        }
        if let Some(value) = self.successful_history_limit.filter(|v| *v < 0) {
            return Err(SpecError::Negative {
                field: "successfulJobsHistoryLimit",
                value: i64::from(value),
            });
        }
        if let Some(value) = self.failed_history_limit.filter(|v| *v < 0) {
            return Err(SpecError::Negative {
                field: "failedJobsHistoryLimit",
                value: i64::from(value),
            });
        }
        Ok(())
    }
}

/// Builder for [`CronJobSpec`]
pub struct CronJobSpecBuilder {
    spec: CronJobSpec,
}

impl CronJobSpecBuilder {
    pub fn starting_deadline_seconds(mut self, seconds: i64) -> Self {
        self.spec.starting_deadline_seconds = Some(seconds);
        self
    }

    pub fn concurrency_policy(mut self, policy: ConcurrencyPolicy) -> Self {
        self.spec.concurrency_policy = policy;
        self
    }

    pub fn suspend(mut self, suspend: bool) -> Self {
        self.spec.suspend = Some(suspend);
        self
    }

    pub fn job_template(mut self, template: serde_json::Value) -> Self {
        self.spec.job_template = JobTemplate(template);
        self
    }

    pub fn successful_history_limit(mut self, limit: i32) -> Self {
        self.spec.successful_history_limit = Some(limit);
        self
    }

    pub fn failed_history_limit(mut self, limit: i32) -> Self {
        self.spec.failed_history_limit = Some(limit);
        self
    }

    pub fn build(self) -> CronJobSpec {
        self.spec
    }
}

/// A CronJob resource as held by the resource store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJob {
    pub id: CronJobId,
    /// When the resource was created; lower bound of the first fire window
    pub created_at: DateTime<Utc>,
    pub spec: CronJobSpec,
    #[serde(default)]
    pub status: CronJobStatus,
}

impl CronJob {
    pub fn new(id: impl Into<CronJobId>, created_at: DateTime<Utc>, spec: CronJobSpec) -> Self {
        Self {
            id: id.into(),
            created_at,
            spec,
            status: CronJobStatus::default(),
        }
    }
}

#[cfg(test)]
#[path = "cronjob_tests.rs"]
mod tests;
