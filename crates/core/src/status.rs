// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observed status of a CronJob.
//!
//! Status is owned by the controller and rewritten on every completed
//! reconciliation pass. It is a cache of substrate truth, never a source
//! of it.

use crate::run::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Machine-checkable condition codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConditionCode {
    /// Schedule or spec fields are invalid; no runs until the spec changes
    InvalidSchedule,
    /// The most recent fire time was past its starting deadline
    MissedSchedule,
    /// Missed fire times exceeded the enumeration cap
    TooManyMissedRuns,
}

impl ConditionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionCode::InvalidSchedule => "InvalidSchedule",
            ConditionCode::MissedSchedule => "MissedSchedule",
            ConditionCode::TooManyMissedRuns => "TooManyMissedRuns",
        }
    }
}

impl std::fmt::Display for ConditionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A condition recorded by the most recent reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub code: ConditionCode,
    pub message: String,
    pub observed_at: DateTime<Utc>,
}

impl Condition {
    pub fn new(code: ConditionCode, message: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            code,
            message: message.into(),
            observed_at,
        }
    }
}

/// Observed state of a CronJob
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJobStatus {
    /// Runs currently live in the substrate
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub active_runs: BTreeSet<RunId>,
    /// Most recent completion time of a successful run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_successful_time: Option<DateTime<Utc>>,
    /// Most recent fire time a run was materialized for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_schedule_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl CronJobStatus {
    pub fn condition(&self, code: ConditionCode) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.code == code)
    }

    pub fn has_condition(&self, code: ConditionCode) -> bool {
        self.condition(code).is_some()
    }

    /// Record a condition, replacing any earlier one with the same code.
    /// Conditions stay sorted by code.
    pub fn set_condition(&mut self, condition: Condition) {
        self.conditions.retain(|c| c.code != condition.code);
        self.conditions.push(condition);
        self.conditions.sort_by_key(|c| c.code);
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
