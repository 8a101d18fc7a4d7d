// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status aggregation from substrate-reported runs

use cj_core::{CronJobStatus, Run, RunOutcome};

/// Rebuild status from the runs the substrate currently reports.
///
/// `active_runs` is overwritten with the running set. `last_successful_time`
/// and `last_schedule_time` only move forward. Conditions are carried over
/// untouched.
pub fn aggregate(current: &CronJobStatus, runs: &[Run]) -> CronJobStatus {
    let active_runs = runs
        .iter()
        .filter(|r| r.outcome == RunOutcome::Running)
        .map(|r| r.id.clone())
        .collect();

    let newest_success = runs
        .iter()
        .filter(|r| r.outcome == RunOutcome::Succeeded)
        .map(Run::completed_at)
        .max();

    let newest_scheduled = runs.iter().map(|r| r.scheduled_for).max();

    CronJobStatus {
        active_runs,
        last_successful_time: current.last_successful_time.max(newest_success),
        last_schedule_time: current.last_schedule_time.max(newest_scheduled),
        conditions: current.conditions.clone(),
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
