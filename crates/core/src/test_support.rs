// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{CronJobId, Run, RunId, RunOutcome};
use chrono::{DateTime, TimeZone, Utc};

/// UTC timestamp from calendar fields. Panics on invalid input (tests only).
#[allow(clippy::unwrap_used)]
pub fn utc(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
        .single()
        .unwrap()
}

/// A running run created for `fire_time` of `owner`.
pub fn running_run(owner: &str, fire_time: DateTime<Utc>) -> Run {
    let owner = CronJobId::new(owner);
    Run::running(RunId::scheduled(&owner, fire_time), owner, fire_time)
}

/// A finished run created for `fire_time` and completed at `finished_at`.
pub fn finished_run(
    owner: &str,
    fire_time: DateTime<Utc>,
    outcome: RunOutcome,
    finished_at: DateTime<Utc>,
) -> Run {
    Run {
        finished_at: Some(finished_at),
        outcome,
        ..running_run(owner, fire_time)
    }
}
