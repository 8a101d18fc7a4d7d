// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cj-core: domain types for the CronJob controller

pub mod clock;
pub mod cronjob;
pub mod id;
pub mod run;
pub mod status;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use cronjob::{
    ConcurrencyPolicy, CronJob, CronJobId, CronJobSpec, CronJobSpecBuilder, JobTemplate, SpecError,
};
pub use run::{Run, RunId, RunOutcome};
pub use status::{Condition, ConditionCode, CronJobStatus};
