// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! CronJob reconciliation engine

pub mod config;
mod controller;
pub mod duration;
pub mod env;
mod error;
pub mod history;
mod manager;
pub mod policy;
pub mod schedule;
mod scheduler;
pub mod status;

pub use config::{ConfigError, ControllerConfig};
pub use controller::{Action, Controller, ReconcileOutcome, Requeue};
pub use error::ReconcileError;
pub use manager::{Manager, Trigger, TriggerReason};
pub use policy::Decision;
pub use schedule::{next_fire_times, FireTimes, Schedule, ScheduleError};
pub use scheduler::Scheduler;
