// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requeue timers, one per CronJob

use crate::manager::{Trigger, TriggerReason};
use chrono::{DateTime, Utc};
use cj_core::CronJobId;
use std::collections::HashMap;

/// Timer entry
#[derive(Debug, Clone, Copy)]
struct Timer {
    fires_at: DateTime<Utc>,
    reason: TriggerReason,
}

/// Pending requeue deadlines
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: HashMap<CronJobId, Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the requeue deadline for `id`, replacing any earlier one.
    pub fn set_timer(&mut self, id: CronJobId, fires_at: DateTime<Utc>, reason: TriggerReason) {
        self.timers.insert(id, Timer { fires_at, reason });
    }

    pub fn cancel_timer(&mut self, id: &CronJobId) {
        self.timers.remove(id);
    }

    /// Remove every timer due at `now` and return its trigger, earliest first.
    pub fn fired_timers(&mut self, now: DateTime<Utc>) -> Vec<Trigger> {
        let mut fired: Vec<(DateTime<Utc>, CronJobId, TriggerReason)> = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.fires_at <= now)
            .map(|(id, timer)| (timer.fires_at, id.clone(), timer.reason))
            .collect();
        fired.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        for (_, id, _) in &fired {
            self.timers.remove(id);
        }

        fired
            .into_iter()
            .map(|(_, id, reason)| Trigger { id, reason })
            .collect()
    }

    pub fn deadline(&self, id: &CronJobId) -> Option<DateTime<Utc>> {
        self.timers.get(id).map(|t| t.fires_at)
    }

    /// Get the next timer fire time
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.values().map(|t| t.fires_at).min()
    }

    pub fn has_timers(&self) -> bool {
        !self.timers.is_empty()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
