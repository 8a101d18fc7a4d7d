// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation manager.
//!
//! Resource-change notifications and requeue timers both become a
//! [`Trigger`] for the same entry point. Passes for one resource are
//! serialized by a per-resource lock; different resources reconcile
//! concurrently.

use crate::controller::{Action, Controller, ReconcileOutcome, Requeue};
use crate::error::ReconcileError;
use crate::scheduler::Scheduler;
use cj_adapters::SubstrateAdapter;
use cj_core::{Clock, CronJobId};
use cj_storage::{ResourceStore, StoreError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinSet;
use tracing::{debug, error, info, Instrument};

/// Why a pass was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerReason {
    /// Spec or status edited, or initial sync
    Changed,
    /// Requeue time computed by an earlier pass
    Timer,
    /// Backoff after a failed pass
    Retry,
}

/// Request to reconcile one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub id: CronJobId,
    pub reason: TriggerReason,
}

impl Trigger {
    pub fn changed(id: impl Into<CronJobId>) -> Self {
        Self {
            id: id.into(),
            reason: TriggerReason::Changed,
        }
    }
}

type PassLock = Arc<tokio::sync::Mutex<()>>;

/// Routes triggers into serialized reconciliation passes
pub struct Manager<S, St, C: Clock> {
    controller: Controller<S, St, C>,
    scheduler: Arc<Mutex<Scheduler>>,
    locks: Mutex<HashMap<CronJobId, PassLock>>,
}

impl<S, St, C> Manager<S, St, C>
where
    S: SubstrateAdapter,
    St: ResourceStore,
    C: Clock,
{
    pub fn new(controller: Controller<S, St, C>) -> Self {
        Self {
            controller,
            scheduler: Arc::new(Mutex::new(Scheduler::new())),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn controller(&self) -> &Controller<S, St, C> {
        &self.controller
    }

    /// Shared handle to the requeue timers
    pub fn scheduler(&self) -> Arc<Mutex<Scheduler>> {
        Arc::clone(&self.scheduler)
    }

    fn lock_for(&self, id: &CronJobId) -> PassLock {
        Arc::clone(self.locks.lock().entry(id.clone()).or_default())
    }

    /// Run one pass for the trigger's resource, waiting for any pass already
    /// in flight for it, and record the requeue it asks for.
    pub async fn reconcile(&self, trigger: Trigger) -> ReconcileOutcome {
        let id = trigger.id;
        let lock = self.lock_for(&id);
        let guard = lock.lock().await;
        debug!(cronjob = %id, reason = ?trigger.reason, "reconciling");

        let timeout = self.controller.config().reconcile_timeout;
        let outcome = match tokio::time::timeout(timeout, self.controller.reconcile(&id)).await {
            Ok(outcome) => outcome,
            // The abandoned pass is repeated from scratch on retry
            Err(_) => self
                .controller
                .failed(&id, ReconcileError::Timeout(timeout)),
        };

        let now = self.controller.clock().now();
        {
            let mut scheduler = self.scheduler.lock();
            match outcome.requeue {
                Requeue::At(at) => scheduler.set_timer(id.clone(), at, TriggerReason::Timer),
                Requeue::After(delay) => {
                    let at = chrono::Duration::from_std(delay)
                        .ok()
                        .and_then(|d| now.checked_add_signed(d))
                        .unwrap_or(now);
                    scheduler.set_timer(id.clone(), at, TriggerReason::Retry);
                }
                Requeue::Never => scheduler.cancel_timer(&id),
            }
        }
        drop(guard);
        if outcome.action == Action::Deleted {
            self.release_lock(&id, &lock);
        }
        outcome
    }

    /// Forget a deleted resource's lock unless another pass is queued on it.
    fn release_lock(&self, id: &CronJobId, lock: &PassLock) {
        let mut locks = self.locks.lock();
        // One reference in the map, one held by the caller
        let idle = locks
            .get(id)
            .is_some_and(|held| Arc::ptr_eq(held, lock) && Arc::strong_count(lock) == 2);
        if idle {
            locks.remove(id);
        }
    }

    /// Reconcile every stored resource once.
    pub async fn resync(&self) -> Result<usize, StoreError> {
        let ids = self.controller.store().list()?;
        let count = ids.len();
        for id in ids {
            self.reconcile(Trigger::changed(id)).await;
        }
        Ok(count)
    }

    /// Process triggers and due timers until shutdown is notified or the
    /// trigger channel closes. In-flight passes finish before returning.
    pub async fn run(
        self: Arc<Self>,
        mut triggers: mpsc::Receiver<Trigger>,
        shutdown: Arc<Notify>,
    ) {
        // Must be created outside the loop so activity does not reset it
        let mut timer_check =
            tokio::time::interval(self.controller.config().timer_check_interval);
        timer_check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut passes = JoinSet::new();

        info!("manager started");
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    info!("shutdown requested");
                    break;
                }
                trigger = triggers.recv() => match trigger {
                    Some(trigger) => Self::spawn_pass(&self, &mut passes, trigger),
                    None => {
                        info!("trigger channel closed");
                        break;
                    }
                },
                _ = timer_check.tick() => {
                    let now = self.controller.clock().now();
                    let fired = self.scheduler.lock().fired_timers(now);
                    for trigger in fired {
                        Self::spawn_pass(&self, &mut passes, trigger);
                    }
                }
                Some(joined) = passes.join_next(), if !passes.is_empty() => {
                    if let Err(e) = joined {
                        error!("reconcile task failed: {}", e);
                    }
                }
            }
        }

        while let Some(joined) = passes.join_next().await {
            if let Err(e) = joined {
                error!("reconcile task failed: {}", e);
            }
        }
        info!("manager stopped");
    }

    fn spawn_pass(manager: &Arc<Self>, passes: &mut JoinSet<()>, trigger: Trigger) {
        let manager = Arc::clone(manager);
        let span =
            tracing::debug_span!("trigger", cronjob = %trigger.id, reason = ?trigger.reason);
        passes.spawn(
            async move {
                manager.reconcile(trigger).await;
            }
            .instrument(span),
        );
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
