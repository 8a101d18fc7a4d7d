// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation controller.
//!
//! One pass re-derives everything from the stored resource and the runs the
//! substrate reports: nothing about a previous pass is remembered except the
//! retry backoff. Every substrate mutation is keyed by a scheduling identity
//! so a pass may be repeated or abandoned at any point.

use crate::config::ControllerConfig;
use crate::error::ReconcileError;
use crate::history;
use crate::policy::{self, Decision};
use crate::schedule::{self, Schedule};
use crate::status;
use chrono::{DateTime, Utc};
use cj_adapters::{RunRequest, SubstrateAdapter, SubstrateError};
use cj_core::{
    Clock, Condition, ConditionCode, CronJob, CronJobId, CronJobStatus, RunId, RunOutcome,
};
use cj_storage::{ResourceStore, StoreError};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

/// What a pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The resource no longer exists
    Deleted,
    Suspended,
    /// Spec rejected; waits for the user to change it
    InvalidSchedule { reason: String },
    /// Nothing due
    Waiting,
    /// The most recent fire time is past its starting deadline
    MissedDeadline { fire_time: DateTime<Utc> },
    /// A run is due but the concurrency policy forbids it
    Skipped { fire_time: DateTime<Utc> },
    Created { run: RunId },
    Replaced { run: RunId, replaced: Vec<RunId> },
    /// The pass aborted; status was left untouched
    Failed { error: String },
}

/// When the resource should be looked at again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requeue {
    At(DateTime<Utc>),
    After(Duration),
    /// Only a change to the resource brings it back
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub action: Action,
    pub requeue: Requeue,
    /// Finished runs deleted for exceeding history limits
    pub pruned: BTreeSet<RunId>,
}

impl ReconcileOutcome {
    fn new(action: Action, requeue: Requeue) -> Self {
        Self {
            action,
            requeue,
            pruned: BTreeSet::new(),
        }
    }
}

/// Drives one CronJob at a time toward its schedule
pub struct Controller<S, St, C: Clock> {
    substrate: S,
    store: St,
    clock: C,
    config: ControllerConfig,
    /// Consecutive failed passes per resource
    failures: Mutex<HashMap<CronJobId, u32>>,
}

impl<S, St, C> Controller<S, St, C>
where
    S: SubstrateAdapter,
    St: ResourceStore,
    C: Clock,
{
    pub fn new(substrate: S, store: St, clock: C, config: ControllerConfig) -> Self {
        Self {
            substrate,
            store,
            clock,
            config,
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    /// Run one reconciliation pass. Never fails: errors become a backoff requeue.
    pub async fn reconcile(&self, id: &CronJobId) -> ReconcileOutcome {
        let span = tracing::info_span!("reconcile", cronjob = %id);
        async {
            let start = std::time::Instant::now();
            let outcome = match self.pass(id).await {
                Ok(outcome) => {
                    self.failures.lock().remove(id);
                    outcome
                }
                Err(e) => self.failed(id, e),
            };
            debug!(
                action = ?outcome.action,
                requeue = ?outcome.requeue,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "pass complete"
            );
            outcome
        }
        .instrument(span)
        .await
    }

    /// Record a failed pass and compute its retry delay.
    pub fn failed(&self, id: &CronJobId, error: ReconcileError) -> ReconcileOutcome {
        let failures = {
            let mut failures = self.failures.lock();
            let count = failures.entry(id.clone()).or_insert(0);
            *count = count.saturating_add(1);
            *count
        };
        let delay = self.config.backoff(failures);
        warn!(
            cronjob = %id,
            error = %error,
            failures,
            retry_in_ms = delay.as_millis() as u64,
            "pass failed"
        );
        ReconcileOutcome::new(
            Action::Failed {
                error: error.to_string(),
            },
            Requeue::After(delay),
        )
    }

    /// Consecutive failed passes for `id`
    pub fn failure_count(&self, id: &CronJobId) -> u32 {
        self.failures.lock().get(id).copied().unwrap_or(0)
    }

    /// Drop retry state for a resource that is gone.
    pub fn forget(&self, id: &CronJobId) {
        self.failures.lock().remove(id);
    }

    async fn pass(&self, id: &CronJobId) -> Result<ReconcileOutcome, ReconcileError> {
        let now = self.clock.now();
        let Some(record) = self.store.get(id)? else {
            debug!("cronjob deleted");
            self.forget(id);
            return Ok(ReconcileOutcome::new(Action::Deleted, Requeue::Never));
        };
        let version = record.version;
        let job = record.value;
        let spec = &job.spec;

        // Repair drift before deciding anything. Runs already materialized
        // push last_schedule_time forward, so their fire times are not due
        // again.
        let runs = self.substrate.list_runs(id).await?;
        let mut next_status = status::aggregate(&job.status, &runs);
        // Conditions describe this pass only
        next_status.conditions.clear();
        let previous = &job.status;

        let pruned = history::prune(&runs, spec.successful_limit(), spec.failed_limit());
        for run in &pruned {
            self.delete_run(run).await?;
        }
        if !pruned.is_empty() {
            info!(count = pruned.len(), "pruned finished runs");
        }

        let schedule = match parse_spec(&job) {
            Ok(schedule) => schedule,
            Err(reason) => {
                warn!(%reason, "invalid schedule");
                set_condition(
                    &mut next_status,
                    previous,
                    ConditionCode::InvalidSchedule,
                    &reason,
                    now,
                );
                self.write_status(id, version, previous, next_status)?;
                return Ok(ReconcileOutcome {
                    action: Action::InvalidSchedule { reason },
                    requeue: Requeue::Never,
                    pruned,
                });
            }
        };

        let last_known = next_status
            .last_schedule_time
            .map_or(job.created_at, |t| t.max(job.created_at));
        let cap = self.config.max_missed_runs;
        let fires = schedule::next_fire_times(&schedule, last_known, now, cap);
        if fires.too_many_missed {
            warn!(cap, since = %last_known, "too many missed fire times");
            let message = format!(
                "more than {cap} fire times missed since {last_known}; only the most recent is considered"
            );
            set_condition(
                &mut next_status,
                previous,
                ConditionCode::TooManyMissedRuns,
                &message,
                now,
            );
        }
        let requeue = self.requeue_at(fires.next, now);

        if spec.is_suspended() {
            debug!("suspended");
            self.write_status(id, version, previous, next_status)?;
            return Ok(ReconcileOutcome {
                action: Action::Suspended,
                requeue,
                pruned,
            });
        }

        let Some(latest) = fires.latest_missed else {
            debug!(next = ?fires.next, "waiting for next fire time");
            self.write_status(id, version, previous, next_status)?;
            return Ok(ReconcileOutcome {
                action: Action::Waiting,
                requeue,
                pruned,
            });
        };

        let Some(fire_time) = fires.actionable(now, spec.starting_deadline()) else {
            let deadline = spec.starting_deadline_seconds.unwrap_or_default();
            warn!(fire_time = %latest, deadline_secs = deadline, "missed starting deadline");
            let message =
                format!("fire time {latest} missed its starting deadline of {deadline}s");
            set_condition(
                &mut next_status,
                previous,
                ConditionCode::MissedSchedule,
                &message,
                now,
            );
            self.write_status(id, version, previous, next_status)?;
            return Ok(ReconcileOutcome {
                action: Action::MissedDeadline { fire_time: latest },
                requeue,
                pruned,
            });
        };

        let run = RunId::scheduled(id, fire_time);
        let action = match policy::resolve(spec.concurrency_policy, &next_status.active_runs, &run)
        {
            Decision::Skip => {
                info!(run = %run, fire_time = %fire_time, "skipped: a run is still active");
                Action::Skipped { fire_time }
            }
            Decision::CreateNew => {
                self.create_run(&job, &run, fire_time).await?;
                Action::Created { run: run.clone() }
            }
            Decision::ReplaceThenCreate { replace } => {
                let mut replaced = Vec::new();
                for old in replace {
                    if self.terminate(&old).await? {
                        replaced.push(old.clone());
                    }
                    next_status.active_runs.remove(&old);
                }
                self.create_run(&job, &run, fire_time).await?;
                info!(run = %run, replaced = replaced.len(), "replaced active runs");
                Action::Replaced {
                    run: run.clone(),
                    replaced,
                }
            }
        };

        if !matches!(action, Action::Skipped { .. }) {
            next_status.active_runs.insert(run);
            next_status.last_schedule_time = next_status.last_schedule_time.max(Some(fire_time));
        }
        self.write_status(id, version, previous, next_status)?;
        Ok(ReconcileOutcome {
            action,
            requeue,
            pruned,
        })
    }

    fn requeue_at(&self, next: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Requeue {
        let floor = chrono::Duration::from_std(self.config.min_requeue)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(now);
        match next {
            Some(next) => Requeue::At(next.max(floor)),
            None => Requeue::Never,
        }
    }

    async fn create_run(
        &self,
        job: &CronJob,
        run: &RunId,
        fire_time: DateTime<Utc>,
    ) -> Result<(), ReconcileError> {
        let request = RunRequest {
            owner: job.id.clone(),
            id: run.clone(),
            scheduled_for: fire_time,
            template: job.spec.job_template.clone(),
        };
        match self.substrate.create_run(request).await {
            Ok(_) => {
                info!(run = %run, fire_time = %fire_time, "created run");
                Ok(())
            }
            // An earlier attempt got there first
            Err(SubstrateError::AlreadyExists(_)) => {
                debug!(run = %run, "run already exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_run(&self, run: &RunId) -> Result<(), ReconcileError> {
        match self.substrate.delete_run(run).await {
            Ok(()) | Err(SubstrateError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Terminate a run if it is still going. Returns true if it was.
    async fn terminate(&self, run: &RunId) -> Result<bool, ReconcileError> {
        match self.substrate.run_outcome(run).await {
            Ok(RunOutcome::Running) => {
                self.delete_run(run).await?;
                info!(run = %run, "terminated active run");
                Ok(true)
            }
            // Finished on its own; history keeps it
            Ok(_) | Err(SubstrateError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist `status`, re-reading the record when another writer got in first.
    fn write_status(
        &self,
        id: &CronJobId,
        version: u64,
        current: &CronJobStatus,
        status: CronJobStatus,
    ) -> Result<(), ReconcileError> {
        if status == *current {
            return Ok(());
        }
        let attempts = self.config.status_write_attempts;
        let mut version = version;
        for attempt in 1..=attempts {
            match self.store.update_status(id, version, status.clone()) {
                Ok(_) => return Ok(()),
                Err(StoreError::Conflict { actual, .. }) => {
                    debug!(attempt, expected = version, actual, "status write conflict");
                    match self.store.get(id)? {
                        Some(record) => version = record.version,
                        None => return Ok(()),
                    }
                }
                // Deleted mid-pass; its status went with it
                Err(StoreError::NotFound(_)) => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
        Err(ReconcileError::StatusConflict {
            id: id.clone(),
            attempts,
        })
    }
}

fn parse_spec(job: &CronJob) -> Result<Schedule, String> {
    job.spec.validate().map_err(|e| e.to_string())?;
    Schedule::parse(&job.spec.schedule).map_err(|e| e.to_string())
}

/// Record a condition. One that repeats the stored condition keeps its
/// original observation time.
fn set_condition(
    status: &mut CronJobStatus,
    previous: &CronJobStatus,
    code: ConditionCode,
    message: &str,
    now: DateTime<Utc>,
) {
    let observed_at = previous
        .condition(code)
        .filter(|c| c.message == message)
        .map_or(now, |c| c.observed_at);
    status.set_condition(Condition::new(code, message, observed_at));
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
