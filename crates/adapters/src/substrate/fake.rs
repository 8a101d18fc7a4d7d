// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake execution substrate for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{RunRequest, SubstrateAdapter, SubstrateError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cj_core::{CronJobId, Run, RunId, RunOutcome};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Recorded substrate call
#[derive(Debug, Clone, PartialEq)]
pub enum SubstrateCall {
    CreateRun { owner: CronJobId, id: RunId },
    DeleteRun { id: RunId },
    ListRuns { owner: CronJobId },
    RunOutcome { id: RunId },
}

#[derive(Default)]
struct FakeSubstrateState {
    runs: BTreeMap<RunId, Run>,
    calls: Vec<SubstrateCall>,
    fail_create: Option<SubstrateError>,
    fail_delete: Option<SubstrateError>,
    fail_list: Option<SubstrateError>,
}

/// In-memory substrate that records every call
#[derive(Clone, Default)]
pub struct FakeSubstrate {
    inner: Arc<Mutex<FakeSubstrateState>>,
}

impl FakeSubstrate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<SubstrateCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Ids passed to `create_run`, in call order (including rejected ones)
    pub fn create_calls(&self) -> Vec<RunId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SubstrateCall::CreateRun { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Ids passed to `delete_run`, in call order
    pub fn delete_calls(&self) -> Vec<RunId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SubstrateCall::DeleteRun { id } => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Add a pre-existing run
    pub fn insert_run(&self, run: Run) {
        self.inner.lock().runs.insert(run.id.clone(), run);
    }

    pub fn get_run(&self, id: &RunId) -> Option<Run> {
        self.inner.lock().runs.get(id).cloned()
    }

    /// All runs currently held, across owners
    pub fn runs(&self) -> Vec<Run> {
        self.inner.lock().runs.values().cloned().collect()
    }

    /// Runs of `owner` that are still running
    pub fn running(&self, owner: &CronJobId) -> Vec<RunId> {
        self.inner
            .lock()
            .runs
            .values()
            .filter(|r| &r.owner == owner && !r.is_finished())
            .map(|r| r.id.clone())
            .collect()
    }

    /// Mark a run finished with the given outcome
    pub fn finish(&self, id: &RunId, outcome: RunOutcome, at: DateTime<Utc>) {
        if let Some(run) = self.inner.lock().runs.get_mut(id) {
            run.outcome = outcome;
            run.finished_at = outcome.is_finished().then_some(at);
        }
    }

    /// Remove a run without recording a call (external garbage collection)
    pub fn remove_run(&self, id: &RunId) {
        self.inner.lock().runs.remove(id);
    }

    /// Fail the next `create_run` call with `err`
    pub fn fail_next_create(&self, err: SubstrateError) {
        self.inner.lock().fail_create = Some(err);
    }

    /// Fail the next `delete_run` call with `err`
    pub fn fail_next_delete(&self, err: SubstrateError) {
        self.inner.lock().fail_delete = Some(err);
    }

    /// Fail the next `list_runs` call with `err`
    pub fn fail_next_list(&self, err: SubstrateError) {
        self.inner.lock().fail_list = Some(err);
    }
}

#[async_trait]
impl SubstrateAdapter for FakeSubstrate {
    async fn create_run(&self, request: RunRequest) -> Result<Run, SubstrateError> {
        let mut inner = self.inner.lock();

        inner.calls.push(SubstrateCall::CreateRun {
            owner: request.owner.clone(),
            id: request.id.clone(),
        });

        if let Some(err) = inner.fail_create.take() {
            return Err(err);
        }
        if inner.runs.contains_key(&request.id) {
            return Err(SubstrateError::AlreadyExists(request.id));
        }

        let run = Run::running(request.id, request.owner, request.scheduled_for);
        inner.runs.insert(run.id.clone(), run.clone());
        Ok(run)
    }

    async fn delete_run(&self, id: &RunId) -> Result<(), SubstrateError> {
        let mut inner = self.inner.lock();

        inner.calls.push(SubstrateCall::DeleteRun { id: id.clone() });

        if let Some(err) = inner.fail_delete.take() {
            return Err(err);
        }
        match inner.runs.remove(id) {
            Some(_) => Ok(()),
            None => Err(SubstrateError::NotFound(id.clone())),
        }
    }

    async fn list_runs(&self, owner: &CronJobId) -> Result<Vec<Run>, SubstrateError> {
        let mut inner = self.inner.lock();

        inner.calls.push(SubstrateCall::ListRuns {
            owner: owner.clone(),
        });

        if let Some(err) = inner.fail_list.take() {
            return Err(err);
        }
        Ok(inner
            .runs
            .values()
            .filter(|r| &r.owner == owner)
            .cloned()
            .collect())
    }

    async fn run_outcome(&self, id: &RunId) -> Result<RunOutcome, SubstrateError> {
        let mut inner = self.inner.lock();

        inner.calls.push(SubstrateCall::RunOutcome { id: id.clone() });

        inner
            .runs
            .get(id)
            .map(|r| r.outcome)
            .ok_or_else(|| SubstrateError::NotFound(id.clone()))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
