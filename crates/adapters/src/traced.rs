// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrapper for consistent observability

use crate::substrate::{RunRequest, SubstrateAdapter, SubstrateError};
use async_trait::async_trait;
use cj_core::{CronJobId, Run, RunId, RunOutcome};
use tracing::Instrument;

/// Wrapper that adds tracing to any SubstrateAdapter
#[derive(Clone)]
pub struct TracedSubstrate<S> {
    inner: S,
}

impl<S> TracedSubstrate<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: SubstrateAdapter> SubstrateAdapter for TracedSubstrate<S> {
    async fn create_run(&self, request: RunRequest) -> Result<Run, SubstrateError> {
        let span = tracing::info_span!(
            "substrate.create",
            owner = %request.owner,
            run = %request.id,
            scheduled_for = %request.scheduled_for,
        );
        async {
            let start = std::time::Instant::now();
            let result = self.inner.create_run(request).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::info!(elapsed_ms, "run created"),
                Err(SubstrateError::AlreadyExists(_)) => {
                    tracing::info!(elapsed_ms, "run already exists")
                }
                Err(e) => tracing::error!(elapsed_ms, error = %e, "create failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn delete_run(&self, id: &RunId) -> Result<(), SubstrateError> {
        let start = std::time::Instant::now();
        let result = self.inner.delete_run(id).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info_span!("substrate.delete", run = %id).in_scope(|| match &result {
            Ok(()) => tracing::info!(elapsed_ms, "deleted"),
            Err(SubstrateError::NotFound(_)) => tracing::debug!(elapsed_ms, "already gone"),
            Err(e) => tracing::warn!(elapsed_ms, error = %e, "delete failed"),
        });
        result
    }

    async fn list_runs(&self, owner: &CronJobId) -> Result<Vec<Run>, SubstrateError> {
        let result = self.inner.list_runs(owner).await;
        match &result {
            Ok(runs) => tracing::debug!(%owner, count = runs.len(), "listed runs"),
            Err(e) => tracing::warn!(%owner, error = %e, "list failed"),
        }
        result
    }

    async fn run_outcome(&self, id: &RunId) -> Result<RunOutcome, SubstrateError> {
        let result = self.inner.run_outcome(id).await;
        tracing::trace!(run = %id, outcome = ?result.as_ref().ok(), "checked");
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
