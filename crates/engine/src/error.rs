// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for reconciliation passes

use cj_adapters::SubstrateError;
use cj_core::CronJobId;
use cj_storage::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Failures that abort a pass. All of them are retried with backoff; none
/// escape [`Controller::reconcile`](crate::Controller::reconcile).
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    #[error("substrate error: {0}")]
    Substrate(#[from] SubstrateError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("status write for {id} lost {attempts} races in a row")]
    StatusConflict { id: CronJobId, attempts: u32 },
    #[error("pass timed out after {0:?}")]
    Timeout(Duration),
}
