// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned resource store.
//!
//! Every write bumps a store-wide version counter and stamps the record
//! with it. Status writes carry the version the writer read; a mismatch is
//! a [`StoreError::Conflict`] and the writer must re-read.

use chrono::{DateTime, Utc};
use cj_core::{CronJob, CronJobId, CronJobSpec, CronJobStatus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("cronjob not found: {0}")]
    NotFound(CronJobId),
    #[error("version conflict on {id}: expected {expected}, found {actual}")]
    Conflict {
        id: CronJobId,
        expected: u64,
        actual: u64,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A value stamped with the store version of its last write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

/// Persisted store of CronJob resources
pub trait ResourceStore: Send + Sync + 'static {
    fn get(&self, id: &CronJobId) -> Result<Option<Versioned<CronJob>>, StoreError>;

    /// Ids of all stored resources, in order
    fn list(&self) -> Result<Vec<CronJobId>, StoreError>;

    /// Create or update the user-authored spec. Status is created empty on
    /// create and preserved on update. Returns the new version.
    fn put_spec(
        &self,
        id: &CronJobId,
        spec: CronJobSpec,
        created_at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Replace status if the record is still at `expected_version`.
    fn update_status(
        &self,
        id: &CronJobId,
        expected_version: u64,
        status: CronJobStatus,
    ) -> Result<u64, StoreError>;

    /// Delete a resource together with its status. Returns false if absent.
    fn delete(&self, id: &CronJobId) -> Result<bool, StoreError>;
}

#[derive(Default)]
struct MemoryStoreState {
    records: BTreeMap<CronJobId, Versioned<CronJob>>,
    version: u64,
    #[cfg(any(test, feature = "test-support"))]
    pending_conflicts: BTreeMap<CronJobId, u32>,
    #[cfg(any(test, feature = "test-support"))]
    unavailable: bool,
}

impl MemoryStoreState {
    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    #[cfg(any(test, feature = "test-support"))]
    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("injected outage".to_string()));
        }
        Ok(())
    }

    #[cfg(not(any(test, feature = "test-support")))]
    fn check_available(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// In-memory store, shareable across tasks
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously saved records.
    pub fn from_records(records: Vec<Versioned<CronJob>>) -> Self {
        let version = records.iter().map(|r| r.version).max().unwrap_or(0);
        let records = records
            .into_iter()
            .map(|r| (r.value.id.clone(), r))
            .collect();
        Self {
            inner: Arc::new(Mutex::new(MemoryStoreState {
                records,
                version,
                ..Default::default()
            })),
        }
    }

    /// Copy of every record, in id order
    pub fn records(&self) -> Vec<Versioned<CronJob>> {
        self.inner.lock().records.values().cloned().collect()
    }

    /// Current store-wide version
    pub fn version(&self) -> u64 {
        self.inner.lock().version
    }

    /// Make the next `n` status writes to `id` lose a race with another writer.
    #[cfg(any(test, feature = "test-support"))]
    pub fn inject_conflicts(&self, id: &CronJobId, n: u32) {
        self.inner.lock().pending_conflicts.insert(id.clone(), n);
    }

    /// Fail every operation with `Unavailable` while set.
    #[cfg(any(test, feature = "test-support"))]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unavailable = unavailable;
    }

    #[cfg(any(test, feature = "test-support"))]
    fn take_injected_conflict(state: &mut MemoryStoreState, id: &CronJobId) -> bool {
        match state.pending_conflicts.get_mut(id) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }

    #[cfg(not(any(test, feature = "test-support")))]
    fn take_injected_conflict(_state: &mut MemoryStoreState, _id: &CronJobId) -> bool {
        false
    }
}

impl ResourceStore for MemoryStore {
    fn get(&self, id: &CronJobId) -> Result<Option<Versioned<CronJob>>, StoreError> {
        let state = self.inner.lock();
        state.check_available()?;
        Ok(state.records.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<CronJobId>, StoreError> {
        let state = self.inner.lock();
        state.check_available()?;
        Ok(state.records.keys().cloned().collect())
    }

    fn put_spec(
        &self,
        id: &CronJobId,
        spec: CronJobSpec,
        created_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut state = self.inner.lock();
        state.check_available()?;
        let version = state.bump();
        match state.records.get_mut(id) {
            Some(record) => {
                record.value.spec = spec;
                record.version = version;
            }
            None => {
                state.records.insert(
                    id.clone(),
                    Versioned {
                        version,
                        value: CronJob::new(id.clone(), created_at, spec),
                    },
                );
            }
        }
        Ok(version)
    }

    fn update_status(
        &self,
        id: &CronJobId,
        expected_version: u64,
        status: CronJobStatus,
    ) -> Result<u64, StoreError> {
        let mut state = self.inner.lock();
        state.check_available()?;

        if Self::take_injected_conflict(&mut state, id) {
            // Simulate another writer landing first
            let version = state.bump();
            if let Some(record) = state.records.get_mut(id) {
                record.version = version;
            }
        }

        let actual = match state.records.get(id) {
            Some(record) => record.version,
            None => return Err(StoreError::NotFound(id.clone())),
        };
        if actual != expected_version {
            return Err(StoreError::Conflict {
                id: id.clone(),
                expected: expected_version,
                actual,
            });
        }

        let version = state.bump();
        if let Some(record) = state.records.get_mut(id) {
            record.value.status = status;
            record.version = version;
        }
        Ok(version)
    }

    fn delete(&self, id: &CronJobId) -> Result<bool, StoreError> {
        let mut state = self.inner.lock();
        state.check_available()?;
        let removed = state.records.remove(id).is_some();
        if removed {
            state.bump();
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
