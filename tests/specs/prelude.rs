//! Test helpers for behavioral specifications.
//!
//! Provides a small world of fake substrate, in-memory store and manual
//! clock wired to a real controller.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use chrono::{DateTime, Duration, Utc};
use cj_adapters::{FakeSubstrate, TracedSubstrate};
use cj_core::{Clock, CronJobId, CronJobSpec, CronJobStatus, FakeClock, Run, RunId, RunOutcome};
use cj_engine::{Controller, ControllerConfig, Manager, ReconcileOutcome};
use cj_storage::{MemoryStore, ResourceStore};
use std::sync::Arc;

pub use cj_core::test_support::utc;

// Spec polling timeouts
pub const SPEC_POLL_INTERVAL_MS: u64 = 5;
pub const SPEC_WAIT_MAX_MS: u64 = 2000;

pub type SpecController = Controller<TracedSubstrate<FakeSubstrate>, MemoryStore, FakeClock>;
pub type SpecManager = Manager<TracedSubstrate<FakeSubstrate>, MemoryStore, FakeClock>;

/// Route controller logs to the test writer. `RUST_LOG` picks the level.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Poll `condition` until it holds or `timeout_ms` passes.
pub async fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    let poll_interval = std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(poll_interval).await;
    }
    false
}

/// Fake substrate, store and clock around one controller
pub struct World {
    pub substrate: FakeSubstrate,
    pub store: MemoryStore,
    pub clock: FakeClock,
    pub controller: SpecController,
}

impl World {
    /// A world whose clock starts at 2024-01-01T00:00:00Z.
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    pub fn with_config(config: ControllerConfig) -> Self {
        Self::from_parts(
            FakeSubstrate::new(),
            MemoryStore::new(),
            FakeClock::new(),
            config,
        )
    }

    /// Rebuild a world around existing fakes, e.g. after a controller restart.
    pub fn from_parts(
        substrate: FakeSubstrate,
        store: MemoryStore,
        clock: FakeClock,
        config: ControllerConfig,
    ) -> Self {
        init_tracing();
        let controller = Controller::new(
            TracedSubstrate::new(substrate.clone()),
            store.clone(),
            clock.clone(),
            config,
        );
        Self {
            substrate,
            store,
            clock,
            controller,
        }
    }

    /// Move the controller into a manager sharing this world's fakes.
    pub fn into_manager(self) -> (Arc<SpecManager>, FakeSubstrate, MemoryStore, FakeClock) {
        let World {
            substrate,
            store,
            clock,
            controller,
        } = self;
        (Arc::new(Manager::new(controller)), substrate, store, clock)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Create a resource stamped with the current time.
    pub fn create(&self, name: &str, spec: CronJobSpec) -> CronJobId {
        let id = CronJobId::new(name);
        self.store.put_spec(&id, spec, self.clock.now()).unwrap();
        id
    }

    /// Replace the spec of an existing resource.
    pub fn update(&self, id: &CronJobId, spec: CronJobSpec) {
        let created_at = self.store.get(id).unwrap().unwrap().value.created_at;
        self.store.put_spec(id, spec, created_at).unwrap();
    }

    pub fn status(&self, id: &CronJobId) -> CronJobStatus {
        self.store.get(id).unwrap().unwrap().value.status
    }

    pub fn set_time(&self, at: DateTime<Utc>) {
        self.clock.set(at);
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub async fn reconcile(&self, id: &CronJobId) -> ReconcileOutcome {
        self.controller.reconcile(id).await
    }

    /// Finish a run at the current time.
    pub fn finish(&self, run: &RunId, outcome: RunOutcome) {
        self.substrate.finish(run, outcome, self.clock.now());
    }

    /// Runs of `owner` still running in the substrate
    pub fn running(&self, owner: &CronJobId) -> Vec<RunId> {
        self.substrate.running(owner)
    }

    /// Every run of `owner` present in the substrate
    pub fn runs(&self, owner: &CronJobId) -> Vec<Run> {
        self.substrate
            .runs()
            .into_iter()
            .filter(|r| &r.owner == owner)
            .collect()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
