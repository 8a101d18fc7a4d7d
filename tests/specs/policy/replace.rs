//! Replace: active runs are terminated before the new one starts, and an
//! interrupted replacement converges without duplicates.

use crate::prelude::*;
use cj_adapters::{SubstrateCall, SubstrateError};
use cj_core::{ConcurrencyPolicy, CronJobSpec, RunId, RunOutcome};
use cj_engine::{Action, Requeue};
use similar_asserts::assert_eq;
use std::time::Duration as StdDuration;

fn replace_every_five() -> CronJobSpec {
    CronJobSpec::builder("*/5 * * * *")
        .concurrency_policy(ConcurrencyPolicy::Replace)
        .build()
}

#[tokio::test]
async fn terminates_then_creates() {
    let world = World::new();
    let id = world.create("report", replace_every_five());

    world.set_time(utc(2024, 1, 1, 0, 5, 0));
    world.reconcile(&id).await;
    let r1 = RunId::scheduled(&id, utc(2024, 1, 1, 0, 5, 0));
    world.substrate.clear_calls();

    world.set_time(utc(2024, 1, 1, 0, 10, 0));
    let outcome = world.reconcile(&id).await;
    let r2 = RunId::scheduled(&id, utc(2024, 1, 1, 0, 10, 0));
    assert_eq!(
        outcome.action,
        Action::Replaced {
            run: r2.clone(),
            replaced: vec![r1.clone()],
        }
    );

    let mutations: Vec<_> = world
        .substrate
        .calls()
        .into_iter()
        .filter(|c| {
            matches!(
                c,
                SubstrateCall::DeleteRun { .. } | SubstrateCall::CreateRun { .. }
            )
        })
        .collect();
    assert_eq!(
        mutations,
        vec![
            SubstrateCall::DeleteRun { id: r1 },
            SubstrateCall::CreateRun {
                owner: id.clone(),
                id: r2.clone(),
            },
        ]
    );
    assert_eq!(world.running(&id), vec![r2]);
}

#[tokio::test]
async fn retry_after_failed_create_neither_redeletes_nor_duplicates() {
    let world = World::new();
    let id = world.create("report", replace_every_five());

    world.set_time(utc(2024, 1, 1, 0, 5, 0));
    world.reconcile(&id).await;
    let r1 = RunId::scheduled(&id, utc(2024, 1, 1, 0, 5, 0));
    let status_before = world.status(&id);

    // The old run is gone but the new one never got created
    world.set_time(utc(2024, 1, 1, 0, 10, 0));
    world
        .substrate
        .fail_next_create(SubstrateError::Transient("throttled".to_string()));
    let failed = world.reconcile(&id).await;
    assert!(matches!(failed.action, Action::Failed { .. }));
    assert_eq!(failed.requeue, Requeue::After(StdDuration::from_secs(1)));
    assert_eq!(world.substrate.delete_calls(), vec![r1]);
    assert_eq!(world.status(&id), status_before);

    world.substrate.clear_calls();
    world.set_time(utc(2024, 1, 1, 0, 10, 1));
    let retried = world.reconcile(&id).await;
    let r2 = RunId::scheduled(&id, utc(2024, 1, 1, 0, 10, 0));
    assert_eq!(retried.action, Action::Created { run: r2.clone() });
    assert!(world.substrate.delete_calls().is_empty());
    assert_eq!(world.substrate.create_calls(), vec![r2.clone()]);

    // Settled: another pass changes nothing
    world.substrate.clear_calls();
    let settled = world.reconcile(&id).await;
    assert_eq!(settled.action, Action::Waiting);
    assert!(world.substrate.create_calls().is_empty());
    assert_eq!(world.running(&id), vec![r2]);
    assert_eq!(world.controller.failure_count(&id), 0);
}

#[tokio::test]
async fn lost_status_write_after_create_does_not_duplicate() {
    let world = World::new();
    let id = world.create("report", replace_every_five());

    world.set_time(utc(2024, 1, 1, 0, 5, 0));
    world.store.inject_conflicts(&id, 3);
    let failed = world.reconcile(&id).await;
    assert!(matches!(failed.action, Action::Failed { .. }));

    let r1 = RunId::scheduled(&id, utc(2024, 1, 1, 0, 5, 0));
    assert_eq!(world.running(&id), vec![r1.clone()]);
    assert_eq!(world.status(&id).last_schedule_time, None);

    world.set_time(utc(2024, 1, 1, 0, 5, 1));
    let retried = world.reconcile(&id).await;
    assert_eq!(retried.action, Action::Waiting);
    assert_eq!(world.substrate.create_calls(), vec![r1.clone()]);

    let status = world.status(&id);
    assert_eq!(status.last_schedule_time, Some(utc(2024, 1, 1, 0, 5, 0)));
    assert!(status.active_runs.contains(&r1));
}

#[tokio::test]
async fn finished_run_is_not_terminated() {
    let world = World::new();
    let id = world.create("report", replace_every_five());

    world.set_time(utc(2024, 1, 1, 0, 5, 0));
    world.reconcile(&id).await;
    let r1 = RunId::scheduled(&id, utc(2024, 1, 1, 0, 5, 0));

    world.set_time(utc(2024, 1, 1, 0, 9, 0));
    world.finish(&r1, RunOutcome::Failed);

    world.set_time(utc(2024, 1, 1, 0, 10, 0));
    let outcome = world.reconcile(&id).await;
    let r2 = RunId::scheduled(&id, utc(2024, 1, 1, 0, 10, 0));
    assert_eq!(outcome.action, Action::Created { run: r2 });
    assert!(world.substrate.delete_calls().is_empty());
    assert!(world.substrate.get_run(&r1).is_some());
}
