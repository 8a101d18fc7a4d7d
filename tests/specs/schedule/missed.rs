//! Downtime: only the most recent missed fire time is materialized.

use crate::prelude::*;
use chrono::Duration;
use cj_core::{ConditionCode, CronJobSpec, RunId};
use cj_engine::{Action, ControllerConfig, Requeue};
use similar_asserts::assert_eq;

#[tokio::test]
async fn several_missed_fire_times_yield_one_run() {
    let world = World::new();
    let id = world.create("rollup", CronJobSpec::builder("*/5 * * * *").build());

    world.set_time(utc(2024, 1, 1, 0, 23, 0));
    let outcome = world.reconcile(&id).await;
    let run = RunId::scheduled(&id, utc(2024, 1, 1, 0, 20, 0));
    assert_eq!(outcome.action, Action::Created { run: run.clone() });
    assert_eq!(outcome.requeue, Requeue::At(utc(2024, 1, 1, 0, 25, 0)));
    assert_eq!(world.substrate.create_calls(), vec![run]);
    assert!(world.status(&id).conditions.is_empty());
}

#[tokio::test]
async fn long_outage_flags_too_many_missed_and_still_runs_latest() {
    let world = World::new();
    let id = world.create("rollup", CronJobSpec::builder("* * * * *").build());

    world.set_time(utc(2024, 1, 1, 3, 0, 30));
    let outcome = world.reconcile(&id).await;
    let run = RunId::scheduled(&id, utc(2024, 1, 1, 3, 0, 0));
    assert_eq!(outcome.action, Action::Created { run });

    let status = world.status(&id);
    assert!(status.has_condition(ConditionCode::TooManyMissedRuns));
    assert_eq!(status.last_schedule_time, Some(utc(2024, 1, 1, 3, 0, 0)));

    // Caught up: the condition goes away on the next pass
    world.advance(Duration::seconds(45));
    world.reconcile(&id).await;
    assert!(!world.status(&id).has_condition(ConditionCode::TooManyMissedRuns));
}

#[tokio::test]
async fn outage_past_the_cap_creates_one_run_for_the_true_latest() {
    let config = ControllerConfig {
        max_missed_runs: 3,
        ..ControllerConfig::default()
    };
    let world = World::with_config(config);
    // Every minute, but only during hour 0
    let id = world.create("rollup", CronJobSpec::builder("* 0 * * *").build());

    world.set_time(utc(2024, 1, 5, 12, 0, 0));
    let outcome = world.reconcile(&id).await;
    let run = RunId::scheduled(&id, utc(2024, 1, 5, 0, 59, 0));
    assert_eq!(outcome.action, Action::Created { run: run.clone() });
    assert_eq!(outcome.requeue, Requeue::At(utc(2024, 1, 6, 0, 0, 0)));

    // Same clock: nothing further is due
    let again = world.reconcile(&id).await;
    assert_eq!(again.action, Action::Waiting);
    assert_eq!(world.substrate.create_calls(), vec![run]);
    assert_eq!(
        world.status(&id).last_schedule_time,
        Some(utc(2024, 1, 5, 0, 59, 0))
    );
}

#[tokio::test]
async fn cap_is_configurable() {
    let config = ControllerConfig {
        max_missed_runs: 3,
        ..ControllerConfig::default()
    };
    let world = World::with_config(config);
    let id = world.create("rollup", CronJobSpec::builder("@every 10m").build());

    world.set_time(utc(2024, 1, 1, 0, 45, 0));
    let outcome = world.reconcile(&id).await;
    let run = RunId::scheduled(&id, utc(2024, 1, 1, 0, 40, 0));
    assert_eq!(outcome.action, Action::Created { run });
    assert_eq!(outcome.requeue, Requeue::At(utc(2024, 1, 1, 0, 50, 0)));
    assert!(world
        .status(&id)
        .has_condition(ConditionCode::TooManyMissedRuns));
}

#[tokio::test]
async fn invalid_schedule_waits_for_a_fix() {
    let world = World::new();
    let id = world.create("rollup", CronJobSpec::builder("every tuesday").build());

    world.set_time(utc(2024, 1, 1, 1, 0, 0));
    let outcome = world.reconcile(&id).await;
    assert!(matches!(outcome.action, Action::InvalidSchedule { .. }));
    assert_eq!(outcome.requeue, Requeue::Never);
    assert!(world.status(&id).has_condition(ConditionCode::InvalidSchedule));
    assert!(world.substrate.create_calls().is_empty());

    world.update(&id, CronJobSpec::builder("@hourly").build());
    let fixed = world.reconcile(&id).await;
    let run = RunId::scheduled(&id, utc(2024, 1, 1, 1, 0, 0));
    assert_eq!(fixed.action, Action::Created { run });
    assert!(world.status(&id).conditions.is_empty());
}
