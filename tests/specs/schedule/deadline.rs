//! Starting deadlines: a fire time noticed too late is recorded, not run.

use crate::prelude::*;
use cj_core::{ConditionCode, CronJobSpec, RunId};
use cj_engine::{Action, Requeue};
use similar_asserts::assert_eq;

fn with_deadline(seconds: i64) -> CronJobSpec {
    CronJobSpec::builder("*/5 * * * *")
        .starting_deadline_seconds(seconds)
        .build()
}

#[tokio::test]
async fn late_fire_time_records_condition_and_waits_for_next() {
    let world = World::new();
    let id = world.create("digest", with_deadline(60));

    world.set_time(utc(2024, 1, 1, 0, 7, 0));
    let outcome = world.reconcile(&id).await;
    assert_eq!(
        outcome.action,
        Action::MissedDeadline {
            fire_time: utc(2024, 1, 1, 0, 5, 0)
        }
    );
    assert_eq!(outcome.requeue, Requeue::At(utc(2024, 1, 1, 0, 10, 0)));
    assert!(world.substrate.create_calls().is_empty());

    let status = world.status(&id);
    let condition = status
        .condition(ConditionCode::MissedSchedule)
        .expect("missed condition");
    assert_eq!(condition.observed_at, utc(2024, 1, 1, 0, 7, 0));
    assert_eq!(status.last_schedule_time, None);
}

#[tokio::test]
async fn next_fire_time_within_deadline_runs_and_clears_condition() {
    let world = World::new();
    let id = world.create("digest", with_deadline(60));

    world.set_time(utc(2024, 1, 1, 0, 7, 0));
    world.reconcile(&id).await;

    world.set_time(utc(2024, 1, 1, 0, 10, 30));
    let outcome = world.reconcile(&id).await;
    let run = RunId::scheduled(&id, utc(2024, 1, 1, 0, 10, 0));
    assert_eq!(outcome.action, Action::Created { run });

    let status = world.status(&id);
    assert!(status.conditions.is_empty());
    assert_eq!(status.last_schedule_time, Some(utc(2024, 1, 1, 0, 10, 0)));
}

#[tokio::test]
async fn fire_time_exactly_at_deadline_still_runs() {
    let world = World::new();
    let id = world.create("digest", with_deadline(60));

    world.set_time(utc(2024, 1, 1, 0, 6, 0));
    let outcome = world.reconcile(&id).await;
    let run = RunId::scheduled(&id, utc(2024, 1, 1, 0, 5, 0));
    assert_eq!(outcome.action, Action::Created { run });
}

#[tokio::test]
async fn repeated_miss_keeps_first_observation() {
    let world = World::new();
    let id = world.create("digest", with_deadline(0));

    world.set_time(utc(2024, 1, 1, 0, 5, 30));
    world.reconcile(&id).await;
    let first = world.status(&id);

    world.set_time(utc(2024, 1, 1, 0, 6, 0));
    world.reconcile(&id).await;
    assert_eq!(world.status(&id), first);
}
