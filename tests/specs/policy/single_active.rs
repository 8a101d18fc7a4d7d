//! Under Forbid and Replace no pass ever leaves two runs active.

use crate::prelude::*;
use chrono::Duration;
use cj_core::{ConcurrencyPolicy, CronJobSpec, RunId, RunOutcome};
use cj_engine::Action;
use std::collections::BTreeMap;

/// Drive a two-minute schedule for four hours. Runs last between one and
/// twelve minutes, so most fire times overlap an active run.
async fn simulate(policy: ConcurrencyPolicy) -> Vec<Action> {
    let world = World::new();
    let spec = CronJobSpec::builder("*/2 * * * *")
        .concurrency_policy(policy)
        .build();
    let id = world.create("sweeper", spec);

    let mut finishes_at: BTreeMap<RunId, i64> = BTreeMap::new();
    let mut actions = Vec::new();
    for minute in 0..240_i64 {
        world.set_time(utc(2024, 1, 1, 0, 0, 0) + Duration::minutes(minute));

        for run in world.running(&id) {
            if finishes_at.get(&run).is_some_and(|end| *end <= minute) {
                world.finish(&run, RunOutcome::Succeeded);
            }
        }

        let outcome = world.reconcile(&id).await;
        match &outcome.action {
            Action::Created { run } | Action::Replaced { run, .. } => {
                let length = 1 + (minute * 7) % 12;
                finishes_at.insert(run.clone(), minute + length);
            }
            _ => {}
        }
        actions.push(outcome.action);

        let running = world.running(&id);
        assert!(
            running.len() <= 1,
            "{policy} left {} runs active at minute {minute}: {running:?}",
            running.len()
        );
    }
    actions
}

#[tokio::test]
async fn forbid_never_overlaps() {
    let actions = simulate(ConcurrencyPolicy::Forbid).await;
    assert!(actions.iter().any(|a| matches!(a, Action::Skipped { .. })));
    assert!(actions.iter().any(|a| matches!(a, Action::Created { .. })));
}

#[tokio::test]
async fn replace_never_overlaps() {
    let actions = simulate(ConcurrencyPolicy::Replace).await;
    assert!(actions.iter().any(|a| matches!(a, Action::Replaced { .. })));
    assert!(!actions.iter().any(|a| matches!(a, Action::Skipped { .. })));
}

#[tokio::test]
async fn allow_overlaps_freely() {
    let world = World::new();
    let id = world.create("sweeper", CronJobSpec::builder("*/2 * * * *").build());
    for minute in [2, 4, 6] {
        world.set_time(utc(2024, 1, 1, 0, minute, 0));
        world.reconcile(&id).await;
    }
    assert_eq!(world.running(&id).len(), 3);
}
