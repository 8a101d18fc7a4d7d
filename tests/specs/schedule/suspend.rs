//! Suspend freezes creation and leaves active runs alone under every policy.

use crate::prelude::*;
use chrono::Duration;
use cj_core::{ConcurrencyPolicy, CronJobSpec, RunId};
use cj_engine::{Action, Requeue};
use similar_asserts::assert_eq;

const POLICIES: [ConcurrencyPolicy; 3] = [
    ConcurrencyPolicy::Allow,
    ConcurrencyPolicy::Forbid,
    ConcurrencyPolicy::Replace,
];

fn spec(policy: ConcurrencyPolicy, suspend: bool) -> CronJobSpec {
    CronJobSpec::builder("*/5 * * * *")
        .concurrency_policy(policy)
        .suspend(suspend)
        .build()
}

#[tokio::test]
async fn suspended_job_never_creates_or_deletes() {
    for policy in POLICIES {
        let world = World::new();
        let id = world.create("nightly", spec(policy, false));

        world.set_time(utc(2024, 1, 1, 0, 5, 0));
        world.reconcile(&id).await;
        let active = RunId::scheduled(&id, utc(2024, 1, 1, 0, 5, 0));

        world.update(&id, spec(policy, true));
        world.substrate.clear_calls();
        for _ in 0..6 {
            world.advance(Duration::minutes(5));
            let outcome = world.reconcile(&id).await;
            assert_eq!(outcome.action, Action::Suspended, "{policy}");
            assert!(matches!(outcome.requeue, Requeue::At(_)), "{policy}");
        }

        assert!(world.substrate.create_calls().is_empty(), "{policy}");
        assert!(world.substrate.delete_calls().is_empty(), "{policy}");
        assert_eq!(world.running(&id), vec![active], "{policy}");
    }
}

#[tokio::test]
async fn unsuspending_applies_the_policy_to_the_latest_fire_time() {
    for policy in POLICIES {
        let world = World::new();
        let id = world.create("nightly", spec(policy, false));

        world.set_time(utc(2024, 1, 1, 0, 5, 0));
        world.reconcile(&id).await;
        let active = RunId::scheduled(&id, utc(2024, 1, 1, 0, 5, 0));

        world.update(&id, spec(policy, true));
        world.set_time(utc(2024, 1, 1, 0, 32, 0));
        world.reconcile(&id).await;

        world.update(&id, spec(policy, false));
        let outcome = world.reconcile(&id).await;
        let latest = RunId::scheduled(&id, utc(2024, 1, 1, 0, 30, 0));
        let expected = match policy {
            ConcurrencyPolicy::Allow => Action::Created { run: latest },
            ConcurrencyPolicy::Forbid => Action::Skipped {
                fire_time: utc(2024, 1, 1, 0, 30, 0),
            },
            ConcurrencyPolicy::Replace => Action::Replaced {
                run: latest,
                replaced: vec![active],
            },
        };
        assert_eq!(outcome.action, expected, "{policy}");
    }
}

#[tokio::test]
async fn suspended_job_still_prunes_history() {
    let world = World::new();
    let suspended = CronJobSpec::builder("*/5 * * * *")
        .suspend(true)
        .successful_history_limit(0)
        .build();
    let id = world.create("nightly", suspended);

    world.substrate.insert_run(cj_core::test_support::finished_run(
        id.as_str(),
        utc(2023, 12, 31, 23, 55, 0),
        cj_core::RunOutcome::Succeeded,
        utc(2023, 12, 31, 23, 56, 0),
    ));

    let outcome = world.reconcile(&id).await;
    assert_eq!(outcome.action, Action::Suspended);
    assert_eq!(outcome.pruned.len(), 1);
    assert!(world.runs(&id).is_empty());
}
