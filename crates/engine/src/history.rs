// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retention of finished runs

use cj_core::{Run, RunId, RunOutcome};
use std::collections::BTreeSet;

/// Finished runs that fall outside the retention limits.
///
/// Each outcome class keeps its `limit` most recently completed runs. `None`
/// exempts the class. Runs still going are never selected.
pub fn prune(
    runs: &[Run],
    successful_limit: Option<usize>,
    failed_limit: Option<usize>,
) -> BTreeSet<RunId> {
    let mut doomed = BTreeSet::new();
    doomed.extend(excess(runs, RunOutcome::Succeeded, successful_limit));
    doomed.extend(excess(runs, RunOutcome::Failed, failed_limit));
    doomed
}

fn excess(runs: &[Run], outcome: RunOutcome, limit: Option<usize>) -> Vec<RunId> {
    let Some(limit) = limit else {
        return Vec::new();
    };
    let mut class: Vec<&Run> = runs.iter().filter(|r| r.outcome == outcome).collect();
    // Newest first; ties broken by id so the cut is stable
    class.sort_by(|a, b| {
        b.completed_at()
            .cmp(&a.completed_at())
            .then_with(|| b.id.cmp(&a.id))
    });
    class.into_iter().skip(limit).map(|r| r.id.clone()).collect()
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
