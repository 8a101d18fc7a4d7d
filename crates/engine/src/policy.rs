// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrency policy resolution

use cj_core::{ConcurrencyPolicy, RunId};
use std::collections::BTreeSet;

/// What to do about a due run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    CreateNew,
    Skip,
    /// Terminate `replace` first, then create
    ReplaceThenCreate { replace: Vec<RunId> },
}

/// Decide whether `desired` may start given the currently active runs.
///
/// An active run that already carries the desired scheduling identity does
/// not compete with it; creating it again is a no-op for the substrate.
pub fn resolve(policy: ConcurrencyPolicy, active: &BTreeSet<RunId>, desired: &RunId) -> Decision {
    let others: Vec<RunId> = active.iter().filter(|id| *id != desired).cloned().collect();
    if others.is_empty() {
        return Decision::CreateNew;
    }
    match policy {
        ConcurrencyPolicy::Allow => Decision::CreateNew,
        ConcurrencyPolicy::Forbid => Decision::Skip,
        ConcurrencyPolicy::Replace => Decision::ReplaceThenCreate { replace: others },
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
