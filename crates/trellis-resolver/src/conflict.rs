//! Cousin conflict resolution.
//!
//! Repeatedly walks a tree until every node is `Accepted` or `Rejected`:
//!
//! 1. Track every live item under its name.
//! 2. Mark everything below a disputed name as ambiguous.
//! 3. Decide unambiguous nodes: the highest tracked version is accepted,
//!    others are rejected.
//!
//! With `a1->b1->d1->x1` and `a1->c1->d2->z1` the first pass rejects `d1`
//! while `x1` and `z1` stay ambiguous; the second pass no longer sees `x1`
//! and accepts `z1`.

use crate::config::ResolverConfig;
use crate::graph::{DependencyGraph, Disposition};
use crate::tracker::Tracker;
use crate::types::ResolveError;
use ahash::AHashSet;
use tracing::{debug, trace};

/// Per-branch state of the ambiguity walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Walking,
    Ambiguous,
    Rejected,
}

/// Outcome of [`try_resolve_conflicts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictOutcome {
    /// Some node is still `Acceptable`.
    pub incomplete: bool,
    /// Passes run.
    pub passes: usize,
}

/// Run conflict resolution for at most `max_passes` passes.
pub fn try_resolve_conflicts<T>(
    graph: &mut DependencyGraph<T>,
    max_passes: usize,
) -> ConflictOutcome {
    let mut passes = 0;
    let mut incomplete = true;

    while incomplete && passes < max_passes {
        passes += 1;
        let mut tracker = Tracker::new();

        graph.for_each_with_state(true, |node, live| {
            if !live || node.disposition == Disposition::Rejected {
                node.disposition = Disposition::Rejected;
                return false;
            }
            if let Some(item) = &node.item {
                tracker.track(&item.key);
            }
            true
        });

        graph.for_each_with_state(Branch::Walking, |node, branch| {
            if node.disposition == Disposition::Rejected {
                return Branch::Rejected;
            }
            let Some(item) = &node.item else {
                return branch;
            };
            if branch == Branch::Walking && tracker.is_disputed(&item.key) {
                return Branch::Ambiguous;
            }
            if branch == Branch::Ambiguous {
                tracker.mark_ambiguous(&item.key);
            }
            branch
        });

        graph.for_each_with_state(true, |node, live| {
            if !live || node.disposition == Disposition::Rejected {
                return false;
            }
            let Some(item) = &node.item else {
                return false;
            };
            if tracker.is_ambiguous(&item.key) {
                return false;
            }
            if node.disposition == Disposition::Acceptable {
                node.disposition = if tracker.is_best_version(&item.key) {
                    Disposition::Accepted
                } else {
                    Disposition::Rejected
                };
                trace!(item = %item.key, disposition = %node.disposition, "decided");
            }
            node.disposition == Disposition::Accepted
        });

        incomplete = graph.count(Disposition::Acceptable) > 0;
        debug!(
            pass = passes,
            accepted = graph.count(Disposition::Accepted),
            rejected = graph.count(Disposition::Rejected),
            open = graph.count(Disposition::Acceptable),
            "conflict pass"
        );
    }

    ConflictOutcome { incomplete, passes }
}

/// Resolve conflicts, failing if the pass limit is reached first.
///
/// # Errors
/// Returns [`ResolveError::ConflictsUnresolved`] naming the libraries still
/// undecided.
pub fn resolve_conflicts<T>(
    graph: &mut DependencyGraph<T>,
    config: &ResolverConfig,
) -> Result<usize, ResolveError> {
    let outcome = try_resolve_conflicts(graph, config.max_conflict_passes);
    if !outcome.incomplete {
        return Ok(outcome.passes);
    }

    let mut seen = AHashSet::new();
    let mut unresolved = Vec::new();
    graph.for_each(|_, node| {
        if node.disposition == Disposition::Acceptable && seen.insert(node.name().clone()) {
            unresolved.push(node.name().to_string());
        }
    });
    Err(ResolveError::ConflictsUnresolved {
        passes: outcome.passes,
        unresolved,
    })
}
