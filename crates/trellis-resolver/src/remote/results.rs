//! Flattening walked graphs into install and missing sets.

use super::context::{RemoteItem, RemoteResolveResult, RemoteWalkContext};
use crate::graph::DependencyGraph;
use crate::library::{LibraryIdentity, LibraryRange};
use ahash::AHashSet;
use std::sync::Arc;

/// What a set of remote walks needs from the outside world.
#[derive(Debug, Default)]
pub struct RemoteResolveResults {
    /// Remote-sourced items, one per identity, in walk order.
    pub install: Vec<RemoteItem>,
    /// Ranges nothing could satisfy.
    pub missing: AHashSet<LibraryRange>,
}

impl RemoteResolveResults {
    /// Collect install and missing sets from `graphs`.
    ///
    /// Platform references and name-only ranges are never reported missing.
    pub fn collect<'a>(
        context: &RemoteWalkContext,
        graphs: impl IntoIterator<Item = &'a DependencyGraph<RemoteResolveResult>>,
    ) -> Self {
        let mut results = Self::default();
        let mut seen: AHashSet<LibraryIdentity> = AHashSet::new();

        for graph in graphs {
            graph.for_each(|_, node| {
                if node.key.is_platform_reference {
                    return;
                }
                match &node.item {
                    None => {
                        if node.key.version_range.is_some() {
                            results.missing.insert(node.key.clone());
                        }
                    }
                    Some(item) => {
                        if context.is_remote(&item.data.matched.provider)
                            && seen.insert(item.key.clone())
                        {
                            results.install.push(Arc::clone(item));
                        }
                    }
                }
            });
        }
        results
    }

    /// Check if nothing is missing.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// The missing set as a reportable error, sorted by name.
    #[must_use]
    pub fn missing_error(&self) -> Option<trellis_core::Error> {
        if self.missing.is_empty() {
            return None;
        }
        let mut missing: Vec<(String, String)> = self
            .missing
            .iter()
            .map(|range| {
                (
                    range.name.to_string(),
                    range
                        .version_range
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                )
            })
            .collect();
        missing.sort();
        Some(trellis_core::Error::packages_not_found(missing))
    }
}
