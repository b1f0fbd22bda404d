//! Synchronous dependency walker.
//!
//! Expands one root breadth-first against an ordered list of
//! [`DependencyProvider`]s. A declared dependency is dropped when its name
//! already appears on the line leading to it (see
//! [`DependencyGraph::is_eclipsed`]), which both breaks cycles and makes the
//! declaration nearest the root win.

use crate::graph::{DependencyGraph, Disposition, GraphItem, LibraryData};
use crate::library::{
    LibraryDependency, LibraryDescription, LibraryIdentity, LibraryKind, LibraryName, LibraryRange,
};
use crate::provider::DependencyProvider;
use crate::version::{Version, VersionRange};
use ahash::AHashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace};
use trellis_core::TargetPlatform;

/// A description together with the provider that produced it.
#[derive(Debug, Clone)]
pub struct ResolveResult {
    /// What the provider reported.
    pub description: LibraryDescription,
    /// The provider that matched.
    pub provider: Arc<dyn DependencyProvider>,
}

impl LibraryData for ResolveResult {
    fn dependencies(&self) -> &[LibraryDependency] {
        &self.description.dependencies
    }

    fn kind(&self) -> LibraryKind {
        self.description.kind
    }

    fn path(&self) -> Option<&Arc<str>> {
        self.description.path.as_ref()
    }
}

type LocalItem = Arc<GraphItem<ResolveResult>>;

/// Lookups memoized for the duration of one walk.
#[derive(Default)]
struct WalkCache {
    by_range: AHashMap<LibraryRange, Option<LocalItem>>,
    by_identity: AHashMap<LibraryIdentity, LocalItem>,
}

/// Local, synchronous tree expansion.
#[derive(Debug, Clone)]
pub struct DependencyWalker {
    providers: Vec<Arc<dyn DependencyProvider>>,
}

impl DependencyWalker {
    /// Create a walker that asks `providers` in order.
    #[must_use]
    pub fn new(providers: impl IntoIterator<Item = Arc<dyn DependencyProvider>>) -> Self {
        Self {
            providers: providers.into_iter().collect(),
        }
    }

    /// Expand `name` at `version` into a full dependency tree.
    ///
    /// Ranges no provider can satisfy leave their node `Rejected`. Every
    /// other node is left `Acceptable` for conflict resolution.
    pub fn walk(
        &self,
        name: impl Into<LibraryName>,
        version: Version,
        platform: &TargetPlatform,
    ) -> DependencyGraph<ResolveResult> {
        let start = Instant::now();
        let root = LibraryRange::new(name, VersionRange::pinned(version));
        info!(root = %root, platform = %platform, "local walk starting");

        let mut graph = DependencyGraph::new(root);
        let mut cache = WalkCache::default();
        let mut queue = VecDeque::from([graph.root()]);

        while let Some(id) = queue.pop_front() {
            let Some(item) = self.resolve(&mut cache, &graph[id].key, platform) else {
                trace!(range = %graph[id].key, "unresolved");
                graph[id].disposition = Disposition::Rejected;
                continue;
            };
            graph[id].item = Some(Arc::clone(&item));

            for dependency in item.data.dependencies() {
                if graph.is_eclipsed(id, dependency.name()) {
                    trace!(parent = %item.key, dependency = %dependency.range, "eclipsed");
                    continue;
                }
                let child = graph.add_child(id, dependency.range.clone());
                queue.push_back(child);
            }
        }

        info!(
            nodes = graph.node_count(),
            rejected = graph.count(Disposition::Rejected),
            elapsed_ms = start.elapsed().as_millis(),
            "local walk complete"
        );
        graph
    }

    fn resolve(
        &self,
        cache: &mut WalkCache,
        range: &LibraryRange,
        platform: &TargetPlatform,
    ) -> Option<LocalItem> {
        if let Some(hit) = cache.by_range.get(range) {
            return hit.clone();
        }

        let hit = self.providers.iter().find_map(|provider| {
            provider
                .description(range, platform)
                .map(|description| ResolveResult {
                    description,
                    provider: Arc::clone(provider),
                })
        });

        let Some(hit) = hit else {
            cache.by_range.insert(range.clone(), None);
            return None;
        };
        debug!(
            range = %range,
            resolved = %hit.description.identity,
            provider = hit.provider.name(),
            "resolved"
        );

        let identity = hit.description.identity.clone();
        let item = cache
            .by_identity
            .entry(identity.clone())
            .or_insert_with(|| Arc::new(GraphItem::new(identity, hit)))
            .clone();
        cache.by_range.insert(range.clone(), Some(Arc::clone(&item)));
        Some(item)
    }
}
