//! Flattening a conflict-resolved tree into a [`Resolution`].
//!
//! The accepted closure is collected from the root through declared
//! dependencies by name, then ordered so every library comes after the
//! libraries it depends on.
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_resolver::{DependencyWalker, ResolverConfig, resolve_local};
//!
//! let walker = DependencyWalker::new(providers);
//! let resolution = resolve_local(&walker, "App", version, &platform, &ResolverConfig::default())?;
//! for library in &resolution.libraries {
//!     println!("{}", library.identity);
//! }
//! ```

use crate::config::ResolverConfig;
use crate::conflict::resolve_conflicts;
use crate::graph::{DependencyGraph, GraphItem, LibraryData};
use crate::library::LibraryName;
use crate::types::{Resolution, ResolveError, ResolvedLibrary};
use crate::version::Version;
use crate::walker::DependencyWalker;
use ahash::{AHashMap, AHashSet};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use trellis_core::TargetPlatform;

impl Resolution {
    /// Build the resolution of a graph whose conflicts are resolved.
    ///
    /// An unresolved or rejected root yields an empty resolution.
    #[must_use]
    pub fn from_graph<T: LibraryData>(graph: &DependencyGraph<T>) -> Self {
        let start = Instant::now();
        let accepted = graph.accepted_items();

        let mut closure: Vec<Arc<GraphItem<T>>> = Vec::new();
        let mut visited: AHashSet<LibraryName> = AHashSet::new();
        let mut queue: VecDeque<&Arc<GraphItem<T>>> = graph[graph.root()]
            .item
            .as_ref()
            .and_then(|root| accepted.get(&root.key.name))
            .into_iter()
            .collect();

        while let Some(item) = queue.pop_front() {
            if !visited.insert(item.key.name.clone()) {
                continue;
            }
            closure.push(Arc::clone(item));
            for dependency in item.data.dependencies() {
                if let Some(next) = accepted.get(dependency.name()) {
                    queue.push_back(next);
                }
            }
        }

        let mut dependency_graph: DiGraph<LibraryName, ()> = DiGraph::new();
        let mut indices: AHashMap<LibraryName, NodeIndex> = AHashMap::new();
        for item in &closure {
            let idx = dependency_graph.add_node(item.key.name.clone());
            indices.insert(item.key.name.clone(), idx);
        }

        let mut libraries: AHashMap<LibraryName, ResolvedLibrary> = AHashMap::new();
        for item in &closure {
            let dependent = indices[&item.key.name];
            let mut dependencies = Vec::new();
            for dependency in item.data.dependencies() {
                if let Some(&idx) = indices.get(dependency.name()) {
                    if !dependencies.contains(&dependency_graph[idx]) {
                        dependency_graph.add_edge(idx, dependent, ());
                        dependencies.push(dependency_graph[idx].clone());
                    }
                }
            }
            libraries.insert(
                item.key.name.clone(),
                ResolvedLibrary {
                    identity: item.key.clone(),
                    kind: item.data.kind(),
                    path: item.data.path().cloned(),
                    dependencies,
                },
            );
        }

        let libraries = topological_sort(&dependency_graph, &indices, libraries);
        Self {
            libraries,
            graph: dependency_graph,
            indices,
            duration: start.elapsed(),
        }
    }
}

/// Sort libraries in topological order (dependencies first).
fn topological_sort(
    graph: &DiGraph<LibraryName, ()>,
    indices: &AHashMap<LibraryName, NodeIndex>,
    mut libraries: AHashMap<LibraryName, ResolvedLibrary>,
) -> Vec<ResolvedLibrary> {
    let mut result = Vec::with_capacity(libraries.len());
    let mut in_degree: AHashMap<NodeIndex, usize> = AHashMap::new();

    for &idx in indices.values() {
        in_degree.insert(
            idx,
            graph.neighbors_directed(idx, Direction::Incoming).count(),
        );
    }

    let mut queue: Vec<_> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(&i, _)| i)
        .collect();
    // Deterministic output for equal in-degrees.
    queue.sort_by(|a, b| b.cmp(a));

    while !in_degree.is_empty() {
        if queue.is_empty() {
            // Cycle: pick the lowest remaining degree to break it
            if let Some((&idx, _)) = in_degree.iter().min_by_key(|(i, d)| (**d, **i)) {
                queue.push(idx);
            } else {
                break;
            }
        }

        while let Some(idx) = queue.pop() {
            if in_degree.remove(&idx).is_none() {
                continue;
            }

            if let Some(library) = libraries.remove(&graph[idx]) {
                result.push(library);
            }

            for neighbor in graph.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(deg) = in_degree.get_mut(&neighbor) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        queue.push(neighbor);
                    }
                }
            }
        }
    }

    result
}

/// Walk, resolve conflicts and flatten in one call.
///
/// # Errors
/// Returns [`ResolveError::ConflictsUnresolved`] if conflict resolution
/// does not converge.
pub fn resolve_local(
    walker: &DependencyWalker,
    name: impl Into<LibraryName>,
    version: Version,
    platform: &TargetPlatform,
    config: &ResolverConfig,
) -> Result<Resolution, ResolveError> {
    let start = Instant::now();
    let mut graph = walker.walk(name, version, platform);
    let passes = resolve_conflicts(&mut graph, config)?;
    let mut resolution = Resolution::from_graph(&graph);
    resolution.duration = start.elapsed();

    info!(
        libraries = resolution.len(),
        passes,
        total_ms = resolution.duration.as_millis(),
        "resolution complete"
    );
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{LibraryDependency, LibraryKind};
    use crate::provider::{DependencyProvider, PackageStore, ProjectProvider, WorkspaceProject};
    use crate::version::VersionRange;
    use pretty_assertions::assert_eq;

    fn dep(name: &str, range: &str) -> LibraryDependency {
        LibraryDependency::new(name, VersionRange::parse(range).unwrap())
    }

    fn names(resolution: &Resolution) -> Vec<String> {
        resolution
            .libraries
            .iter()
            .map(|l| l.identity.to_string())
            .collect()
    }

    #[test]
    fn dependencies_come_first() {
        let store = PackageStore::new("packages");
        store.add("App", Version::new(1, 0, 0), [dep("Http", "2.0")]);
        store.add("Http", Version::new(2, 0, 0), [dep("Json", "1.0")]);
        store.add("Json", Version::new(1, 0, 0), []);
        let walker = DependencyWalker::new([Arc::new(store) as Arc<dyn DependencyProvider>]);

        let resolution = resolve_local(
            &walker,
            "App",
            Version::new(1, 0, 0),
            &TargetPlatform::any(),
            &ResolverConfig::default(),
        )
        .unwrap();

        assert_eq!(names(&resolution), vec!["Json 1.0.0", "Http 2.0.0", "App 1.0.0"]);
        assert_eq!(resolution.get("http").unwrap().dependencies.len(), 1);
        assert_eq!(resolution.dependents("Json")[0].identity.name.as_str(), "Http");
    }

    #[test]
    fn cycles_are_broken() {
        let projects = ProjectProvider::new([
            WorkspaceProject::new("A", Version::new(1, 0, 0), [dep("B", "1.0")]),
            WorkspaceProject::new("B", Version::new(1, 0, 0), [dep("C", "1.0")]),
            WorkspaceProject::new("C", Version::new(1, 0, 0), [dep("B", "1.0")]),
        ]);
        let walker = DependencyWalker::new([Arc::new(projects) as Arc<dyn DependencyProvider>]);
        let resolution = resolve_local(
            &walker,
            "A",
            Version::new(1, 0, 0),
            &TargetPlatform::any(),
            &ResolverConfig::default(),
        )
        .unwrap();

        assert_eq!(resolution.len(), 3);
        assert!(["A", "B", "C"].iter().all(|n| resolution.contains(n)));
        assert!(
            resolution
                .libraries
                .iter()
                .all(|l| l.kind == LibraryKind::Project)
        );
    }

    #[test]
    fn unresolved_root_is_empty() {
        let walker = DependencyWalker::new([
            Arc::new(PackageStore::new("empty")) as Arc<dyn DependencyProvider>
        ]);
        let resolution = resolve_local(
            &walker,
            "Nothing",
            Version::new(1, 0, 0),
            &TargetPlatform::any(),
            &ResolverConfig::default(),
        )
        .unwrap();
        assert!(resolution.is_empty());
    }
}
