//! Assertion helpers for walked and resolved graphs.

use trellis_resolver::{DependencyGraph, Disposition, LibraryData, Resolution};

/// Identities of accepted nodes, sorted and deduplicated.
#[must_use]
pub fn accepted<T>(graph: &DependencyGraph<T>) -> Vec<String> {
    let mut names: Vec<String> = graph
        .nodes()
        .filter(|(_, node)| node.disposition == Disposition::Accepted)
        .filter_map(|(_, node)| node.item.as_ref().map(|item| item.key.to_string()))
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Identities of rejected nodes that did resolve, sorted and deduplicated.
#[must_use]
pub fn rejected<T>(graph: &DependencyGraph<T>) -> Vec<String> {
    let mut names: Vec<String> = graph
        .nodes()
        .filter(|(_, node)| node.disposition == Disposition::Rejected)
        .filter_map(|(_, node)| node.item.as_ref().map(|item| item.key.to_string()))
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Assert that conflict resolution left no node undecided.
///
/// # Panics
/// Panics listing the undecided nodes.
pub fn assert_all_decided<T>(graph: &DependencyGraph<T>) {
    let open: Vec<String> = graph
        .nodes()
        .filter(|(_, node)| node.disposition == Disposition::Acceptable)
        .map(|(_, node)| node.key.to_string())
        .collect();
    assert!(open.is_empty(), "undecided nodes: {open:?}");
}

/// Assert that every accepted name appears at most once.
///
/// # Panics
/// Panics naming the first library accepted at two versions.
pub fn assert_single_version<T: LibraryData>(graph: &DependencyGraph<T>) {
    let mut seen = ahash::AHashMap::new();
    for (_, node) in graph.nodes() {
        if node.disposition != Disposition::Accepted {
            continue;
        }
        let Some(item) = &node.item else { continue };
        if let Some(previous) = seen.insert(item.key.name.clone(), item.key.version.clone()) {
            assert_eq!(
                previous, item.key.version,
                "{} accepted at two versions",
                item.key.name
            );
        }
    }
}

/// Assert that every library in `resolution` comes after its dependencies.
///
/// # Panics
/// Panics naming the first library listed before one of its dependencies.
pub fn assert_dependencies_first(resolution: &Resolution) {
    for (position, library) in resolution.libraries.iter().enumerate() {
        for dependency in &library.dependencies {
            let Some(at) = resolution
                .libraries
                .iter()
                .position(|l| l.identity.name == *dependency)
            else {
                continue;
            };
            assert!(
                at < position,
                "{} listed before its dependency {dependency}",
                library.identity
            );
        }
    }
}
