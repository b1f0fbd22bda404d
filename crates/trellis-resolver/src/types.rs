//! Core types for dependency resolution.
//!
//! This module contains the fundamental types used throughout the resolver:
//! - `Resolution`: The flattened result of a conflict-resolved graph
//! - `ResolvedLibrary`: A library selected during resolution
//! - `ResolveError`: Errors that can occur during resolution
//! - `ProviderError`: Opaque failures reported by dependency providers

use crate::library::{LibraryIdentity, LibraryKind, LibraryName};
use ahash::AHashMap;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A library selected during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLibrary {
    /// Resolved name and version.
    pub identity: LibraryIdentity,
    /// Kind of library.
    pub kind: LibraryKind,
    /// Source handle reported by the provider.
    pub path: Option<Arc<str>>,
    /// Names of direct dependencies that are part of the resolution.
    pub dependencies: Vec<LibraryName>,
}

/// Result of dependency resolution.
#[derive(Debug)]
pub struct Resolution {
    /// Resolved libraries in topological order (dependencies first).
    pub libraries: Vec<ResolvedLibrary>,
    /// Dependency graph; edges point from a dependency to its dependent.
    pub graph: DiGraph<LibraryName, ()>,
    /// Node indices by library name.
    pub indices: AHashMap<LibraryName, NodeIndex>,
    /// Resolution time.
    pub duration: Duration,
}

impl Resolution {
    /// Get the number of resolved libraries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.libraries.len()
    }

    /// Check if resolution is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Get a resolved library by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResolvedLibrary> {
        self.libraries.iter().find(|l| l.identity.name.matches(name))
    }

    /// Check if a library is in the resolution.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.indices.contains_key(&LibraryName::new(name))
    }

    /// Get libraries that depend on the given library.
    #[must_use]
    pub fn dependents(&self, name: &str) -> Vec<&ResolvedLibrary> {
        let Some(&idx) = self.indices.get(&LibraryName::new(name)) else {
            return vec![];
        };

        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .filter_map(|n| {
                let dependent = self.graph.node_weight(n)?;
                self.get(dependent.as_str())
            })
            .collect()
    }
}

/// Opaque failure reported by a provider.
///
/// Cloneable so one shared lookup can hand the same failure to every waiter.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The source could not be reached.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// Disk or stream failure.
    #[error("i/o error: {0}")]
    Io(Arc<std::io::Error>),

    /// The call did not complete in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

/// Errors that can occur during dependency resolution.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// A library depends on itself through the chain being resolved.
    #[error("circular dependency references not supported: package '{name}' ({})", .path.join(" -> "))]
    CircularDependency {
        /// Library that closed the loop.
        name: String,
        /// Library names from the outermost to `name`.
        path: Vec<String>,
    },

    /// Conflict resolution hit its pass limit.
    #[error("conflict resolution did not converge after {passes} passes")]
    ConflictsUnresolved {
        /// Passes run.
        passes: usize,
        /// Libraries still undecided.
        unresolved: Vec<String>,
    },

    /// A provider failed while looking up a library.
    #[error("provider failed for '{name}': {source}")]
    Provider {
        /// Library being looked up.
        name: String,
        /// Underlying failure.
        #[source]
        source: ProviderError,
    },
}

impl ResolveError {
    /// Wrap a provider failure for `name`.
    #[must_use]
    pub fn provider(name: &LibraryName, source: ProviderError) -> Self {
        Self::Provider {
            name: name.to_string(),
            source,
        }
    }
}

impl From<ResolveError> for trellis_core::Error {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::CircularDependency { path, .. } => Self::circular_dependency(path),
            ResolveError::ConflictsUnresolved { passes, unresolved } => Self::resolution(
                format!("conflicts still open after {passes} passes"),
                unresolved,
            ),
            ResolveError::Provider { name, source } => {
                Self::provider(source.to_string(), Some(name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Version;
    use pretty_assertions::assert_eq;
    use trellis_core::ErrorCode;

    fn resolution() -> Resolution {
        let mut graph = DiGraph::new();
        let mut indices = AHashMap::new();
        let mut libraries = Vec::new();
        for name in ["Json", "App"] {
            let name = LibraryName::new(name);
            indices.insert(name.clone(), graph.add_node(name.clone()));
            libraries.push(ResolvedLibrary {
                identity: LibraryIdentity::new(name, Version::new(1, 0, 0)),
                kind: LibraryKind::Package,
                path: None,
                dependencies: vec![],
            });
        }
        graph.add_edge(
            indices[&LibraryName::new("Json")],
            indices[&LibraryName::new("App")],
            (),
        );
        Resolution {
            libraries,
            graph,
            indices,
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_resolution_lookup() {
        let resolution = resolution();
        assert_eq!(resolution.len(), 2);
        assert!(resolution.contains("json"));
        assert!(!resolution.contains("Http"));
        let dependents: Vec<_> = resolution
            .dependents("JSON")
            .iter()
            .map(|l| l.identity.name.to_string())
            .collect();
        assert_eq!(dependents, vec!["App".to_string()]);
        assert!(resolution.dependents("App").is_empty());
    }

    #[test]
    fn test_provider_timeout_maps_to_timeout_code() {
        let err = ResolveError::provider(
            &LibraryName::new("Json"),
            ProviderError::Timeout(Duration::from_millis(50)),
        );
        let core: trellis_core::Error = err.into();
        assert_eq!(core.code(), ErrorCode::E0302);
    }

    #[test]
    fn test_circular_dependency_maps_to_core() {
        let err = ResolveError::CircularDependency {
            name: "A".into(),
            path: vec!["A".into(), "B".into(), "A".into()],
        };
        assert!(err.to_string().contains("A -> B -> A"));
        let core: trellis_core::Error = err.into();
        assert_eq!(core.code(), ErrorCode::E0202);
    }

    #[test]
    fn test_io_errors_are_shared() {
        let err: ProviderError = std::io::Error::other("disk full").into();
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }
}
