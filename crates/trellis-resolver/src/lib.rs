//! Dependency graph resolution for Trellis.
//!
//! Two walkers build a tree of library ranges from a root:
//!
//! - [`DependencyWalker`] expands synchronously against ordered
//!   [`DependencyProvider`]s. Repeated names are eclipsed, which breaks
//!   cycles and lets the declaration nearest the root win.
//! - [`RemoteDependencyWalker`] expands concurrently against project, local
//!   and remote [`WalkProvider`]s through a shared [`RemoteWalkContext`],
//!   collapsing duplicate lookups. Cycles are an error.
//!
//! [`try_resolve_conflicts`] then settles cousins that picked different
//! versions of the same library, and [`Resolution::from_graph`] flattens
//! the accepted nodes into dependency-first order.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_core::TargetPlatform;
//! use trellis_resolver::{
//!     DependencyProvider, DependencyWalker, LibraryDependency, PackageStore, ResolverConfig,
//!     Version, VersionRange, resolve_local,
//! };
//!
//! let store = PackageStore::new("packages");
//! store.add(
//!     "App",
//!     Version::new(1, 0, 0),
//!     [LibraryDependency::new("Json", VersionRange::parse("1.0").unwrap())],
//! );
//! store.add("Json", Version::new(1, 2, 0), []);
//!
//! let walker = DependencyWalker::new([Arc::new(store) as Arc<dyn DependencyProvider>]);
//! let resolution = resolve_local(
//!     &walker,
//!     "App",
//!     Version::new(1, 0, 0),
//!     &TargetPlatform::any(),
//!     &ResolverConfig::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(resolution.libraries[0].identity.to_string(), "Json 1.2.0");
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod conflict;
pub mod graph;
pub mod library;
pub mod provider;
pub mod remote;
pub mod resolver;
pub mod tracker;
pub mod types;
pub mod version;
pub mod walker;

pub use config::{ResolverConfig, ResolverEnvVar};
pub use conflict::{ConflictOutcome, resolve_conflicts, try_resolve_conflicts};
pub use graph::{DependencyGraph, Disposition, GraphItem, GraphNode, LibraryData, NodeId};
pub use library::{
    LibraryDependency, LibraryDescription, LibraryIdentity, LibraryKind, LibraryName, LibraryRange,
};
pub use provider::{
    DependencyProvider, LockFile, LockFileProvider, LockedLibrary, PackageStore, ProjectProvider,
    StoredPackage, WorkspaceProject,
};
pub use remote::{
    LocalWalkProvider, ProviderFuture, ProviderMatch, RemoteDependencyWalker, RemoteItem,
    RemoteMatch, RemoteResolveResult, RemoteResolveResults, RemoteWalkContext, TimeoutProvider,
    WalkProvider, WalkStats,
};
pub use resolver::resolve_local;
pub use tracker::Tracker;
pub use types::{ProviderError, Resolution, ResolveError, ResolvedLibrary};
pub use version::{FloatBehavior, Version, VersionParseError, VersionRange, find_best_match};
pub use walker::{DependencyWalker, ResolveResult};
