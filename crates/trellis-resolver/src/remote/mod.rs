//! Asynchronous resolution against project, local and remote providers.
//!
//! A [`RemoteWalkContext`] holds the providers and the single-flight caches;
//! any number of [`RemoteDependencyWalker`] walks may share one context, for
//! example one walk per target platform. Cycles are an error here, unlike
//! in the local walker, which silently eclipses them.

mod context;
mod matching;
mod provider;
mod results;
mod walker;

pub use context::{RemoteItem, RemoteResolveResult, RemoteWalkContext};
pub use matching::WalkStats;
pub use provider::{
    LocalWalkProvider, ProviderFuture, ProviderMatch, RemoteMatch, TimeoutProvider, WalkProvider,
};
pub use results::RemoteResolveResults;
pub use walker::RemoteDependencyWalker;
