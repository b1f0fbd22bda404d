//! Concurrent dependency walker over async providers.
//!
//! Each node resolves its dependencies in parallel and joins them before it
//! completes, so children appear in completion order rather than
//! declaration order. The finished tree is copied into a
//! [`DependencyGraph`] for conflict resolution.

use super::context::{RemoteItem, RemoteResolveResult, RemoteWalkContext};
use crate::graph::{DependencyGraph, Disposition, NodeId};
use crate::library::{LibraryIdentity, LibraryName, LibraryRange};
use crate::types::ResolveError;
use crate::version::{Version, VersionRange};
use futures::future::{BoxFuture, FutureExt, try_join_all};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, trace};
use trellis_core::TargetPlatform;

/// One step of the line from the root to the node being expanded.
///
/// `edge` is the index, within `item`'s dependencies, of the dependency
/// that was followed to leave this step.
#[derive(Debug)]
struct Ancestry {
    item: RemoteItem,
    edge: usize,
    outer: Option<Arc<Self>>,
}

/// Decide whether a dependency named `name`, declared by `current`, gets a
/// node.
///
/// A dependency on `current` itself, or on an ancestor, closes a cycle,
/// which is an error. An ancestor that declares the name itself, other than
/// through the followed edge, eclipses it.
fn admits(
    chain: Option<&Arc<Ancestry>>,
    current: &LibraryIdentity,
    name: &LibraryName,
) -> Result<bool, ResolveError> {
    if current.name == *name {
        return Err(circular(chain, current, name));
    }
    let mut link = chain;
    while let Some(step) = link {
        if step.item.key.name == *name {
            return Err(circular(chain, current, name));
        }
        let declared_elsewhere = step
            .item
            .data
            .dependencies
            .iter()
            .enumerate()
            .any(|(i, d)| i != step.edge && d.name() == name);
        if declared_elsewhere {
            return Ok(false);
        }
        link = step.outer.as_ref();
    }
    Ok(true)
}

fn circular(
    chain: Option<&Arc<Ancestry>>,
    current: &LibraryIdentity,
    name: &LibraryName,
) -> ResolveError {
    let mut path = Vec::new();
    let mut link = chain;
    while let Some(step) = link {
        path.push(step.item.key.name.to_string());
        link = step.outer.as_ref();
    }
    path.reverse();
    path.push(current.name.to_string());
    path.push(name.to_string());
    ResolveError::CircularDependency {
        name: name.to_string(),
        path,
    }
}

/// A resolved node before it is placed in the arena.
struct Subtree {
    key: LibraryRange,
    item: Option<RemoteItem>,
    children: Vec<Self>,
}

fn create_node(
    context: Arc<RemoteWalkContext>,
    range: LibraryRange,
    platform: TargetPlatform,
    chain: Option<Arc<Ancestry>>,
) -> BoxFuture<'static, Result<Subtree, ResolveError>> {
    async move {
        let Some(item) = context.resolve_item(&range, &platform).await? else {
            trace!(range = %range, "unresolved");
            return Ok(Subtree {
                key: range,
                item: None,
                children: Vec::new(),
            });
        };

        let mut pending = FuturesUnordered::new();
        for (edge, dependency) in item.data.dependencies.iter().enumerate() {
            if !admits(chain.as_ref(), &item.key, dependency.name())? {
                trace!(parent = %item.key, dependency = %dependency.range, "eclipsed");
                continue;
            }
            let link = Arc::new(Ancestry {
                item: Arc::clone(&item),
                edge,
                outer: chain.clone(),
            });
            pending.push(create_node(
                Arc::clone(&context),
                dependency.range.clone(),
                platform.clone(),
                Some(link),
            ));
        }

        let mut children = Vec::with_capacity(pending.len());
        while let Some(child) = pending.next().await {
            children.push(child?);
        }
        Ok(Subtree {
            key: range,
            item: Some(item),
            children,
        })
    }
    .boxed()
}

fn graft(graph: &mut DependencyGraph<RemoteResolveResult>, id: NodeId, subtree: Subtree) {
    let Subtree { item, children, .. } = subtree;
    match item {
        Some(item) => graph[id].item = Some(item),
        None => graph[id].disposition = Disposition::Rejected,
    }
    for child in children {
        let child_id = graph.add_child(id, child.key.clone());
        graft(graph, child_id, child);
    }
}

/// Expands roots against a shared [`RemoteWalkContext`].
#[derive(Debug, Clone)]
pub struct RemoteDependencyWalker {
    context: Arc<RemoteWalkContext>,
}

impl RemoteDependencyWalker {
    /// Create a walker over `context`.
    #[must_use]
    pub const fn new(context: Arc<RemoteWalkContext>) -> Self {
        Self { context }
    }

    /// The shared context.
    #[must_use]
    pub fn context(&self) -> &Arc<RemoteWalkContext> {
        &self.context
    }

    /// Expand `name` at `version` for `platform`.
    ///
    /// Unmatched ranges are left `Rejected`; everything else stays
    /// `Acceptable`.
    ///
    /// # Errors
    /// Fails on the first cycle or provider failure. Sibling work still in
    /// flight is dropped.
    pub async fn walk(
        &self,
        name: impl Into<LibraryName>,
        version: Version,
        platform: &TargetPlatform,
    ) -> Result<DependencyGraph<RemoteResolveResult>, ResolveError> {
        let start = Instant::now();
        let root = LibraryRange::new(name, VersionRange::pinned(version));
        info!(root = %root, platform = %platform, "remote walk starting");

        let tree = create_node(
            Arc::clone(&self.context),
            root.clone(),
            platform.clone(),
            None,
        )
        .await?;

        let mut graph = DependencyGraph::new(root);
        let id = graph.root();
        graft(&mut graph, id, tree);

        info!(
            nodes = graph.node_count(),
            rejected = graph.count(Disposition::Rejected),
            elapsed_ms = start.elapsed().as_millis(),
            "remote walk complete"
        );
        Ok(graph)
    }

    /// Walk several roots concurrently over the same context.
    ///
    /// Graphs come back in the order of `roots`.
    ///
    /// # Errors
    /// The first failure of any walk.
    pub async fn walk_all(
        &self,
        roots: impl IntoIterator<Item = (LibraryName, Version, TargetPlatform)>,
    ) -> Result<Vec<DependencyGraph<RemoteResolveResult>>, ResolveError> {
        try_join_all(
            roots
                .into_iter()
                .map(|(name, version, platform)| async move {
                    self.walk(name, version, &platform).await
                }),
        )
        .await
    }
}
