//! Arena-backed dependency tree.
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeId`]. A node
//! owns its ordered children; the parent link is a plain index, so the tree
//! can be walked upward for eclipse checks without reference cycles.

use crate::library::{
    LibraryDependency, LibraryDescription, LibraryIdentity, LibraryKind, LibraryName, LibraryRange,
};
use ahash::AHashMap;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

/// Index of a node in a [`DependencyGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the arena.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Acceptance state of a node during conflict resolution.
///
/// Nodes start `Acceptable`. `Accepted` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Disposition {
    /// Not decided yet.
    #[default]
    Acceptable,
    /// Part of the final resolution.
    Accepted,
    /// Dropped, either unresolved or beaten by another version.
    Rejected,
}

impl Disposition {
    /// Get the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Acceptable => "Acceptable",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved payload attached to a node.
///
/// Shared between every node whose range resolved to the same identity.
#[derive(Debug)]
pub struct GraphItem<T> {
    /// The resolved identity.
    pub key: LibraryIdentity,
    /// Walker-specific data.
    pub data: T,
}

impl<T> GraphItem<T> {
    /// Create an item.
    pub const fn new(key: LibraryIdentity, data: T) -> Self {
        Self { key, data }
    }
}

/// Data carried by a resolved item that the resolution output needs.
pub trait LibraryData {
    /// Declared dependencies.
    fn dependencies(&self) -> &[LibraryDependency];

    /// Kind of library.
    fn kind(&self) -> LibraryKind {
        LibraryKind::Package
    }

    /// Source handle.
    fn path(&self) -> Option<&Arc<str>> {
        None
    }
}

impl LibraryData for LibraryDescription {
    fn dependencies(&self) -> &[LibraryDependency] {
        &self.dependencies
    }

    fn kind(&self) -> LibraryKind {
        self.kind
    }

    fn path(&self) -> Option<&Arc<str>> {
        self.path.as_ref()
    }
}

/// A tree node.
#[derive(Debug)]
pub struct GraphNode<T> {
    /// The range this node was created for.
    pub key: LibraryRange,
    /// What the range resolved to, if anything.
    pub item: Option<Arc<GraphItem<T>>>,
    /// Parent node; `None` for the root.
    pub outer: Option<NodeId>,
    /// Children in insertion order.
    pub inner: SmallVec<[NodeId; 4]>,
    /// Conflict resolution state.
    pub disposition: Disposition,
}

impl<T> GraphNode<T> {
    fn new(key: LibraryRange, outer: Option<NodeId>) -> Self {
        Self {
            key,
            item: None,
            outer,
            inner: SmallVec::new(),
            disposition: Disposition::Acceptable,
        }
    }

    /// Name of the resolved item, falling back to the range name.
    #[must_use]
    pub fn name(&self) -> &LibraryName {
        self.item.as_ref().map_or(&self.key.name, |item| &item.key.name)
    }
}

/// A dependency tree rooted at a single library.
#[derive(Debug)]
pub struct DependencyGraph<T> {
    nodes: Vec<GraphNode<T>>,
}

impl<T> DependencyGraph<T> {
    const ROOT: NodeId = NodeId(0);

    /// Create a graph holding only the root.
    #[must_use]
    pub fn new(root: LibraryRange) -> Self {
        Self {
            nodes: vec![GraphNode::new(root, None)],
        }
    }

    /// The root node.
    #[must_use]
    #[inline]
    pub const fn root(&self) -> NodeId {
        Self::ROOT
    }

    /// Number of nodes, including the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Append a child for `key` under `parent`.
    pub fn add_child(&mut self, parent: NodeId, key: LibraryRange) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(GraphNode::new(key, Some(parent)));
        self.nodes[parent.0].inner.push(id);
        id
    }

    /// Iterate all nodes in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GraphNode<T>)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Breadth-first visit of every node.
    pub fn for_each(&self, mut visitor: impl FnMut(NodeId, &GraphNode<T>)) {
        let mut queue = VecDeque::from([Self::ROOT]);
        while let Some(id) = queue.pop_front() {
            let node = &self.nodes[id.0];
            visitor(id, node);
            queue.extend(node.inner.iter().copied());
        }
    }

    /// Breadth-first visit carrying a per-branch state.
    ///
    /// The state returned for a node is handed to each of its children.
    pub fn for_each_with_state<S: Clone>(
        &mut self,
        state: S,
        mut visitor: impl FnMut(&mut GraphNode<T>, S) -> S,
    ) {
        let mut queue = VecDeque::from([(Self::ROOT, state)]);
        while let Some((id, state)) = queue.pop_front() {
            let inner_state = visitor(&mut self.nodes[id.0], state);
            for &child in &self.nodes[id.0].inner {
                queue.push_back((child, inner_state.clone()));
            }
        }
    }

    /// Check whether a dependency named `name` declared by `node` is
    /// shadowed by the line leading to it.
    ///
    /// Walks from `node` up to the root. At each level the level's own
    /// range name and the names of its children count.
    #[must_use]
    pub fn is_eclipsed(&self, node: NodeId, name: &LibraryName) -> bool {
        let mut scan = Some(node);
        while let Some(id) = scan {
            let current = &self.nodes[id.0];
            if current.key.name == *name {
                return true;
            }
            if current
                .inner
                .iter()
                .any(|&side| self.nodes[side.0].key.name == *name)
            {
                return true;
            }
            scan = current.outer;
        }
        false
    }

    /// Names from the root down to `node`.
    #[must_use]
    pub fn path_to(&self, node: NodeId) -> Vec<LibraryName> {
        let mut path = Vec::new();
        let mut scan = Some(node);
        while let Some(id) = scan {
            path.push(self.nodes[id.0].name().clone());
            scan = self.nodes[id.0].outer;
        }
        path.reverse();
        path
    }

    /// Count nodes in a given state.
    #[must_use]
    pub fn count(&self, disposition: Disposition) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.disposition == disposition)
            .count()
    }

    /// Collect, per name, the first accepted item reachable through
    /// accepted ancestors only.
    #[must_use]
    pub fn accepted_items(&self) -> AHashMap<LibraryName, Arc<GraphItem<T>>> {
        let mut accepted = AHashMap::new();
        let mut queue = VecDeque::from([Self::ROOT]);
        while let Some(id) = queue.pop_front() {
            let node = &self.nodes[id.0];
            if node.disposition != Disposition::Accepted {
                continue;
            }
            if let Some(item) = &node.item {
                accepted
                    .entry(item.key.name.clone())
                    .or_insert_with(|| Arc::clone(item));
            }
            queue.extend(node.inner.iter().copied());
        }
        accepted
    }

    /// Render the tree depth-first, two spaces per level.
    ///
    /// Each line reads `<identity or range> <disposition>`.
    pub fn dump(&self, mut write: impl FnMut(&str)) {
        let mut stack = vec![(Self::ROOT, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let node = &self.nodes[id.0];
            let label = node
                .item
                .as_ref()
                .map_or_else(|| node.key.to_string(), |item| item.key.to_string());
            write(&format!(
                "{:indent$}{label} {}",
                "",
                node.disposition,
                indent = depth * 2
            ));
            stack.extend(node.inner.iter().rev().map(|&child| (child, depth + 1)));
        }
    }

    /// Render the tree into a string, one node per line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.dump(|line| {
            out.push_str(line);
            out.push('\n');
        });
        out
    }
}

impl<T> Index<NodeId> for DependencyGraph<T> {
    type Output = GraphNode<T>;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id.0]
    }
}

impl<T> IndexMut<NodeId> for DependencyGraph<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.nodes[id.0]
    }
}
