//! Per-name bookkeeping for one conflict resolution pass.

use crate::library::{LibraryIdentity, LibraryName};
use ahash::{AHashMap, AHashSet};

#[derive(Debug, Default)]
struct Entry {
    candidates: AHashSet<LibraryIdentity>,
    ambiguous: bool,
}

/// Candidate identities seen per library name.
///
/// Built fresh for every pass. Only the set of candidates matters, never the
/// order in which they were tracked.
#[derive(Debug, Default)]
pub struct Tracker {
    entries: AHashMap<LibraryName, Entry>,
}

impl Tracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, name: &LibraryName) -> &mut Entry {
        self.entries.entry(name.clone()).or_default()
    }

    /// Record `identity` as a live candidate for its name.
    pub fn track(&mut self, identity: &LibraryIdentity) {
        let entry = self.entry(&identity.name);
        if !entry.candidates.contains(identity) {
            entry.candidates.insert(identity.clone());
        }
    }

    /// More than one distinct identity is tracked under this name.
    #[must_use]
    pub fn is_disputed(&self, identity: &LibraryIdentity) -> bool {
        self.entries
            .get(&identity.name)
            .is_some_and(|e| e.candidates.len() > 1)
    }

    /// The name sits below a disputed library somewhere in the tree.
    #[must_use]
    pub fn is_ambiguous(&self, identity: &LibraryIdentity) -> bool {
        self.entries
            .get(&identity.name)
            .is_some_and(|e| e.ambiguous)
    }

    /// Defer every candidate of this name to a later pass.
    pub fn mark_ambiguous(&mut self, identity: &LibraryIdentity) {
        self.entry(&identity.name).ambiguous = true;
    }

    /// No tracked candidate of the same name has a higher version.
    #[must_use]
    pub fn is_best_version(&self, identity: &LibraryIdentity) -> bool {
        self.entries.get(&identity.name).is_none_or(|e| {
            e.candidates
                .iter()
                .all(|known| identity.version >= known.version)
        })
    }

    /// Names currently tracked.
    pub fn names(&self) -> impl Iterator<Item = &LibraryName> {
        self.entries.keys()
    }
}
