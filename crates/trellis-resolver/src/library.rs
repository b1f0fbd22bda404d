//! Library names, ranges, identities and descriptions.
//!
//! - `LibraryName`: a display-preserving, case-insensitive library name
//! - `LibraryRange`: an unresolved lookup key (name + optional range)
//! - `LibraryIdentity`: a resolved (name, exact version) pair
//! - `LibraryDescription`: what a provider knows about a resolved library

use crate::version::{Version, VersionRange};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A library name compared ASCII-case-insensitively.
///
/// The spelling used at construction is kept for display.
#[derive(Clone)]
pub struct LibraryName {
    name: Arc<str>,
}

impl LibraryName {
    /// Create a name.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref().trim()),
        }
    }

    /// Get the name as written.
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Case-insensitive comparison against a plain string.
    #[must_use]
    #[inline]
    pub fn matches(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }
}

impl fmt::Debug for LibraryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LibraryName").field(&self.name).finish()
    }
}

impl fmt::Display for LibraryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq for LibraryName {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.name)
    }
}

impl Eq for LibraryName {}

impl Hash for LibraryName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.name.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        state.write_usize(self.name.len());
    }
}

impl PartialOrd for LibraryName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LibraryName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .bytes()
            .map(|c| c.to_ascii_lowercase())
            .cmp(other.name.bytes().map(|c| c.to_ascii_lowercase()))
    }
}

impl From<&str> for LibraryName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Serialize for LibraryName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

impl<'de> Deserialize<'de> for LibraryName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(s))
    }
}

/// An unresolved reference to a library.
///
/// Two ranges with the same name but different constraints are distinct
/// keys until they resolve to the same [`LibraryIdentity`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LibraryRange {
    /// Library name.
    pub name: LibraryName,
    /// Version constraint; `None` for name-only lookups.
    pub version_range: Option<VersionRange>,
    /// Platform/framework reference that never resolves to a package.
    #[serde(default)]
    pub is_platform_reference: bool,
}

impl LibraryRange {
    /// Create a range for `name` constrained by `version_range`.
    #[must_use]
    pub fn new(name: impl Into<LibraryName>, version_range: VersionRange) -> Self {
        Self {
            name: name.into(),
            version_range: Some(version_range),
            is_platform_reference: false,
        }
    }

    /// A range with no version constraint.
    #[must_use]
    pub fn name_only(name: impl Into<LibraryName>) -> Self {
        Self {
            name: name.into(),
            version_range: None,
            is_platform_reference: false,
        }
    }

    /// The exact range `[version]` of a resolved identity.
    #[must_use]
    pub fn exact(identity: &LibraryIdentity) -> Self {
        Self::new(
            identity.name.clone(),
            VersionRange::exact(identity.version.clone()),
        )
    }

    /// A platform/framework reference.
    #[must_use]
    pub fn platform_reference(name: impl Into<LibraryName>) -> Self {
        Self {
            name: name.into(),
            version_range: None,
            is_platform_reference: true,
        }
    }

    /// Check if this range floats.
    #[must_use]
    pub fn is_floating(&self) -> bool {
        self.version_range
            .as_ref()
            .is_some_and(VersionRange::is_floating)
    }
}

impl fmt::Display for LibraryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(range) = &self.version_range {
            write!(f, " {range}")?;
        }
        Ok(())
    }
}

/// A resolved (name, version) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LibraryIdentity {
    /// Library name.
    pub name: LibraryName,
    /// Exact version.
    pub version: Version,
}

impl LibraryIdentity {
    /// Create an identity.
    #[must_use]
    pub fn new(name: impl Into<LibraryName>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for LibraryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// A dependency declared by a library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LibraryDependency {
    /// What is being depended on.
    pub range: LibraryRange,
}

impl LibraryDependency {
    /// Create a dependency on `name` within `version_range`.
    #[must_use]
    pub fn new(name: impl Into<LibraryName>, version_range: VersionRange) -> Self {
        Self {
            range: LibraryRange::new(name, version_range),
        }
    }

    /// Dependency on a platform/framework reference.
    #[must_use]
    pub fn platform_reference(name: impl Into<LibraryName>) -> Self {
        Self {
            range: LibraryRange::platform_reference(name),
        }
    }

    /// Name of the dependency.
    #[must_use]
    #[inline]
    pub const fn name(&self) -> &LibraryName {
        &self.range.name
    }
}

impl From<LibraryRange> for LibraryDependency {
    fn from(range: LibraryRange) -> Self {
        Self { range }
    }
}

/// Kind of a resolved library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LibraryKind {
    /// A project in the current workspace.
    Project,
    /// A package from a store, feed or lock file.
    #[default]
    Package,
    /// A prebuilt assembly referenced directly.
    Assembly,
    /// A platform/framework reference.
    Reference,
}

impl LibraryKind {
    /// Get the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "Project",
            Self::Package => "Package",
            Self::Assembly => "Assembly",
            Self::Reference => "Reference",
        }
    }
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a provider reports about a resolved library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDescription {
    /// The range that was asked for.
    pub requested: LibraryRange,
    /// What it resolved to.
    pub identity: LibraryIdentity,
    /// Kind of library.
    pub kind: LibraryKind,
    /// Source path or handle, provider-defined.
    pub path: Option<Arc<str>>,
    /// Declared dependencies, in declaration order.
    pub dependencies: SmallVec<[LibraryDependency; 4]>,
}

impl LibraryDescription {
    /// Create a package description with no path.
    #[must_use]
    pub fn new(
        requested: LibraryRange,
        identity: LibraryIdentity,
        dependencies: impl IntoIterator<Item = LibraryDependency>,
    ) -> Self {
        Self {
            requested,
            identity,
            kind: LibraryKind::Package,
            path: None,
            dependencies: dependencies.into_iter().collect(),
        }
    }

    /// Set the kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: LibraryKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the source path or handle.
    #[must_use]
    pub fn with_path(mut self, path: impl AsRef<str>) -> Self {
        self.path = Some(Arc::from(path.as_ref()));
        self
    }
}
