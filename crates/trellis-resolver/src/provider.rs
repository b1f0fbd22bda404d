//! Synchronous dependency providers.
//!
//! A [`DependencyProvider`] answers "what does this range resolve to?" for
//! the local walker. Three in-memory implementations are supplied:
//!
//! - [`PackageStore`]: versions of packages, optionally with per-platform
//!   dependency groups
//! - [`LockFileProvider`]: exactly the versions pinned by a lock snapshot
//! - [`ProjectProvider`]: workspace projects, matched by name only

use crate::library::{
    LibraryDependency, LibraryDescription, LibraryIdentity, LibraryKind, LibraryName, LibraryRange,
};
use crate::version::{Version, find_best_match};
use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use trellis_core::TargetPlatform;

/// Resolves a library range to a description.
///
/// Implementations must be free of side effects beyond internal caching.
pub trait DependencyProvider: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Describe the best library for `range` on `platform`, if any.
    fn description(
        &self,
        range: &LibraryRange,
        platform: &TargetPlatform,
    ) -> Option<LibraryDescription>;
}

impl<P: DependencyProvider + ?Sized> DependencyProvider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn description(
        &self,
        range: &LibraryRange,
        platform: &TargetPlatform,
    ) -> Option<LibraryDescription> {
        (**self).description(range, platform)
    }
}

/// One version of a package held by a [`PackageStore`].
#[derive(Debug, Clone)]
pub struct StoredPackage {
    /// The version.
    pub version: Version,
    /// Source handle reported in descriptions.
    pub path: Option<Arc<str>>,
    neutral: Vec<LibraryDependency>,
    by_platform: Vec<(TargetPlatform, Vec<LibraryDependency>)>,
}

impl StoredPackage {
    /// A version with platform-neutral dependencies.
    #[must_use]
    pub fn new(version: Version, dependencies: impl IntoIterator<Item = LibraryDependency>) -> Self {
        Self {
            version,
            path: None,
            neutral: dependencies.into_iter().collect(),
            by_platform: Vec::new(),
        }
    }

    /// Add a dependency group that replaces the neutral one on `platform`.
    #[must_use]
    pub fn with_platform_group(
        mut self,
        platform: impl Into<TargetPlatform>,
        dependencies: impl IntoIterator<Item = LibraryDependency>,
    ) -> Self {
        self.by_platform
            .push((platform.into(), dependencies.into_iter().collect()));
        self
    }

    /// Set the source handle.
    #[must_use]
    pub fn with_path(mut self, path: impl AsRef<str>) -> Self {
        self.path = Some(Arc::from(path.as_ref()));
        self
    }

    /// Dependencies that apply on `platform`.
    ///
    /// An exact platform group wins; otherwise the neutral group applies.
    #[must_use]
    pub fn dependencies_for(&self, platform: &TargetPlatform) -> &[LibraryDependency] {
        self.by_platform
            .iter()
            .find(|(p, _)| p == platform)
            .map_or(&self.neutral, |(_, deps)| deps)
    }
}

/// In-memory package store keyed by name.
#[derive(Debug, Default)]
pub struct PackageStore {
    label: String,
    packages: RwLock<AHashMap<LibraryName, Vec<StoredPackage>>>,
}

impl PackageStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            packages: RwLock::new(AHashMap::new()),
        }
    }

    /// Add a version with platform-neutral dependencies.
    pub fn add(
        &self,
        name: impl Into<LibraryName>,
        version: Version,
        dependencies: impl IntoIterator<Item = LibraryDependency>,
    ) {
        self.add_package(name, StoredPackage::new(version, dependencies));
    }

    /// Add a fully described version, replacing an equal version.
    pub fn add_package(&self, name: impl Into<LibraryName>, package: StoredPackage) {
        let mut packages = self.packages.write();
        let versions = packages.entry(name.into()).or_default();
        versions.retain(|p| p.version != package.version);
        versions.push(package);
    }

    /// All versions of `name`, unordered.
    #[must_use]
    pub fn versions(&self, name: &LibraryName) -> Vec<Version> {
        self.packages
            .read()
            .get(name)
            .map(|v| v.iter().map(|p| p.version.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of distinct package names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.read().len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.read().is_empty()
    }

    /// Find the best stored version for `range`.
    #[must_use]
    pub fn find(&self, range: &LibraryRange) -> Option<(LibraryIdentity, StoredPackage)> {
        let version_range = range.version_range.as_ref()?;
        if range.is_platform_reference {
            return None;
        }
        let packages = self.packages.read();
        let (name, versions) = packages.get_key_value(&range.name)?;
        let best = find_best_match(versions, version_range, |p| &p.version)?;
        Some((LibraryIdentity::new(name.clone(), best.version.clone()), best.clone()))
    }
}

impl DependencyProvider for PackageStore {
    fn name(&self) -> &str {
        &self.label
    }

    fn description(
        &self,
        range: &LibraryRange,
        platform: &TargetPlatform,
    ) -> Option<LibraryDescription> {
        let (identity, package) = self.find(range)?;
        let mut description = LibraryDescription::new(
            range.clone(),
            identity,
            package.dependencies_for(platform).iter().cloned(),
        );
        description.path = package.path;
        Some(description)
    }
}

/// A library pinned by a lock snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedLibrary {
    /// Library name.
    pub name: LibraryName,
    /// Pinned version.
    pub version: Version,
    /// Source handle.
    #[serde(default)]
    pub path: Option<String>,
    /// Package dependencies recorded at lock time.
    #[serde(default)]
    pub dependencies: Vec<LibraryDependency>,
    /// Platform/framework references recorded at lock time.
    #[serde(default)]
    pub platform_references: Vec<LibraryName>,
}

/// An already-parsed lock snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    /// Locked libraries.
    pub libraries: Vec<LockedLibrary>,
}

/// Serves exactly the versions pinned in a [`LockFile`].
#[derive(Debug)]
pub struct LockFileProvider {
    libraries: AHashMap<LibraryName, Vec<LockedLibrary>>,
}

impl LockFileProvider {
    /// Index a lock snapshot by name.
    #[must_use]
    pub fn new(lock_file: LockFile) -> Self {
        let mut libraries: AHashMap<LibraryName, Vec<LockedLibrary>> = AHashMap::new();
        for library in lock_file.libraries {
            libraries.entry(library.name.clone()).or_default().push(library);
        }
        Self { libraries }
    }
}

impl DependencyProvider for LockFileProvider {
    fn name(&self) -> &str {
        "lock-file"
    }

    fn description(
        &self,
        range: &LibraryRange,
        _platform: &TargetPlatform,
    ) -> Option<LibraryDescription> {
        if range.is_platform_reference {
            return None;
        }
        let version_range = range.version_range.as_ref()?;
        let candidates = self.libraries.get(&range.name)?;
        let locked = find_best_match(candidates, version_range, |l| &l.version)?;

        let dependencies = locked.dependencies.iter().cloned().chain(
            locked
                .platform_references
                .iter()
                .map(|name| LibraryDependency::platform_reference(name.clone())),
        );
        let mut description = LibraryDescription::new(
            range.clone(),
            LibraryIdentity::new(locked.name.clone(), locked.version.clone()),
            dependencies,
        );
        description.path = locked.path.as_deref().map(Arc::from);
        Some(description)
    }
}

/// A project in the current workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceProject {
    /// Project name.
    pub name: LibraryName,
    /// Project version.
    pub version: Version,
    /// Project directory or file.
    pub path: Option<Arc<str>>,
    /// Dependencies for every platform.
    pub dependencies: Vec<LibraryDependency>,
    /// Additional dependencies for specific platforms.
    pub platform_dependencies: Vec<(TargetPlatform, Vec<LibraryDependency>)>,
}

impl WorkspaceProject {
    /// Create a project with shared dependencies only.
    #[must_use]
    pub fn new(
        name: impl Into<LibraryName>,
        version: Version,
        dependencies: impl IntoIterator<Item = LibraryDependency>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            path: None,
            dependencies: dependencies.into_iter().collect(),
            platform_dependencies: Vec::new(),
        }
    }

    /// Add platform-specific dependencies.
    #[must_use]
    pub fn with_platform_dependencies(
        mut self,
        platform: impl Into<TargetPlatform>,
        dependencies: impl IntoIterator<Item = LibraryDependency>,
    ) -> Self {
        self.platform_dependencies
            .push((platform.into(), dependencies.into_iter().collect()));
        self
    }
}

/// Resolves workspace projects by name, ignoring any version constraint.
#[derive(Debug, Default)]
pub struct ProjectProvider {
    projects: AHashMap<LibraryName, WorkspaceProject>,
}

impl ProjectProvider {
    /// Create a provider over `projects`.
    #[must_use]
    pub fn new(projects: impl IntoIterator<Item = WorkspaceProject>) -> Self {
        Self {
            projects: projects
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
        }
    }
}

impl DependencyProvider for ProjectProvider {
    fn name(&self) -> &str {
        "projects"
    }

    fn description(
        &self,
        range: &LibraryRange,
        platform: &TargetPlatform,
    ) -> Option<LibraryDescription> {
        if range.is_platform_reference {
            return None;
        }
        let project = self.projects.get(&range.name)?;
        let extra = project
            .platform_dependencies
            .iter()
            .filter(|(p, _)| p == platform)
            .flat_map(|(_, deps)| deps.iter().cloned());

        let mut description = LibraryDescription::new(
            range.clone(),
            LibraryIdentity::new(project.name.clone(), project.version.clone()),
            project.dependencies.iter().cloned().chain(extra),
        )
        .with_kind(LibraryKind::Project);
        description.path = project.path.clone();
        Some(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionRange;
    use pretty_assertions::assert_eq;

    fn dep(name: &str, range: &str) -> LibraryDependency {
        LibraryDependency::new(name, VersionRange::parse(range).unwrap())
    }

    fn range(name: &str, text: &str) -> LibraryRange {
        LibraryRange::new(name, VersionRange::parse(text).unwrap())
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    mod package_store {
        use super::*;
        use pretty_assertions::assert_eq;

        fn store() -> PackageStore {
            let store = PackageStore::new("packages");
            store.add("Json", v("1.0.0"), []);
            store.add("Json", v("1.4.0"), []);
            store.add("Json", v("2.0.0"), []);
            store.add_package(
                "Http",
                StoredPackage::new(v("3.1.0"), [dep("Json", "1.0.0")])
                    .with_platform_group("net8.0", [dep("Json", "2.0.0")])
                    .with_path("packages/http/3.1.0"),
            );
            store
        }

        #[test]
        fn pinned_lookup_prefers_lowest() {
            let found = store()
                .description(&range("json", "1.2.0"), &TargetPlatform::any())
                .unwrap();
            assert_eq!(found.identity, LibraryIdentity::new("Json", v("1.4.0")));
            assert_eq!(found.identity.name.as_str(), "Json");
        }

        #[test]
        fn floating_lookup_prefers_highest() {
            let found = store()
                .description(&range("Json", "1.*"), &TargetPlatform::any())
                .unwrap();
            assert_eq!(found.identity.version, v("1.4.0"));
        }

        #[test]
        fn platform_groups_replace_neutral() {
            let store = store();
            let neutral = store
                .description(&range("Http", "3.0"), &TargetPlatform::new("net6.0"))
                .unwrap();
            assert_eq!(neutral.dependencies.to_vec(), vec![dep("Json", "1.0.0")]);

            let net8 = store
                .description(&range("Http", "3.0"), &TargetPlatform::new("NET8.0"))
                .unwrap();
            assert_eq!(net8.dependencies.to_vec(), vec![dep("Json", "2.0.0")]);
            assert_eq!(net8.path.as_deref(), Some("packages/http/3.1.0"));
        }

        #[test]
        fn misses() {
            let store = store();
            let any = TargetPlatform::any();
            assert!(store.description(&range("Json", "3.0"), &any).is_none());
            assert!(store.description(&range("Missing", "1.0"), &any).is_none());
            assert!(store.description(&LibraryRange::name_only("Json"), &any).is_none());
            assert!(
                store
                    .description(&LibraryRange::platform_reference("Json"), &any)
                    .is_none()
            );
        }

        #[test]
        fn re_adding_a_version_replaces_it() {
            let store = store();
            store.add("Json", v("1.4.0"), [dep("Extra", "1.0")]);
            assert_eq!(store.versions(&LibraryName::new("Json")).len(), 3);
            assert_eq!(store.len(), 2);
        }
    }

    mod lock_file {
        use super::*;
        use pretty_assertions::assert_eq;

        fn provider() -> LockFileProvider {
            LockFileProvider::new(LockFile {
                libraries: vec![LockedLibrary {
                    name: LibraryName::new("Json"),
                    version: v("1.4.0"),
                    path: Some("json/1.4.0".into()),
                    dependencies: vec![dep("Buffers", "4.0")],
                    platform_references: vec![LibraryName::new("System.Runtime")],
                }],
            })
        }

        #[test]
        fn serves_only_pinned_versions() {
            let provider = provider();
            let any = TargetPlatform::any();
            let found = provider.description(&range("Json", "1.0"), &any).unwrap();
            assert_eq!(found.identity.version, v("1.4.0"));
            assert!(provider.description(&range("Json", "[2.0, )"), &any).is_none());
        }

        #[test]
        fn platform_references_become_dependencies() {
            let found = provider()
                .description(&range("Json", "1.0"), &TargetPlatform::any())
                .unwrap();
            assert_eq!(found.dependencies.len(), 2);
            assert!(found.dependencies[1].range.is_platform_reference);
            assert_eq!(found.path.as_deref(), Some("json/1.4.0"));
        }

        #[test]
        fn deserializes_from_json() {
            let lock: LockFile = serde_json::from_str(
                r#"{"libraries":[{"name":"Json","version":"1.4.0","dependencies":[{"range":{"name":"Buffers","version_range":"4.0"}}]}]}"#,
            )
            .unwrap();
            assert_eq!(lock.libraries[0].dependencies[0].name().as_str(), "Buffers");
        }
    }

    mod projects {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn matches_by_name_and_adds_platform_dependencies() {
            let provider = ProjectProvider::new([WorkspaceProject::new(
                "Core",
                v("0.1.0"),
                [dep("Json", "1.0")],
            )
            .with_platform_dependencies("net8.0", [dep("Http", "3.0")])]);

            let any = provider
                .description(&LibraryRange::name_only("core"), &TargetPlatform::any())
                .unwrap();
            assert_eq!(any.kind, LibraryKind::Project);
            assert_eq!(any.dependencies.len(), 1);

            let net8 = provider
                .description(&range("Core", "[9.0]"), &TargetPlatform::new("net8.0"))
                .unwrap();
            assert_eq!(net8.identity.version, v("0.1.0"));
            assert_eq!(net8.dependencies.len(), 2);
        }
    }
}
