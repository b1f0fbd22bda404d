//! Scripted async providers for remote walk tests.
//!
//! [`MockProvider`] answers `find_library` with the best stored version for
//! a range and counts every call. Calls can be slowed down, globally or per
//! library, or made to fail for specific libraries.

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use trellis_core::TargetPlatform;
use trellis_resolver::{
    LibraryDependency, LibraryIdentity, LibraryName, LibraryRange, ProviderError, ProviderFuture,
    ProviderMatch, Version, VersionRange, WalkProvider, find_best_match,
};

#[derive(Debug, Clone)]
struct MockPackage {
    version: Version,
    dependencies: Vec<LibraryDependency>,
}

/// An in-memory [`WalkProvider`] with call accounting.
#[derive(Debug)]
pub struct MockProvider {
    label: String,
    is_http: bool,
    delay: Option<Duration>,
    delays: RwLock<AHashMap<LibraryName, Duration>>,
    packages: RwLock<AHashMap<LibraryName, Vec<MockPackage>>>,
    failing: RwLock<AHashSet<LibraryName>>,
    find_calls: AtomicUsize,
    dependency_calls: AtomicUsize,
    requests: RwLock<Vec<LibraryRange>>,
}

impl MockProvider {
    /// Create a non-HTTP provider.
    #[must_use]
    pub fn local(label: impl Into<String>) -> Self {
        Self::new(label, false)
    }

    /// Create an HTTP provider.
    #[must_use]
    pub fn http(label: impl Into<String>) -> Self {
        Self::new(label, true)
    }

    fn new(label: impl Into<String>, is_http: bool) -> Self {
        Self {
            label: label.into(),
            is_http,
            delay: None,
            delays: RwLock::new(AHashMap::new()),
            packages: RwLock::new(AHashMap::new()),
            failing: RwLock::new(AHashSet::new()),
            find_calls: AtomicUsize::new(0),
            dependency_calls: AtomicUsize::new(0),
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Sleep before answering every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add a version of `name`.
    ///
    /// Dependencies are `(name, range)` pairs in range notation.
    ///
    /// # Panics
    /// Panics if `version` or a range does not parse.
    #[must_use]
    pub fn with_package(self, name: &str, version: &str, dependencies: &[(&str, &str)]) -> Self {
        self.add(name, version, dependencies);
        self
    }

    /// Add a version of `name` in place.
    ///
    /// # Panics
    /// Panics if `version` or a range does not parse.
    pub fn add(&self, name: &str, version: &str, dependencies: &[(&str, &str)]) {
        let package = MockPackage {
            version: Version::parse(version).unwrap(),
            dependencies: dependencies
                .iter()
                .map(|(name, range)| {
                    LibraryDependency::new(*name, VersionRange::parse(range).unwrap())
                })
                .collect(),
        };
        self.packages
            .write()
            .entry(LibraryName::new(name))
            .or_default()
            .push(package);
    }

    /// Sleep for `delay` on every call that concerns `name`.
    ///
    /// Overrides the provider-wide delay for that library.
    pub fn delay_on(&self, name: &str, delay: Duration) {
        self.delays.write().insert(LibraryName::new(name), delay);
    }

    /// Fail every call that concerns `name`.
    pub fn fail_on(&self, name: &str) {
        self.failing.write().insert(LibraryName::new(name));
    }

    /// Provider label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of `find_library` calls so far.
    #[must_use]
    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    /// Number of `get_dependencies` calls so far.
    #[must_use]
    pub fn dependency_calls(&self) -> usize {
        self.dependency_calls.load(Ordering::SeqCst)
    }

    /// Every range passed to `find_library`, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<LibraryRange> {
        self.requests.read().clone()
    }

    async fn pause(&self, name: &LibraryName) {
        let delay = self.delays.read().get(name).copied().or(self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check(&self, name: &LibraryName) -> Result<(), ProviderError> {
        if self.failing.read().contains(name) {
            return Err(ProviderError::Unavailable(format!(
                "{} refused {name}",
                self.label
            )));
        }
        Ok(())
    }

    fn best(&self, range: &LibraryRange) -> Option<LibraryIdentity> {
        let version_range = range.version_range.as_ref()?;
        let packages = self.packages.read();
        let (name, versions) = packages.get_key_value(&range.name)?;
        let best = find_best_match(versions, version_range, |p| &p.version)?;
        Some(LibraryIdentity::new(name.clone(), best.version.clone()))
    }
}

impl WalkProvider for MockProvider {
    fn is_http(&self) -> bool {
        self.is_http
    }

    fn find_library<'a>(
        &'a self,
        range: &'a LibraryRange,
        _platform: &'a TargetPlatform,
    ) -> ProviderFuture<'a, Option<ProviderMatch>> {
        Box::pin(async move {
            self.find_calls.fetch_add(1, Ordering::SeqCst);
            self.requests.write().push(range.clone());
            self.pause(&range.name).await;
            self.check(&range.name)?;
            Ok(self.best(range).map(|library| ProviderMatch {
                path: Some(Arc::from(format!("{}/{library}", self.label))),
                library,
            }))
        })
    }

    fn get_dependencies<'a>(
        &'a self,
        found: &'a ProviderMatch,
        _platform: &'a TargetPlatform,
    ) -> ProviderFuture<'a, Vec<LibraryDependency>> {
        Box::pin(async move {
            self.dependency_calls.fetch_add(1, Ordering::SeqCst);
            self.pause(&found.library.name).await;
            self.check(&found.library.name)?;
            Ok(self
                .packages
                .read()
                .get(&found.library.name)
                .and_then(|versions| {
                    versions
                        .iter()
                        .find(|p| p.version == found.library.version)
                })
                .map(|p| p.dependencies.clone())
                .unwrap_or_default())
        })
    }

    fn copy_to<'a>(
        &'a self,
        found: &'a ProviderMatch,
        writer: &'a mut (dyn AsyncWrite + Unpin + Send),
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            self.check(&found.library.name)?;
            writer
                .write_all(found.library.to_string().as_bytes())
                .await?;
            writer.flush().await?;
            Ok(())
        })
    }
}
