//! Shared state for remote walks.
//!
//! Every range is looked up at most once per context. The first caller
//! spawns the lookup and stores a shared handle to it while holding the map
//! shard lock; later callers, including walks for other platforms, await
//! that same handle. Lookups run to completion even when every waiter is
//! dropped, so a failed walk never strands a provider permit.

use super::matching::{Lookup, ProviderTiers, WalkStats};
use super::provider::{RemoteMatch, TimeoutProvider, WalkProvider};
use crate::config::ResolverConfig;
use crate::graph::{GraphItem, LibraryData};
use crate::library::{LibraryDependency, LibraryIdentity, LibraryKind, LibraryName, LibraryRange};
use crate::types::{ProviderError, ResolveError};
use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::Semaphore;
use tracing::trace;
use trellis_core::TargetPlatform;

type SharedLookup<T> = Shared<BoxFuture<'static, Result<T, ResolveError>>>;

/// Run `lookup` as its own task and share its outcome.
///
/// Must be called from within a tokio runtime.
fn detached<T>(
    name: &LibraryName,
    lookup: impl Future<Output = Result<T, ResolveError>> + Send + 'static,
) -> SharedLookup<T>
where
    T: Clone + Send + Sync + 'static,
{
    let name = name.clone();
    tokio::spawn(lookup)
        .map(move |joined| {
            joined.unwrap_or_else(|e| {
                Err(ResolveError::provider(
                    &name,
                    ProviderError::Other(format!("lookup task failed: {e}")),
                ))
            })
        })
        .boxed()
        .shared()
}

/// Item shared by every node that resolved to the same identity.
pub type RemoteItem = Arc<GraphItem<RemoteResolveResult>>;

/// A remote match with its dependency set for one platform.
#[derive(Debug, Clone)]
pub struct RemoteResolveResult {
    /// What was matched and by which provider.
    pub matched: RemoteMatch,
    /// `Project` when a project provider answered.
    pub kind: LibraryKind,
    /// Declared dependencies.
    pub dependencies: Arc<[LibraryDependency]>,
}

impl LibraryData for RemoteResolveResult {
    fn dependencies(&self) -> &[LibraryDependency] {
        &self.dependencies
    }

    fn kind(&self) -> LibraryKind {
        self.kind
    }

    fn path(&self) -> Option<&Arc<str>> {
        self.matched.found.path.as_ref()
    }
}

fn tier_contains(tier: &[Arc<dyn WalkProvider>], provider: &Arc<dyn WalkProvider>) -> bool {
    tier.iter()
        .any(|p| std::ptr::addr_eq(Arc::as_ptr(p), Arc::as_ptr(provider)))
}

/// Providers, caches and limits shared by concurrent remote walks.
pub struct RemoteWalkContext {
    lookup: Lookup,
    config: ResolverConfig,
    find_library_cache: DashMap<LibraryRange, SharedLookup<Option<RemoteMatch>>, RandomState>,
    items: DashMap<(LibraryIdentity, TargetPlatform), SharedLookup<RemoteItem>, RandomState>,
}

impl RemoteWalkContext {
    /// Create a context with no providers.
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            lookup: Lookup {
                tiers: Arc::new(ProviderTiers::default()),
                permits: Arc::new(Semaphore::new(config.max_concurrent_lookups.max(1))),
                stats: Arc::new(WalkStats::default()),
            },
            config,
            find_library_cache: DashMap::with_hasher(RandomState::new()),
            items: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Add a workspace project provider. Projects win over everything else.
    #[must_use]
    pub fn with_project_provider(mut self, provider: Arc<dyn WalkProvider>) -> Self {
        let provider = self.limited(provider);
        Arc::make_mut(&mut self.lookup.tiers).project.push(provider);
        self
    }

    /// Add a provider for packages already on disk.
    #[must_use]
    pub fn with_local_provider(mut self, provider: Arc<dyn WalkProvider>) -> Self {
        let provider = self.limited(provider);
        Arc::make_mut(&mut self.lookup.tiers).local.push(provider);
        self
    }

    /// Add a provider whose matches need installing.
    #[must_use]
    pub fn with_remote_provider(mut self, provider: Arc<dyn WalkProvider>) -> Self {
        let provider = self.limited(provider);
        Arc::make_mut(&mut self.lookup.tiers).remote.push(provider);
        self
    }

    fn limited(&self, provider: Arc<dyn WalkProvider>) -> Arc<dyn WalkProvider> {
        match self.config.provider_timeout {
            Some(timeout) => Arc::new(TimeoutProvider::new(provider, timeout)),
            None => provider,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Provider traffic so far.
    #[must_use]
    pub fn stats(&self) -> &WalkStats {
        &self.lookup.stats
    }

    /// Whether `provider` is one of the remote providers.
    #[must_use]
    pub fn is_remote(&self, provider: &Arc<dyn WalkProvider>) -> bool {
        tier_contains(&self.lookup.tiers.remote, provider)
    }

    fn pending_match(
        &self,
        range: &LibraryRange,
        platform: &TargetPlatform,
    ) -> SharedLookup<Option<RemoteMatch>> {
        match self.find_library_cache.entry(range.clone()) {
            Entry::Occupied(entry) => {
                self.lookup.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                trace!(range = %range, "find cache hit");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let pending = detached(
                    &range.name,
                    self.lookup
                        .clone()
                        .find_library_match(range.clone(), platform.clone()),
                );
                entry.insert(pending).value().clone()
            }
        }
    }

    /// Match `range`, sharing one lookup between all callers.
    ///
    /// The platform of the first caller is the one providers see.
    ///
    /// # Errors
    /// Provider failures, shared by every caller of the same range.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub async fn find_library_cached(
        &self,
        range: &LibraryRange,
        platform: &TargetPlatform,
    ) -> Result<Option<RemoteMatch>, ResolveError> {
        self.pending_match(range, platform).await
    }

    fn remember_identity(&self, range: &LibraryRange, matched: &RemoteMatch) {
        let exact = LibraryRange::exact(matched.library());
        if exact == *range {
            return;
        }
        self.find_library_cache
            .entry(exact)
            .or_insert_with(|| future::ready(Ok(Some(matched.clone()))).boxed().shared());
    }

    fn pending_item(
        &self,
        matched: RemoteMatch,
        platform: &TargetPlatform,
    ) -> SharedLookup<RemoteItem> {
        let key = (matched.library().clone(), platform.clone());
        match self.items.entry(key) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let kind = if tier_contains(&self.lookup.tiers.project, &matched.provider) {
                    LibraryKind::Project
                } else {
                    LibraryKind::Package
                };
                let name = matched.library().name.clone();
                let pending = detached(
                    &name,
                    load_item(self.lookup.clone(), matched, kind, platform.clone()),
                );
                entry.insert(pending).value().clone()
            }
        }
    }

    /// Resolve `range` into a shared item carrying its dependencies.
    ///
    /// Returns `None` when no provider has a match.
    ///
    /// # Errors
    /// Provider failures.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub async fn resolve_item(
        &self,
        range: &LibraryRange,
        platform: &TargetPlatform,
    ) -> Result<Option<RemoteItem>, ResolveError> {
        let Some(matched) = self.find_library_cached(range, platform).await? else {
            return Ok(None);
        };
        if self.config.cache_identities && !range.is_floating() {
            self.remember_identity(range, &matched);
        }
        self.pending_item(matched, platform).await.map(Some)
    }
}

impl fmt::Debug for RemoteWalkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteWalkContext")
            .field("tiers", &self.lookup.tiers)
            .field("config", &self.config)
            .field("cached_ranges", &self.find_library_cache.len())
            .field("cached_items", &self.items.len())
            .finish_non_exhaustive()
    }
}

async fn load_item(
    lookup: Lookup,
    matched: RemoteMatch,
    kind: LibraryKind,
    platform: TargetPlatform,
) -> Result<RemoteItem, ResolveError> {
    let name = matched.library().name.clone();
    let dependencies = {
        let _permit = lookup.permits.acquire().await.map_err(|e| {
            ResolveError::provider(&name, ProviderError::Other(e.to_string()))
        })?;
        lookup.stats.dependency_calls.fetch_add(1, Ordering::Relaxed);
        matched
            .provider
            .get_dependencies(&matched.found, &platform)
            .await
            .map_err(|e| ResolveError::provider(&name, e))?
    };
    trace!(
        library = %matched.library(),
        platform = %platform,
        dependencies = dependencies.len(),
        "dependencies loaded"
    );

    Ok(Arc::new(GraphItem::new(
        matched.library().clone(),
        RemoteResolveResult {
            matched,
            kind,
            dependencies: dependencies.into(),
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{PackageStore, ProjectProvider, WorkspaceProject};
    use crate::remote::provider::LocalWalkProvider;
    use crate::version::{Version, VersionRange};
    use pretty_assertions::assert_eq;

    fn store() -> Arc<dyn WalkProvider> {
        let store = PackageStore::new("feed");
        store.add(
            "Json",
            Version::new(1, 2, 0),
            [LibraryDependency::new("Buffers", VersionRange::parse("4.0").unwrap())],
        );
        store.add("Json", Version::new(2, 0, 0), []);
        Arc::new(LocalWalkProvider::new(Arc::new(store)))
    }

    fn range(name: &str, range: &str) -> LibraryRange {
        LibraryRange::new(name, VersionRange::parse(range).unwrap())
    }

    mod caching {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn same_range_is_looked_up_once() {
            let context =
                RemoteWalkContext::new(ResolverConfig::default()).with_remote_provider(store());
            let platform = TargetPlatform::any();

            let upper = range("Json", "1.0");
            let lower = range("json", "1.0");
            let (a, b) = tokio::join!(
                context.find_library_cached(&upper, &platform),
                context.find_library_cached(&lower, &platform),
            );
            assert_eq!(a.unwrap().unwrap().library(), b.unwrap().unwrap().library());
            assert_eq!(context.stats().find_calls.load(Ordering::Relaxed), 1);
            assert_eq!(context.stats().cache_hits.load(Ordering::Relaxed), 1);
        }

        #[tokio::test]
        async fn resolved_identity_short_circuits() {
            let context =
                RemoteWalkContext::new(ResolverConfig::default()).with_remote_provider(store());
            let platform = TargetPlatform::any();

            let item = context
                .resolve_item(&range("Json", "[1.0, 2.0)"), &platform)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(item.key.to_string(), "Json 1.2.0");
            let calls = context.stats().find_calls.load(Ordering::Relaxed);

            let again = context
                .resolve_item(&LibraryRange::exact(&item.key), &platform)
                .await
                .unwrap()
                .unwrap();
            assert!(Arc::ptr_eq(&item, &again));
            assert_eq!(context.stats().find_calls.load(Ordering::Relaxed), calls);
            assert_eq!(context.stats().dependency_calls.load(Ordering::Relaxed), 1);
        }

        #[tokio::test]
        async fn identity_cache_can_be_disabled() {
            let config = ResolverConfig {
                cache_identities: false,
                ..ResolverConfig::default()
            };
            let context = RemoteWalkContext::new(config).with_remote_provider(store());
            let platform = TargetPlatform::any();

            let item = context
                .resolve_item(&range("Json", "[1.0, 2.0)"), &platform)
                .await
                .unwrap()
                .unwrap();
            let calls = context.stats().find_calls.load(Ordering::Relaxed);
            context
                .resolve_item(&LibraryRange::exact(&item.key), &platform)
                .await
                .unwrap();
            assert!(context.stats().find_calls.load(Ordering::Relaxed) > calls);
        }

        #[tokio::test]
        async fn items_are_kept_per_platform() {
            let context =
                RemoteWalkContext::new(ResolverConfig::default()).with_remote_provider(store());
            let json = range("Json", "1.0");

            let a = context
                .resolve_item(&json, &TargetPlatform::new("net8.0"))
                .await
                .unwrap()
                .unwrap();
            let b = context
                .resolve_item(&json, &TargetPlatform::new("netstandard2.0"))
                .await
                .unwrap()
                .unwrap();
            assert!(!Arc::ptr_eq(&a, &b));
            assert_eq!(context.stats().find_calls.load(Ordering::Relaxed), 1);
            assert_eq!(context.stats().dependency_calls.load(Ordering::Relaxed), 2);
        }
    }

    mod tiers {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn project_items_are_flagged() {
            let projects =
                ProjectProvider::new([WorkspaceProject::new("Json", Version::new(0, 1, 0), [])]);
            let project: Arc<dyn WalkProvider> =
                Arc::new(LocalWalkProvider::new(Arc::new(projects)));
            let context = RemoteWalkContext::new(ResolverConfig::default())
                .with_project_provider(project)
                .with_remote_provider(store());

            let item = context
                .resolve_item(&range("Json", "1.0"), &TargetPlatform::any())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(item.data.kind, LibraryKind::Project);
            assert!(!context.is_remote(&item.data.matched.provider));
        }

        #[tokio::test]
        async fn remote_membership_survives_timeout_wrapping() {
            let config = ResolverConfig {
                provider_timeout: Some(std::time::Duration::from_secs(5)),
                ..ResolverConfig::default()
            };
            let context = RemoteWalkContext::new(config).with_remote_provider(store());
            let item = context
                .resolve_item(&range("Json", "1.0"), &TargetPlatform::any())
                .await
                .unwrap()
                .unwrap();
            assert!(context.is_remote(&item.data.matched.provider));
            assert_eq!(item.data.kind, LibraryKind::Package);
        }
    }
}
