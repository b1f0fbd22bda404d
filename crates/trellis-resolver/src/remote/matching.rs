//! Choosing between project, local and remote matches for one range.

use super::provider::{RemoteMatch, WalkProvider};
use crate::library::{LibraryIdentity, LibraryRange};
use crate::types::{ProviderError, ResolveError};
use crate::version::VersionRange;
use futures::future::try_join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Semaphore;
use tracing::debug;
use trellis_core::TargetPlatform;

/// Counters for provider traffic during a remote walk.
#[derive(Debug, Default)]
pub struct WalkStats {
    /// `find_library` calls issued.
    pub find_calls: AtomicU64,
    /// `get_dependencies` calls issued.
    pub dependency_calls: AtomicU64,
    /// Range lookups answered by an existing entry.
    pub cache_hits: AtomicU64,
}

/// Providers grouped by preference.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProviderTiers {
    pub(crate) project: Vec<Arc<dyn WalkProvider>>,
    pub(crate) local: Vec<Arc<dyn WalkProvider>>,
    pub(crate) remote: Vec<Arc<dyn WalkProvider>>,
}

/// Everything a detached lookup future needs.
#[derive(Debug, Clone)]
pub(crate) struct Lookup {
    pub(crate) tiers: Arc<ProviderTiers>,
    pub(crate) permits: Arc<Semaphore>,
    pub(crate) stats: Arc<WalkStats>,
}

impl Lookup {
    async fn call_find(
        &self,
        provider: Arc<dyn WalkProvider>,
        range: &LibraryRange,
        platform: &TargetPlatform,
    ) -> Result<Option<RemoteMatch>, ResolveError> {
        let _permit = self.permits.acquire().await.map_err(|e| {
            ResolveError::provider(&range.name, ProviderError::Other(e.to_string()))
        })?;
        self.stats.find_calls.fetch_add(1, Ordering::Relaxed);

        let found = provider
            .find_library(range, platform)
            .await
            .map_err(|e| ResolveError::provider(&range.name, e))?;
        Ok(found.map(|found| RemoteMatch { provider, found }))
    }

    /// Query `providers` in parallel and keep the best match.
    async fn find_in(
        &self,
        range: &LibraryRange,
        version_range: &VersionRange,
        providers: Vec<Arc<dyn WalkProvider>>,
        platform: &TargetPlatform,
    ) -> Result<Option<RemoteMatch>, ResolveError> {
        let matches = try_join_all(
            providers
                .into_iter()
                .map(|provider| self.call_find(provider, range, platform)),
        )
        .await?;

        Ok(matches
            .into_iter()
            .fold(None, |best: Option<RemoteMatch>, candidate| {
                if version_range.is_better(
                    best.as_ref().map(|m| &m.library().version),
                    candidate.as_ref().map(|m| &m.library().version),
                ) {
                    candidate
                } else {
                    best
                }
            }))
    }

    /// Best match within one tier.
    ///
    /// Non-HTTP providers are asked first for pinned ranges; HTTP providers
    /// are skipped when that already yields the minimum version.
    async fn find_by_version(
        &self,
        range: &LibraryRange,
        version_range: &VersionRange,
        providers: &[Arc<dyn WalkProvider>],
        platform: &TargetPlatform,
    ) -> Result<Option<RemoteMatch>, ResolveError> {
        if version_range.is_floating() {
            return self
                .find_in(range, version_range, providers.to_vec(), platform)
                .await;
        }

        let non_http = self
            .find_in(
                range,
                version_range,
                providers.iter().filter(|p| !p.is_http()).cloned().collect(),
                platform,
            )
            .await?;
        if non_http
            .as_ref()
            .is_some_and(|m| m.library().version == *version_range.min_version())
        {
            return Ok(non_http);
        }

        let http = self
            .find_in(
                range,
                version_range,
                providers.iter().filter(|p| p.is_http()).cloned().collect(),
                platform,
            )
            .await?;
        if version_range.is_better(
            non_http.as_ref().map(|m| &m.library().version),
            http.as_ref().map(|m| &m.library().version),
        ) {
            return Ok(http);
        }
        Ok(non_http)
    }

    /// Whether the exact `library` is available from `providers`.
    async fn find_exact(
        &self,
        library: &LibraryIdentity,
        providers: &[Arc<dyn WalkProvider>],
        platform: &TargetPlatform,
    ) -> Result<Option<RemoteMatch>, ResolveError> {
        let range = LibraryRange::exact(library);
        let Some(version_range) = &range.version_range else {
            return Ok(None);
        };
        self.find_by_version(&range, version_range, providers, platform)
            .await
    }

    async fn find_project(
        &self,
        range: &LibraryRange,
        platform: &TargetPlatform,
    ) -> Result<Option<RemoteMatch>, ResolveError> {
        let by_name = LibraryRange::name_only(range.name.clone());
        for provider in &self.tiers.project {
            let provider = Arc::clone(provider);
            if let Some(found) = self.call_find(provider, &by_name, platform).await? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Pick the match for `range`.
    ///
    /// 1. Projects win outright.
    /// 2. Name-only ranges and platform references resolve to nothing.
    /// 3. Floating ranges ask remote sources first, then reuse a local copy
    ///    of the exact remote version when there is one.
    /// 4. Pinned ranges take a local copy of the minimum version, otherwise
    ///    compare local and remote candidates, leaning local.
    pub(crate) async fn find_library_match(
        self,
        range: LibraryRange,
        platform: TargetPlatform,
    ) -> Result<Option<RemoteMatch>, ResolveError> {
        if let Some(project) = self.find_project(&range, &platform).await? {
            debug!(range = %range, library = %project.library(), "project match");
            return Ok(Some(project));
        }

        let Some(version_range) = range.version_range.as_ref() else {
            return Ok(None);
        };
        if range.is_platform_reference {
            return Ok(None);
        }
        let tiers = &self.tiers;

        if version_range.is_floating() {
            let Some(remote) = self
                .find_by_version(&range, version_range, &tiers.remote, &platform)
                .await?
            else {
                let local = self
                    .find_by_version(&range, version_range, &tiers.local, &platform)
                    .await?;
                debug!(range = %range, found = local.is_some(), "floating range, local fallback");
                return Ok(local);
            };

            let local = self
                .find_exact(remote.library(), &tiers.local, &platform)
                .await?;
            if let Some(local) = local {
                if local.library().version == remote.library().version {
                    debug!(range = %range, library = %local.library(), "floating range, local copy");
                    return Ok(Some(local));
                }
            }
            debug!(range = %range, library = %remote.library(), "floating range, remote");
            return Ok(Some(remote));
        }

        let mut local = self
            .find_by_version(&range, version_range, &tiers.local, &platform)
            .await?;
        if let Some(exact) = local
            .as_ref()
            .filter(|m| m.library().version == *version_range.min_version())
        {
            debug!(range = %range, library = %exact.library(), "pinned range, exact local");
            return Ok(local);
        }

        let remote = self
            .find_by_version(&range, version_range, &tiers.remote, &platform)
            .await?;
        if let (Some(found), None) = (&remote, &local) {
            local = self
                .find_exact(found.library(), &tiers.local, &platform)
                .await?;
        }

        let chosen = match (local, remote) {
            (Some(local), Some(remote)) => {
                if version_range.is_better(
                    Some(&local.library().version),
                    Some(&remote.library().version),
                ) {
                    Some(remote)
                } else {
                    Some(local)
                }
            }
            (local, remote) => local.or(remote),
        };
        debug!(
            range = %range,
            library = ?chosen.as_ref().map(|m| m.library().to_string()),
            "pinned range"
        );
        Ok(chosen)
    }
}
