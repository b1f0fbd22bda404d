//! Asynchronous providers used by the remote walker.

use crate::library::{LibraryDependency, LibraryIdentity, LibraryRange};
use crate::provider::DependencyProvider;
use crate::types::ProviderError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use trellis_core::TargetPlatform;

/// Boxed future returned by [`WalkProvider`] methods.
pub type ProviderFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// What a provider found for a range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderMatch {
    /// The resolved library.
    pub library: LibraryIdentity,
    /// Provider-defined source handle.
    pub path: Option<Arc<str>>,
}

impl ProviderMatch {
    /// A match with no source handle.
    #[must_use]
    pub const fn new(library: LibraryIdentity) -> Self {
        Self {
            library,
            path: None,
        }
    }
}

/// A package source the remote walker can query.
pub trait WalkProvider: Send + Sync + fmt::Debug {
    /// The source is reached over the network.
    fn is_http(&self) -> bool;

    /// Find the best library for `range`.
    fn find_library<'a>(
        &'a self,
        range: &'a LibraryRange,
        platform: &'a TargetPlatform,
    ) -> ProviderFuture<'a, Option<ProviderMatch>>;

    /// Dependencies of a library previously returned by `find_library`.
    fn get_dependencies<'a>(
        &'a self,
        found: &'a ProviderMatch,
        platform: &'a TargetPlatform,
    ) -> ProviderFuture<'a, Vec<LibraryDependency>>;

    /// Write the package payload to `writer`.
    fn copy_to<'a>(
        &'a self,
        found: &'a ProviderMatch,
        writer: &'a mut (dyn AsyncWrite + Unpin + Send),
    ) -> ProviderFuture<'a, ()>;
}

/// A match together with the provider that produced it.
#[derive(Clone)]
pub struct RemoteMatch {
    /// Owning provider.
    pub provider: Arc<dyn WalkProvider>,
    /// What was found.
    pub found: ProviderMatch,
}

impl RemoteMatch {
    /// Resolved library.
    #[must_use]
    #[inline]
    pub const fn library(&self) -> &LibraryIdentity {
        &self.found.library
    }

    /// Source handle.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.found.path.as_deref()
    }

    /// Stream the package payload through the owning provider.
    ///
    /// # Errors
    /// Whatever the provider reports.
    pub async fn copy_to(
        &self,
        writer: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<(), ProviderError> {
        self.provider.copy_to(&self.found, writer).await
    }
}

impl fmt::Debug for RemoteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteMatch")
            .field("library", &self.found.library)
            .field("path", &self.found.path)
            .field("is_http", &self.provider.is_http())
            .finish_non_exhaustive()
    }
}

/// Serves a synchronous [`DependencyProvider`] to the remote walker.
#[derive(Debug)]
pub struct LocalWalkProvider {
    inner: Arc<dyn DependencyProvider>,
}

impl LocalWalkProvider {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn DependencyProvider>) -> Self {
        Self { inner }
    }
}

impl WalkProvider for LocalWalkProvider {
    fn is_http(&self) -> bool {
        false
    }

    fn find_library<'a>(
        &'a self,
        range: &'a LibraryRange,
        platform: &'a TargetPlatform,
    ) -> ProviderFuture<'a, Option<ProviderMatch>> {
        Box::pin(async move {
            Ok(self
                .inner
                .description(range, platform)
                .map(|description| ProviderMatch {
                    library: description.identity,
                    path: description.path,
                }))
        })
    }

    fn get_dependencies<'a>(
        &'a self,
        found: &'a ProviderMatch,
        platform: &'a TargetPlatform,
    ) -> ProviderFuture<'a, Vec<LibraryDependency>> {
        Box::pin(async move {
            let range = LibraryRange::exact(&found.library);
            Ok(self
                .inner
                .description(&range, platform)
                .map(|description| description.dependencies.into_vec())
                .unwrap_or_default())
        })
    }

    fn copy_to<'a>(
        &'a self,
        found: &'a ProviderMatch,
        writer: &'a mut (dyn AsyncWrite + Unpin + Send),
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let Some(path) = &found.path else {
                return Err(ProviderError::Unavailable(format!(
                    "{} has no local source",
                    found.library
                )));
            };
            writer.write_all(path.as_bytes()).await?;
            writer.flush().await?;
            Ok(())
        })
    }
}

/// Fails any call to the wrapped provider that runs longer than a limit.
#[derive(Debug)]
pub struct TimeoutProvider {
    inner: Arc<dyn WalkProvider>,
    timeout: Duration,
}

impl TimeoutProvider {
    /// Wrap `inner` with a per-call `timeout`.
    #[must_use]
    pub fn new(inner: Arc<dyn WalkProvider>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn limit<T>(
        &self,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))?
    }
}

impl WalkProvider for TimeoutProvider {
    fn is_http(&self) -> bool {
        self.inner.is_http()
    }

    fn find_library<'a>(
        &'a self,
        range: &'a LibraryRange,
        platform: &'a TargetPlatform,
    ) -> ProviderFuture<'a, Option<ProviderMatch>> {
        Box::pin(self.limit(self.inner.find_library(range, platform)))
    }

    fn get_dependencies<'a>(
        &'a self,
        found: &'a ProviderMatch,
        platform: &'a TargetPlatform,
    ) -> ProviderFuture<'a, Vec<LibraryDependency>> {
        Box::pin(self.limit(self.inner.get_dependencies(found, platform)))
    }

    fn copy_to<'a>(
        &'a self,
        found: &'a ProviderMatch,
        writer: &'a mut (dyn AsyncWrite + Unpin + Send),
    ) -> ProviderFuture<'a, ()> {
        Box::pin(self.limit(self.inner.copy_to(found, writer)))
    }
}
