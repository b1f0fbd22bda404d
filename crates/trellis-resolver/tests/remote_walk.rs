//! End-to-end tests for the asynchronous walker.
//!
//! Providers are scripted [`MockProvider`]s so call counts can be checked.

use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use trellis_core::{ErrorCode, TargetPlatform};
use trellis_resolver::{
    DependencyGraph, LibraryKind, LibraryName, LibraryRange, LocalWalkProvider, ProjectProvider,
    ProviderError, RemoteDependencyWalker, RemoteResolveResults, RemoteWalkContext, Resolution,
    ResolveError, ResolverConfig, VersionRange, WorkspaceProject, resolve_conflicts,
};
use trellis_test_utils::prelude::*;

fn range(name: &str, range: &str) -> LibraryRange {
    LibraryRange::new(name, VersionRange::parse(range).unwrap())
}

/// Identities every node resolved to, sorted.
fn resolved<T>(graph: &DependencyGraph<T>) -> Vec<String> {
    let mut names: Vec<String> = graph
        .nodes()
        .filter_map(|(_, node)| node.item.as_ref().map(|item| item.key.to_string()))
        .collect();
    names.sort();
    names
}

fn context(local: &Arc<MockProvider>, remote: &Arc<MockProvider>) -> Arc<RemoteWalkContext> {
    Arc::new(
        RemoteWalkContext::new(ResolverConfig::default())
            .with_local_provider(local.clone())
            .with_remote_provider(remote.clone()),
    )
}

// ========== Single-flight caching ==========

mod caching {
    use super::*;
    use trellis_test_utils::prelude::assert_eq;

    #[tokio::test(start_paused = true)]
    async fn concurrent_requests_share_one_lookup() {
        let local = Arc::new(MockProvider::local("disk"));
        let remote = Arc::new(
            MockProvider::http("feed")
                .with_delay(Duration::from_millis(50))
                .with_package("Json", "1.2.0", &[]),
        );
        let context = context(&local, &remote);
        let platform = TargetPlatform::any();
        let json = range("Json", "1.0");

        let results =
            join_all((0..16).map(|_| context.find_library_cached(&json, &platform))).await;

        assert_eq!(remote.find_calls(), 1);
        let first = results[0].as_ref().unwrap().as_ref().unwrap();
        for result in &results {
            let found = result.as_ref().unwrap().as_ref().unwrap();
            assert_eq!(found.library(), first.library());
            assert!(Arc::ptr_eq(&found.provider, &first.provider));
        }
    }

    #[tokio::test]
    async fn cached_identity_returns_the_same_item() {
        let local = Arc::new(MockProvider::local("disk"));
        let remote = Arc::new(MockProvider::http("feed").with_package("Json", "1.2.0", &[]));
        let context = context(&local, &remote);
        let platform = TargetPlatform::any();

        let item = context
            .resolve_item(&range("Json", "1.0"), &platform)
            .await
            .unwrap()
            .unwrap();
        let calls = (local.find_calls(), remote.find_calls(), remote.dependency_calls());

        let again = context
            .resolve_item(&LibraryRange::exact(&item.key), &platform)
            .await
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&item, &again));
        assert_eq!(
            (local.find_calls(), remote.find_calls(), remote.dependency_calls()),
            calls
        );
    }

    #[tokio::test]
    async fn platforms_share_lookups_but_not_items() {
        let local = Arc::new(MockProvider::local("disk"));
        let remote = Arc::new(
            MockProvider::http("feed")
                .with_package("App", "1.0.0", &[("Json", "1.0"), ("Http", "2.0")])
                .with_package("Http", "2.0.0", &[("Json", "1.0")])
                .with_package("Json", "1.0.0", &[]),
        );
        let walker = RemoteDependencyWalker::new(context(&local, &remote));

        let graphs = walker
            .walk_all([
                (LibraryName::new("App"), version("1.0.0"), TargetPlatform::new("net8.0")),
                (LibraryName::new("App"), version("1.0.0"), TargetPlatform::new("net48")),
            ])
            .await
            .unwrap();

        assert_eq!(graphs.len(), 2);
        assert_eq!(remote.find_calls(), 3);
        assert_eq!(remote.dependency_calls(), 6);
        let stats = walker.context().stats();
        assert_eq!(stats.dependency_calls.load(Ordering::Relaxed), 6);
        assert!(stats.cache_hits.load(Ordering::Relaxed) >= 3);
    }
}

// ========== Match policy ==========

mod matching {
    use super::*;
    use trellis_test_utils::prelude::assert_eq;

    #[tokio::test]
    async fn pinned_range_leans_local() {
        let local = Arc::new(MockProvider::local("disk").with_package("Json", "1.2.0", &[]));
        let remote = Arc::new(MockProvider::http("feed").with_package("Json", "1.5.0", &[]));
        let context = context(&local, &remote);

        let found = context
            .find_library_cached(&range("Json", "[1.0, 2.0)"), &TargetPlatform::any())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.library().to_string(), "Json 1.2.0");
        assert!(!context.is_remote(&found.provider));
    }

    #[tokio::test]
    async fn exact_local_minimum_skips_remote() {
        let local = Arc::new(MockProvider::local("disk").with_package("Json", "1.0.0", &[]));
        let remote = Arc::new(MockProvider::http("feed").with_package("Json", "1.0.0", &[]));
        let context = context(&local, &remote);

        let found = context
            .find_library_cached(&range("Json", "1.0"), &TargetPlatform::any())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.library().to_string(), "Json 1.0.0");
        assert_eq!(remote.find_calls(), 0);
    }

    #[tokio::test]
    async fn pinned_range_takes_remote_when_local_has_nothing() {
        let local = Arc::new(MockProvider::local("disk"));
        let remote = Arc::new(MockProvider::http("feed").with_package("Json", "1.5.0", &[]));
        let context = context(&local, &remote);

        let found = context
            .find_library_cached(&range("Json", "1.0"), &TargetPlatform::any())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.library().to_string(), "Json 1.5.0");
        assert!(context.is_remote(&found.provider));
        // Second local query checks for the exact remote version.
        assert_eq!(local.requests().len(), 2);
        assert_eq!(local.requests()[1], range("Json", "[1.5.0]"));
    }

    #[tokio::test]
    async fn floating_range_reuses_local_copy_of_remote_pick() {
        let local = Arc::new(MockProvider::local("disk").with_package("Json", "1.5.0", &[]));
        let remote = Arc::new(
            MockProvider::http("feed")
                .with_package("Json", "1.3.0", &[])
                .with_package("Json", "1.5.0", &[]),
        );
        let context = context(&local, &remote);

        let found = context
            .find_library_cached(&range("Json", "1.*"), &TargetPlatform::any())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.library().to_string(), "Json 1.5.0");
        assert!(!context.is_remote(&found.provider));
    }

    #[tokio::test]
    async fn floating_range_prefers_newer_remote() {
        let local = Arc::new(MockProvider::local("disk").with_package("Json", "1.3.0", &[]));
        let remote = Arc::new(MockProvider::http("feed").with_package("Json", "1.5.0", &[]));
        let context = context(&local, &remote);

        let found = context
            .find_library_cached(&range("Json", "1.*"), &TargetPlatform::any())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.library().to_string(), "Json 1.5.0");
        assert!(context.is_remote(&found.provider));
    }

    #[tokio::test]
    async fn floating_range_falls_back_to_local() {
        let local = Arc::new(MockProvider::local("disk").with_package("Json", "1.3.0", &[]));
        let remote = Arc::new(MockProvider::http("feed"));
        let context = context(&local, &remote);

        let found = context
            .find_library_cached(&range("Json", "1.*"), &TargetPlatform::any())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.library().to_string(), "Json 1.3.0");
    }

    #[tokio::test]
    async fn non_http_remote_answers_before_http() {
        let local = Arc::new(MockProvider::local("disk"));
        let mirror = Arc::new(MockProvider::local("mirror").with_package("Json", "1.0.0", &[]));
        let feed = Arc::new(MockProvider::http("feed").with_package("Json", "1.0.0", &[]));
        let context = RemoteWalkContext::new(ResolverConfig::default())
            .with_local_provider(local.clone())
            .with_remote_provider(feed.clone())
            .with_remote_provider(mirror.clone());

        let found = context
            .find_library_cached(&range("Json", "1.0"), &TargetPlatform::any())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.path(), Some("mirror/Json 1.0.0"));
        assert_eq!(feed.find_calls(), 0);
    }

    #[tokio::test]
    async fn projects_win_over_everything() {
        let projects =
            ProjectProvider::new([WorkspaceProject::new("Json", version("0.1.0"), [])]);
        let local = Arc::new(MockProvider::local("disk").with_package("Json", "1.0.0", &[]));
        let remote = Arc::new(MockProvider::http("feed").with_package("Json", "1.0.0", &[]));
        let context = RemoteWalkContext::new(ResolverConfig::default())
            .with_project_provider(Arc::new(LocalWalkProvider::new(Arc::new(projects))))
            .with_local_provider(local.clone())
            .with_remote_provider(remote.clone());

        let item = context
            .resolve_item(&range("Json", "1.0"), &TargetPlatform::any())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.key.to_string(), "Json 0.1.0");
        assert_eq!(item.data.kind, LibraryKind::Project);
        assert_eq!(local.find_calls() + remote.find_calls(), 0);
    }

    #[tokio::test]
    async fn platform_references_resolve_to_nothing() {
        let local =
            Arc::new(MockProvider::local("disk").with_package("System.Runtime", "4.0.0", &[]));
        let remote = Arc::new(MockProvider::http("feed"));
        let context = context(&local, &remote);

        let found = context
            .find_library_cached(
                &LibraryRange::platform_reference("System.Runtime"),
                &TargetPlatform::any(),
            )
            .await
            .unwrap();
        assert!(found.is_none());
        assert_eq!(local.find_calls(), 0);
    }
}

// ========== Walks ==========

mod walks {
    use super::*;
    use trellis_test_utils::prelude::assert_eq;

    #[tokio::test]
    async fn cycles_fail_the_walk() {
        let local = Arc::new(MockProvider::local("disk"));
        let remote = Arc::new(
            MockProvider::http("feed")
                .with_package("A", "1.0.0", &[("B", "1.0")])
                .with_package("B", "1.0.0", &[("C", "1.0")])
                .with_package("C", "1.0.0", &[("A", "1.0")]),
        );
        let walker = RemoteDependencyWalker::new(context(&local, &remote));

        let err = walker
            .walk("A", version("1.0.0"), &TargetPlatform::any())
            .await
            .unwrap_err();
        let ResolveError::CircularDependency { name, path } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(name, "A");
        assert_eq!(path, &vec!["A", "B", "C", "A"]);

        let core: trellis_core::Error = err.into();
        assert_eq!(core.code(), ErrorCode::E0202);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_walk_leaves_no_permit_behind() {
        let local = Arc::new(MockProvider::local("disk"));
        let remote = Arc::new(
            MockProvider::http("feed")
                .with_delay(Duration::from_millis(50))
                .with_package("R", "1.0.0", &[("S", "1.0"), ("C", "1.0")])
                .with_package("S", "1.0.0", &[("S2", "1.0")])
                .with_package("S2", "1.0.0", &[])
                .with_package("C", "1.0.0", &[("R", "1.0")])
                .with_package("T", "1.0.0", &[]),
        );
        let config = ResolverConfig {
            max_concurrent_lookups: 1,
            ..ResolverConfig::default()
        };
        let context = RemoteWalkContext::new(config)
            .with_local_provider(local.clone())
            .with_remote_provider(remote.clone());
        let walker = RemoteDependencyWalker::new(Arc::new(context));
        let platform = TargetPlatform::any();

        let err = walker.walk("R", version("1.0.0"), &platform).await.unwrap_err();
        let ResolveError::CircularDependency { path, .. } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(path, &vec!["R", "C", "R"]);

        let graph = tokio::time::timeout(
            Duration::from_secs(60),
            walker.walk("T", version("1.0.0"), &platform),
        )
        .await
        .expect("second walk stalled")
        .unwrap();
        assert_eq!(resolved(&graph), vec!["T 1.0.0"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_sibling_leaves_the_context_usable() {
        let local = Arc::new(MockProvider::local("disk"));
        let remote = Arc::new(
            MockProvider::http("feed")
                .with_package("App", "1.0.0", &[("Json", "1.0"), ("Slow", "1.0")])
                .with_package("Json", "1.0.0", &[])
                .with_package("Slow", "1.0.0", &[])
                .with_package("T", "1.0.0", &[("Json", "1.0")]),
        );
        remote.delay_on("Slow", Duration::from_secs(30));
        let config = ResolverConfig {
            provider_timeout: Some(Duration::from_millis(200)),
            max_concurrent_lookups: 2,
            ..ResolverConfig::default()
        };
        let context = RemoteWalkContext::new(config)
            .with_local_provider(local.clone())
            .with_remote_provider(remote.clone());
        let walker = RemoteDependencyWalker::new(Arc::new(context));
        let platform = TargetPlatform::any();

        let err = walker.walk("App", version("1.0.0"), &platform).await.unwrap_err();
        assert!(matches!(&err, ResolveError::Provider { name, .. } if name == "Slow"));
        let core: trellis_core::Error = err.into();
        assert_eq!(core.code(), ErrorCode::E0302);

        let graph = tokio::time::timeout(
            Duration::from_secs(60),
            walker.walk("T", version("1.0.0"), &platform),
        )
        .await
        .expect("second walk stalled")
        .unwrap();
        assert_eq!(resolved(&graph), vec!["Json 1.0.0", "T 1.0.0"]);
    }

    #[tokio::test]
    async fn provider_failures_propagate() {
        let local = Arc::new(MockProvider::local("disk"));
        let remote = Arc::new(
            MockProvider::http("feed")
                .with_package("App", "1.0.0", &[("Json", "1.0")])
                .with_package("Json", "1.0.0", &[]),
        );
        remote.fail_on("Json");
        let walker = RemoteDependencyWalker::new(context(&local, &remote));

        let err = walker
            .walk("App", version("1.0.0"), &TargetPlatform::any())
            .await
            .unwrap_err();
        assert!(matches!(
            &err,
            ResolveError::Provider { name, source: ProviderError::Unavailable(_) } if name == "Json"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_providers_time_out() {
        let remote = Arc::new(
            MockProvider::http("feed")
                .with_delay(Duration::from_secs(30))
                .with_package("App", "1.0.0", &[]),
        );
        let config = ResolverConfig {
            provider_timeout: Some(Duration::from_millis(200)),
            ..ResolverConfig::default()
        };
        let context = RemoteWalkContext::new(config).with_remote_provider(remote.clone());
        let walker = RemoteDependencyWalker::new(Arc::new(context));

        let err = walker
            .walk("App", version("1.0.0"), &TargetPlatform::any())
            .await
            .unwrap_err();
        let core: trellis_core::Error = err.into();
        assert_eq!(core.code(), ErrorCode::E0302);
    }

    #[tokio::test]
    async fn remote_graph_resolves_like_a_local_one() {
        let local = Arc::new(MockProvider::local("disk"));
        let remote = Arc::new(
            MockProvider::http("feed")
                .with_package("A", "1.0.0", &[("B", "1.0"), ("C", "1.0")])
                .with_package("B", "1.0.0", &[("D", "1.0")])
                .with_package("C", "1.0.0", &[("D", "2.0")])
                .with_package("D", "1.0.0", &[])
                .with_package("D", "2.0.0", &[]),
        );
        let walker = RemoteDependencyWalker::new(context(&local, &remote));

        let mut graph = walker
            .walk("A", version("1.0.0"), &TargetPlatform::any())
            .await
            .unwrap();
        resolve_conflicts(&mut graph, &ResolverConfig::default()).unwrap();
        assert_eq!(accepted(&graph), vec!["A 1.0.0", "B 1.0.0", "C 1.0.0", "D 2.0.0"]);
        assert_eq!(rejected(&graph), vec!["D 1.0.0"]);

        let resolution = Resolution::from_graph(&graph);
        assert_eq!(resolution.len(), 4);
        assert_dependencies_first(&resolution);
        assert_eq!(
            resolution.get("D").unwrap().path.as_deref(),
            Some("feed/D 2.0.0")
        );
    }
}

// ========== Collection ==========

mod collection {
    use super::*;
    use trellis_test_utils::prelude::assert_eq;

    #[tokio::test]
    async fn install_and_missing_sets() {
        let local = Arc::new(MockProvider::local("disk").with_package(
            "App",
            "1.0.0",
            &[("Json", "1.0"), ("Http", "2.0"), ("Gone", "3.0")],
        ));
        let remote = Arc::new(
            MockProvider::http("feed")
                .with_package("Json", "1.0.0", &[])
                .with_package("Http", "2.0.0", &[("Json", "1.0"), ("Lost", "1.0")]),
        );
        let context = context(&local, &remote);
        let walker = RemoteDependencyWalker::new(Arc::clone(&context));

        let graphs = walker
            .walk_all([
                (LibraryName::new("App"), version("1.0.0"), TargetPlatform::new("net8.0")),
                (LibraryName::new("App"), version("1.0.0"), TargetPlatform::new("net48")),
            ])
            .await
            .unwrap();
        let results = RemoteResolveResults::collect(&context, &graphs);

        let mut install: Vec<_> = results.install.iter().map(|i| i.key.to_string()).collect();
        install.sort();
        assert_eq!(install, vec!["Http 2.0.0", "Json 1.0.0"]);

        let mut missing: Vec<_> = results.missing.iter().map(ToString::to_string).collect();
        missing.sort();
        assert_eq!(missing, vec!["Gone [3.0.0, )", "Lost [1.0.0, )"]);

        let err = results.missing_error().unwrap();
        assert_eq!(err.code(), ErrorCode::E0101);
    }

    #[tokio::test]
    async fn installed_items_stream_through_their_provider() {
        let local = Arc::new(MockProvider::local("disk"));
        let remote = Arc::new(MockProvider::http("feed").with_package("Json", "1.0.0", &[]));
        let context = context(&local, &remote);
        let walker = RemoteDependencyWalker::new(Arc::clone(&context));

        let graph = walker
            .walk("Json", version("1.0.0"), &TargetPlatform::any())
            .await
            .unwrap();
        let results = RemoteResolveResults::collect(&context, [&graph]);
        assert_eq!(results.install.len(), 1);

        let mut payload: Vec<u8> = Vec::new();
        results.install[0]
            .data
            .matched
            .copy_to(&mut payload)
            .await
            .unwrap();
        assert_eq!(payload, b"Json 1.0.0");
    }
}
