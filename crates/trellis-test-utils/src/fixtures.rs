//! Pre-built package sets for common resolution scenarios.

use std::sync::Arc;
use trellis_resolver::{
    DependencyProvider, DependencyWalker, LibraryDependency, PackageStore, Version, VersionRange,
};

/// Build a dependency from range notation.
///
/// # Panics
/// Panics if `range` does not parse.
#[must_use]
pub fn dep(name: &str, range: &str) -> LibraryDependency {
    LibraryDependency::new(name, VersionRange::parse(range).unwrap())
}

/// Parse a version.
///
/// # Panics
/// Panics if `version` does not parse.
#[must_use]
pub fn version(version: &str) -> Version {
    Version::parse(version).unwrap()
}

/// Collection of pre-built package sets.
#[derive(Debug)]
pub struct Fixtures;

impl Fixtures {
    /// `App` needs `Http` and `Json`; `Http` needs `Json` too.
    ///
    /// ```text
    /// App 1.0.0
    /// ├── Http [2.0.0, )
    /// │   └── Json [1.5.0, )
    /// └── Json [1.0.0, )
    /// ```
    #[must_use]
    pub fn web_app() -> PackageStore {
        let store = PackageStore::new("web-app");
        store.add(
            "App",
            version("1.0.0"),
            [dep("Http", "2.0"), dep("Json", "1.0")],
        );
        store.add("Http", version("2.0.0"), [dep("Json", "1.5")]);
        store.add("Json", version("1.0.0"), []);
        store.add("Json", version("1.5.0"), []);
        store
    }

    /// Cousins `B` and `C` disagree on `D`.
    ///
    /// ```text
    /// A 1.0.0
    /// ├── B [1.0.0, )  -> D [1.0.0, )
    /// └── C [1.0.0, )  -> D [2.0.0, )
    /// ```
    #[must_use]
    pub fn cousins() -> PackageStore {
        let store = PackageStore::new("cousins");
        store.add("A", version("1.0.0"), [dep("B", "1.0"), dep("C", "1.0")]);
        store.add("B", version("1.0.0"), [dep("D", "1.0")]);
        store.add("C", version("1.0.0"), [dep("D", "2.0")]);
        store.add("D", version("1.0.0"), []);
        store.add("D", version("2.0.0"), []);
        store
    }

    /// A version that loses a conflict drags its own dependencies with it.
    ///
    /// `X 1.0.0` is beaten by `X 2.0.0`, so its `Z 1.0.0` must go and
    /// `Z 2.0.0` reached through `Y` must stay.
    ///
    /// ```text
    /// A 1.0.0
    /// ├── B  -> X [1.0.0, ) -> Z [1.0.0, )
    /// ├── C  -> X [2.0.0, )
    /// └── Y  -> Z [2.0.0, )
    /// ```
    #[must_use]
    pub fn dragged_conflict() -> PackageStore {
        let store = PackageStore::new("dragged");
        store.add(
            "A",
            version("1.0.0"),
            [dep("B", "1.0"), dep("C", "1.0"), dep("Y", "1.0")],
        );
        store.add("B", version("1.0.0"), [dep("X", "1.0")]);
        store.add("C", version("1.0.0"), [dep("X", "2.0")]);
        store.add("Y", version("1.0.0"), [dep("Z", "2.0")]);
        store.add("X", version("1.0.0"), [dep("Z", "1.0")]);
        store.add("X", version("2.0.0"), []);
        store.add("Z", version("1.0.0"), []);
        store.add("Z", version("2.0.0"), []);
        store
    }

    /// `A -> B -> C -> A`.
    #[must_use]
    pub fn cycle() -> PackageStore {
        let store = PackageStore::new("cycle");
        store.add("A", version("1.0.0"), [dep("B", "1.0")]);
        store.add("B", version("1.0.0"), [dep("C", "1.0")]);
        store.add("C", version("1.0.0"), [dep("A", "1.0")]);
        store
    }

    /// A local walker over the given stores, asked in order.
    #[must_use]
    pub fn walker(stores: impl IntoIterator<Item = PackageStore>) -> DependencyWalker {
        DependencyWalker::new(
            stores
                .into_iter()
                .map(|store| Arc::new(store) as Arc<dyn DependencyProvider>),
        )
    }
}
