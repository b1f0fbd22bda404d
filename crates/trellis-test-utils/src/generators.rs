//! Random package registries for benchmarks and stress tests.
//!
//! Package `i` only depends on packages with a higher index, so generated
//! registries never contain cycles and are safe for the remote walker.

use crate::mock_provider::MockProvider;
use rand::prelude::*;
use trellis_resolver::{LibraryDependency, PackageStore, Version, VersionRange};

/// Shape of a generated registry.
#[derive(Debug, Clone, Copy)]
pub struct RegistryShape {
    /// Number of package names.
    pub packages: usize,
    /// Versions per package.
    pub versions: usize,
    /// Dependencies declared by each version.
    pub dependencies: usize,
    /// RNG seed.
    pub seed: u64,
}

impl RegistryShape {
    /// A shape with a fixed seed.
    #[must_use]
    pub const fn new(packages: usize, versions: usize, dependencies: usize) -> Self {
        Self {
            packages,
            versions,
            dependencies,
            seed: 42,
        }
    }
}

/// Name of the `index`th generated package.
#[must_use]
pub fn package_name(index: usize) -> String {
    format!("Pkg{index:04}")
}

/// Version of the `index`th release of every generated package.
#[must_use]
pub fn release_version(index: usize) -> Version {
    Version::new(1 + (index / 10) as u64, (index % 10) as u64, 0)
}

fn plan(shape: RegistryShape) -> Vec<(String, Version, Vec<(String, VersionRange)>)> {
    let mut rng = StdRng::seed_from_u64(shape.seed);
    let mut plan = Vec::with_capacity(shape.packages * shape.versions);

    for package in 0..shape.packages {
        for release in 0..shape.versions {
            let mut dependencies: Vec<(String, VersionRange)> = Vec::new();
            if package + 1 < shape.packages {
                for _ in 0..shape.dependencies {
                    let target = rng.gen_range(package + 1..shape.packages);
                    let floor = release_version(rng.gen_range(0..shape.versions));
                    let name = package_name(target);
                    if dependencies.iter().all(|(n, _)| *n != name) {
                        dependencies.push((name, VersionRange::pinned(floor)));
                    }
                }
            }
            plan.push((package_name(package), release_version(release), dependencies));
        }
    }
    plan
}

/// Generate an in-memory [`PackageStore`].
#[must_use]
pub fn generate_store(shape: RegistryShape) -> PackageStore {
    let store = PackageStore::new("generated");
    for (name, version, dependencies) in plan(shape) {
        store.add(
            name.as_str(),
            version,
            dependencies
                .into_iter()
                .map(|(name, range)| LibraryDependency::new(name.as_str(), range)),
        );
    }
    store
}

/// Generate a [`MockProvider`] with the same contents as [`generate_store`].
#[must_use]
pub fn generate_mock(shape: RegistryShape, is_http: bool) -> MockProvider {
    let provider = if is_http {
        MockProvider::http("generated")
    } else {
        MockProvider::local("generated")
    };
    for (name, version, dependencies) in plan(shape) {
        let ranges: Vec<(String, String)> = dependencies
            .into_iter()
            .map(|(name, range)| (name, range.to_string()))
            .collect();
        let borrowed: Vec<(&str, &str)> = ranges
            .iter()
            .map(|(n, r)| (n.as_str(), r.as_str()))
            .collect();
        provider.add(&name, &version.to_string(), &borrowed);
    }
    provider
}
