//! Testing utilities for Trellis.
//!
//! # Modules
//!
//! - [`fixtures`]: Named package sets for common resolution scenarios
//! - [`generators`]: Seeded random registries for benchmarks
//! - [`mock_provider`]: Scripted async provider with call accounting
//! - [`assertions`]: Graph and resolution assertions
//! - [`proptest_strategies`]: Proptest strategies for versions and ranges
//!
//! # Example
//!
//! ```rust
//! use trellis_core::TargetPlatform;
//! use trellis_resolver::{ResolverConfig, resolve_local};
//! use trellis_test_utils::prelude::*;
//!
//! let walker = Fixtures::walker([Fixtures::web_app()]);
//! let resolution = resolve_local(
//!     &walker,
//!     "App",
//!     version("1.0.0"),
//!     &TargetPlatform::any(),
//!     &ResolverConfig::default(),
//! )
//! .unwrap();
//! assert_dependencies_first(&resolution);
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod assertions;
pub mod fixtures;
pub mod generators;
pub mod mock_provider;
pub mod proptest_strategies;

/// Re-export commonly used testing utilities.
pub mod prelude {
    pub use crate::assertions::*;
    pub use crate::fixtures::{Fixtures, dep, version};
    pub use crate::generators::{RegistryShape, generate_mock, generate_store};
    pub use crate::mock_provider::MockProvider;

    pub use pretty_assertions::{assert_eq, assert_ne};
}
