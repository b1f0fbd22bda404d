//! Core types and utilities for the Trellis dependency resolver.
//!
//! This crate provides foundational pieces used throughout Trellis:
//! - Error types with stable error codes and suggestions
//! - Target platform monikers handed to dependency providers
//! - Tracing subscriber bootstrap

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod logging;
mod platform;

pub use error::{Error, ErrorCode, Result};
pub use platform::TargetPlatform;

// Re-export commonly used types
pub use ahash::{AHashMap, AHashSet};
pub use dashmap::DashMap;
pub use parking_lot::{Mutex, RwLock};

/// Global allocator using mimalloc for high performance.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
