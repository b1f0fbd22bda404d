//! Target platform monikers.
//!
//! A target platform names the runtime a dependency graph is resolved for
//! (for example `net8.0` or `netstandard2.0`). Providers use it to pick the
//! dependency group that applies; the resolver itself treats it as opaque.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An opaque, case-insensitive target platform moniker.
#[derive(Clone)]
pub struct TargetPlatform {
    moniker: Arc<str>,
}

impl TargetPlatform {
    /// Platform used when a walk is not tied to any particular runtime.
    pub const ANY: &'static str = "any";

    /// Create a platform from its moniker.
    #[must_use]
    pub fn new(moniker: impl AsRef<str>) -> Self {
        Self {
            moniker: Arc::from(moniker.as_ref().trim()),
        }
    }

    /// The platform-neutral moniker.
    #[must_use]
    pub fn any() -> Self {
        Self::new(Self::ANY)
    }

    /// Get the moniker as written.
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.moniker
    }

    /// Check if this is the platform-neutral moniker.
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.moniker.eq_ignore_ascii_case(Self::ANY)
    }
}

impl Default for TargetPlatform {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Debug for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TargetPlatform").field(&self.moniker).finish()
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.moniker)
    }
}

impl PartialEq for TargetPlatform {
    fn eq(&self, other: &Self) -> bool {
        self.moniker.eq_ignore_ascii_case(&other.moniker)
    }
}

impl Eq for TargetPlatform {}

impl Hash for TargetPlatform {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.moniker.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        state.write_usize(self.moniker.len());
    }
}

impl From<&str> for TargetPlatform {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Serialize for TargetPlatform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.moniker)
    }
}

impl<'de> Deserialize<'de> for TargetPlatform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(s))
    }
}
