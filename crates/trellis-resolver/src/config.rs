//! Resolver configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use trellis_core::{Error, Result};

/// Environment variables read by [`ResolverConfig::from_env`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolverEnvVar {
    /// `TRELLIS_MAX_CONFLICT_PASSES` - conflict resolution pass limit.
    MaxConflictPasses,
    /// `TRELLIS_PROVIDER_TIMEOUT_MS` - per-call provider timeout.
    ProviderTimeoutMs,
    /// `TRELLIS_MAX_CONCURRENT_LOOKUPS` - in-flight provider call limit.
    MaxConcurrentLookups,
}

impl ResolverEnvVar {
    /// Get the environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaxConflictPasses => "TRELLIS_MAX_CONFLICT_PASSES",
            Self::ProviderTimeoutMs => "TRELLIS_PROVIDER_TIMEOUT_MS",
            Self::MaxConcurrentLookups => "TRELLIS_MAX_CONCURRENT_LOOKUPS",
        }
    }
}

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Conflict resolution gives up after this many passes.
    pub max_conflict_passes: usize,
    /// Timeout applied to every remote walk provider call.
    pub provider_timeout: Option<Duration>,
    /// Maximum concurrent provider calls during a remote walk.
    pub max_concurrent_lookups: usize,
    /// Short-circuit exact identities of resolved non-floating ranges.
    pub cache_identities: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_conflict_passes: 1000,
            provider_timeout: None,
            max_concurrent_lookups: 32,
            cache_identities: true,
        }
    }
}

impl ResolverConfig {
    /// Defaults overridden by `TRELLIS_*` environment variables.
    ///
    /// # Errors
    /// Returns a config error if a variable is set but not a number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var.as_str()).ok())
    }

    /// Defaults overridden by values from `lookup`.
    ///
    /// # Errors
    /// Returns a config error if a value is set but not a number.
    pub fn from_lookup(lookup: impl Fn(ResolverEnvVar) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(passes) = parse_var(&lookup, ResolverEnvVar::MaxConflictPasses)? {
            config.max_conflict_passes = passes;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ResolverEnvVar::ProviderTimeoutMs)? {
            config.provider_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(lookups) = parse_var(&lookup, ResolverEnvVar::MaxConcurrentLookups)? {
            config.max_concurrent_lookups = lookups;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the walkers cannot run with.
    ///
    /// # Errors
    /// Returns a config error naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.max_conflict_passes == 0 {
            return Err(Error::config(
                "must be greater than zero",
                Some("max_conflict_passes".into()),
            ));
        }
        if self.max_concurrent_lookups == 0 {
            return Err(Error::config(
                "must be greater than zero",
                Some("max_concurrent_lookups".into()),
            ));
        }
        if self.provider_timeout == Some(Duration::ZERO) {
            return Err(Error::config(
                "must be greater than zero",
                Some("provider_timeout".into()),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(ResolverEnvVar) -> Option<String>,
    var: ResolverEnvVar,
) -> Result<Option<T>> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim().parse().map(Some).map_err(|_| {
        Error::config(
            format!("expected a whole number, got '{raw}'"),
            Some(var.as_str().to_string()),
        )
    })
}
