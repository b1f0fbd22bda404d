//! Error types for Trellis operations.
//!
//! Each error has:
//! - A unique error code (e.g., E0101) for easy reference and searching
//! - A clear error message explaining what went wrong
//! - Suggestions for how to fix the issue

use std::fmt;
use thiserror::Error;

/// Error codes for Trellis errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Package errors (E01xx)
    /// One or more requested libraries could not be found
    E0101,

    // Resolution errors (E02xx)
    /// Conflict resolution did not converge
    E0201,
    /// Circular dependency detected
    E0202,

    // Provider errors (E03xx)
    /// A dependency provider failed
    E0301,
    /// A dependency provider timed out
    E0302,

    // Input errors (E04xx)
    /// Invalid version or version range
    E0404,

    // Configuration errors (E11xx)
    /// Invalid configuration
    E1101,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0201 => "E0201",
            Self::E0202 => "E0202",
            Self::E0301 => "E0301",
            Self::E0302 => "E0302",
            Self::E0404 => "E0404",
            Self::E1101 => "E1101",
        }
    }

    /// Get a brief title for this error code.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::E0101 => "Package not found",
            Self::E0201 => "Resolution failed",
            Self::E0202 => "Circular dependency",
            Self::E0301 => "Provider error",
            Self::E0302 => "Provider timeout",
            Self::E0404 => "Invalid version range",
            Self::E1101 => "Invalid configuration",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for Trellis.
#[derive(Error, Debug)]
pub enum Error {
    /// One or more libraries could not be located by any provider.
    #[error("[{code}] unable to locate {}", .requested.join(", "))]
    PackageNotFound {
        /// Error code.
        #[source]
        code: ErrorCodeSource,
        /// Library names that were not found.
        names: Vec<String>,
        /// Requested ranges as written (`name range`).
        requested: Vec<String>,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// Dependency resolution failed.
    #[error("[{code}] resolution failed: {message}")]
    Resolution {
        /// Error code.
        #[source]
        code: ErrorCodeSource,
        /// Error message.
        message: String,
        /// Packages that were still undecided.
        conflicting_packages: Vec<String>,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// Circular dependency.
    #[error("[{code}] circular dependency detected: {cycle}")]
    CircularDependency {
        /// Error code.
        #[source]
        code: ErrorCodeSource,
        /// The dependency cycle.
        cycle: String,
        /// Packages involved.
        packages: Vec<String>,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// Dependency provider failure.
    #[error("[{code}] provider error: {message}")]
    Provider {
        /// Error code.
        #[source]
        code: ErrorCodeSource,
        /// Library being looked up when the provider failed.
        library: Option<String>,
        /// Error message.
        message: String,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// Version or version range could not be parsed.
    #[error("[{code}] invalid version '{input}': {message}")]
    InvalidVersion {
        /// Error code.
        #[source]
        code: ErrorCodeSource,
        /// The rejected input.
        input: String,
        /// Error message.
        message: String,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// Configuration error.
    #[error("[{code}] config error: {message}")]
    Config {
        /// Error code.
        #[source]
        code: ErrorCodeSource,
        /// Error message.
        message: String,
        /// Configuration key.
        key: Option<String>,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },
}

/// Wrapper to make `ErrorCode` usable as a source.
#[derive(Debug)]
pub struct ErrorCodeSource(pub ErrorCode);

impl fmt::Display for ErrorCodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_str())
    }
}

impl std::error::Error for ErrorCodeSource {}

impl Error {
    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::PackageNotFound { code, .. }
            | Self::Resolution { code, .. }
            | Self::CircularDependency { code, .. }
            | Self::Provider { code, .. }
            | Self::InvalidVersion { code, .. }
            | Self::Config { code, .. } => code.0,
        }
    }

    /// Get suggestions for fixing this error.
    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::PackageNotFound { suggestions, .. }
            | Self::Resolution { suggestions, .. }
            | Self::CircularDependency { suggestions, .. }
            | Self::Provider { suggestions, .. }
            | Self::InvalidVersion { suggestions, .. }
            | Self::Config { suggestions, .. } => suggestions,
        }
    }

    /// Create a not-found error for a set of unresolved `(name, range)` pairs.
    ///
    /// An empty range string means the request carried no version constraint.
    #[must_use]
    pub fn packages_not_found(missing: Vec<(String, String)>) -> Self {
        let mut names = Vec::with_capacity(missing.len());
        let mut requested = Vec::with_capacity(missing.len());
        for (name, range) in missing {
            requested.push(if range.is_empty() {
                format!("'{name}'")
            } else {
                format!("'{name} {range}'")
            });
            names.push(name);
        }
        let mut suggestions = vec![
            "Check the library names for typos".to_string(),
            "Verify that the configured sources contain the requested versions".to_string(),
        ];
        if names.len() == 1 {
            suggestions.push(format!("Widen the version range requested for {}", names[0]));
        }
        Self::PackageNotFound {
            code: ErrorCodeSource(ErrorCode::E0101),
            names,
            requested,
            suggestions,
        }
    }

    /// Create a resolution error with context.
    #[must_use]
    pub fn resolution(message: impl Into<String>, conflicting: Vec<String>) -> Self {
        let message = message.into();
        let mut suggestions = vec![
            "Pin the conflicting libraries to a single version at the root".to_string(),
        ];
        if !conflicting.is_empty() {
            suggestions.insert(0, format!("Undecided libraries: {}", conflicting.join(", ")));
        }
        Self::Resolution {
            code: ErrorCodeSource(ErrorCode::E0201),
            message,
            conflicting_packages: conflicting,
            suggestions,
        }
    }

    /// Create a circular dependency error from the chain of library names.
    ///
    /// The chain starts at the outermost library and ends with the name that
    /// closed the loop.
    #[must_use]
    pub fn circular_dependency(packages: Vec<String>) -> Self {
        let cycle = packages.join(" -> ");
        Self::CircularDependency {
            code: ErrorCodeSource(ErrorCode::E0202),
            cycle,
            packages,
            suggestions: vec![
                "Review the dependency chain for the listed packages".to_string(),
                "Circular references are not supported when resolving from remote sources"
                    .to_string(),
            ],
        }
    }

    /// Create a provider error.
    ///
    /// Messages mentioning a timeout are classified as E0302.
    #[must_use]
    pub fn provider(message: impl Into<String>, library: Option<String>) -> Self {
        let message = message.into();
        let timed_out = message.contains("timed out");
        let mut suggestions = vec!["Check that every configured source is reachable".to_string()];
        if let Some(ref name) = library {
            suggestions.push(format!("Retry the lookup for {name}"));
        }
        if timed_out {
            suggestions.push(
                "Raise the provider timeout with TRELLIS_PROVIDER_TIMEOUT_MS".to_string(),
            );
        }
        Self::Provider {
            code: ErrorCodeSource(if timed_out {
                ErrorCode::E0302
            } else {
                ErrorCode::E0301
            }),
            library,
            message,
            suggestions,
        }
    }

    /// Create an invalid version error.
    #[must_use]
    pub fn invalid_version(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidVersion {
            code: ErrorCodeSource(ErrorCode::E0404),
            input: input.into(),
            message: message.into(),
            suggestions: vec![
                "Use 1.2.3, [1.0, 2.0), 1.* or 1.0.0-* style ranges".to_string(),
            ],
        }
    }

    /// Create a config error for a specific key.
    #[must_use]
    pub fn config(message: impl Into<String>, key: Option<String>) -> Self {
        let message = message.into();
        let mut suggestions = vec!["Check your resolver configuration for errors".to_string()];
        if let Some(ref k) = key {
            suggestions.push(format!("Unset or correct {k}"));
        }
        Self::Config {
            code: ErrorCodeSource(ErrorCode::E1101),
            message,
            key,
            suggestions,
        }
    }

    /// Format the error with suggestions for display.
    #[must_use]
    pub fn display_with_suggestions(&self) -> String {
        let mut output = format!("{self}");
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\n\nSuggestions:");
            for suggestion in suggestions {
                output.push_str(&format!("\n  - {suggestion}"));
            }
        }
        output.push_str(&format!("\n\n{}: {}", self.code(), self.code().title()));
        output
    }
}

/// Result type for Trellis operations.
pub type Result<T> = std::result::Result<T, Error>;
