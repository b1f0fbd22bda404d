//! Tracing subscriber bootstrap.
//!
//! Library code only emits `tracing` events; binaries, benches and tests that
//! want to see them call [`init`] once.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` directives take precedence over `level`. When `json` is set
/// events are written as one JSON object per line. Calling this more than
/// once is harmless; later calls leave the first subscriber in place.
pub fn init(level: Level, json: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.without_time().try_init()
    };

    if result.is_err() {
        tracing::trace!("tracing subscriber already installed");
    }
}

/// Map a `-v` style verbosity count to a level.
#[must_use]
pub const fn level_for_verbosity(verbose: u8, quiet: bool) -> Level {
    match verbose {
        0 if quiet => Level::ERROR,
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
