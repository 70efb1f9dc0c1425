//! Diagnostic logging setup.
//!
//! Logs go to stderr so they never mix with replies printed on stdout.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directive for the given CLI verbosity.
///
/// `-q` shows errors only, the default shows warnings, `-v` debug and
/// `-vv` trace for this crate.
pub fn directive(quiet: bool, verbosity: u8) -> &'static str {
    match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "warn,clonevoice=debug",
        (false, _) => "warn,clonevoice=trace",
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over flags.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init(quiet: bool, verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(quiet, verbosity)));

    if tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(verbosity >= 2)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}
