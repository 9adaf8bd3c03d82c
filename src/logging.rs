//! Logging setup
//!
//! Diagnostics go to stderr through `tracing`; command results stay on
//! stdout. `RUST_LOG` takes precedence over the verbosity flags.

use tracing_subscriber::{fmt, EnvFilter};

/// Filter directive for the given verbosity flags
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// Initialize the global subscriber
///
/// # Environment variables
/// - `RUST_LOG`: overrides the level derived from `-v`/`-q`,
///   e.g. `RUST_LOG=pcbpop::core::library=debug`
pub fn init(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 0)
        .without_time()
        .try_init();
}

/// Initialize logging for tests, capturing output per test
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
