//! Logging setup for the factmine CLI.
//!
//! Library code logs through `tracing` macros; the binary installs a
//! `tracing-subscriber` fmt layer writing to stderr, so artifacts and the
//! run summary on stdout stay clean.
//!
//! Level selection, first match wins:
//! 1. `--verbose`: debug for factmine
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`
//! 4. warnings for factmine

use std::io;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Call once, before any logging.
pub fn init_logger(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("factmine=debug")
    } else if quiet {
        EnvFilter::new("factmine=error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("factmine=warn"))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);

    // A subscriber installed earlier (tests, embedding) wins.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
