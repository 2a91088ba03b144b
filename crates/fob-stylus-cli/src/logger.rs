//! Logging setup built on `tracing-subscriber`.
//!
//! ```rust,no_run
//! use fob_stylus_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("Walking imports");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "fob_stylus=debug,fob_stylus_cli=debug";
const QUIET_FILTER: &str = "fob_stylus=error,fob_stylus_cli=error";
const DEFAULT_FILTER: &str = "fob_stylus=warn,fob_stylus_cli=info";

/// Initialize the global subscriber.
///
/// Level selection, first match wins:
/// 1. `verbose`: DEBUG for fob-stylus crates
/// 2. `quiet`: ERROR only
/// 3. `RUST_LOG`
/// 4. WARN for the library, INFO for the CLI
///
/// Logs go to stderr so rendered output on stdout stays clean.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = filter_for(verbose, quiet);

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}
