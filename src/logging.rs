//! Logging configuration for the Conduit client.
//!
//! Logs always go to stderr so that query results printed on stdout can be
//! piped without interleaved progress lines.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

/// Filter used when `--verbose` is passed.
const VERBOSE_FILTER: &str = "debug";

/// Initializes logging to stderr.
///
/// `RUST_LOG` always wins; otherwise `verbose` selects between `info` and `debug`.
pub fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the env filter, falling back to the verbosity-derived default.
fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directive(verbose)))
}

fn filter_directive(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    }
}
