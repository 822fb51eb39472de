//! Structured logging setup.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn,uplink=info";
const VERBOSE_FILTER: &str = "info,uplink=debug";

/// Resolve the active filter directives.
///
/// `RUST_LOG` wins when it is set and parses; otherwise `verbose` selects
/// between the default and the debug-level filter.
pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            VERBOSE_FILTER
        } else {
            DEFAULT_FILTER
        })
    })
}

/// Install the global subscriber, writing to stderr so stdout stays
/// reserved for command output.
///
/// Calling this twice is harmless; the second install is ignored.
pub fn init_logging(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
