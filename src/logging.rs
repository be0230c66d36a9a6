//! Diagnostic logging to stderr. Progress output goes to stdout separately.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,image_localizer=info";

/// Installs the global subscriber; `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // Fails only if a subscriber is already set, in which case that one stays.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
