//! Structured logging to stderr, which Spin collects per component

use tracing_subscriber::EnvFilter;

const FALLBACK_FILTER: &str = "info";

/// Install the global subscriber once per component instance
pub fn init(directive: &str) {
    let (filter, invalid) = match EnvFilter::try_new(directive) {
        Ok(filter) => (filter, false),
        Err(_) => (EnvFilter::new(FALLBACK_FILTER), true),
    };

    // Later calls in the same instance are no-ops
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init()
        .is_ok();

    if installed && invalid {
        tracing::warn!(directive, "invalid log_level, using '{FALLBACK_FILTER}'");
    }
}
