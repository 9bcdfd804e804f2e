//! Tracing setup for the hosting process.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Default filter: info everywhere, debug for our own crates.
const DEFAULT_FILTER: &str = "info,portal_server=debug,portal_accessibility=debug,portal_vision=debug";

/// Install the global tracing subscriber.
///
/// `PORTAL_LOG` overrides the filter with standard env-filter syntax.
/// Calling twice is an error (the global subscriber is set once per
/// process); tests that want logs should call [`init_for_tests`].
pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_env("PORTAL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

/// Best-effort init for tests; repeated calls are no-ops.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(DEFAULT_FILTER))
        .with_test_writer()
        .try_init();
}
