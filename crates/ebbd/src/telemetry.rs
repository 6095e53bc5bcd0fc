//! Logging setup for the Ebb daemon.
//!
//! Human-readable `tracing` output on stderr, so `ebbd get` can stream
//! object bytes to stdout. `RUST_LOG` wins over the configured level.

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber. Call once, before any events fire.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
