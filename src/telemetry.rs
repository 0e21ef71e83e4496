//! Tracing bootstrap for binaries and long-running hosts.
//!
//! Library code only emits through `tracing`; installing a subscriber is
//! the host's decision. `init` is a convenience for hosts that want the
//! conventional env-filtered setup.

use tracing_subscriber::EnvFilter;

/// Installs a formatted subscriber filtered by `RUST_LOG`, defaulting to
/// `storyflow=info`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storyflow=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
