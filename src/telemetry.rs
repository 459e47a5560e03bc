//! Tracing setup helpers.
//!
//! The library itself only emits `tracing` events (subscription changes at
//! debug, dispatches at trace, degraded operations at warn); embedding
//! applications bring their own subscriber. [`init`] is a convenience for
//! binaries and demos that just want formatted output honoring `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a formatted stderr subscriber filtered by `RUST_LOG`, defaulting
/// to `info` when the variable is unset or invalid.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
