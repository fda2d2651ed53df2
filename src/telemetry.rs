//! src/telemetry.rs
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Calling this
/// again once a subscriber is installed is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_target(false),
        )
        .try_init();
}
