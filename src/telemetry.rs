//! Structured logging setup.
//!
//! Log level is controlled via `RUST_LOG` (default `larder=info`). The sync
//! engine logs swallowed failures at `warn` and per-operation progress at
//! `debug`, so diagnostics never depend on errors reaching the caller.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber. Call once from the binary;
/// a second call is a no-op rather than a panic.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("larder=info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}
