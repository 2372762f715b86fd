//! Tracing subscriber setup for embedding binaries.

use tracing::Level;
use tracing_subscriber::prelude::*;

/// Installs a stdout subscriber at INFO with `RUST_LOG` overrides. Repeat
/// calls are ignored so tests can install it freely.
pub fn init_tracing() {
    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .try_init();
}
