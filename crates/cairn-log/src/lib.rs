// ABOUTME: Shared logging setup for cairn binaries
// ABOUTME: init() logs to stderr at INFO, overridable through RUST_LOG

use tracing_subscriber::EnvFilter;

/// Standard logging to stderr. Default: INFO level, RUST_LOG override.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}
