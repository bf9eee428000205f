//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global subscriber for the binary
//!
//! # Design Decisions
//! - The library only emits `tracing` events; it never installs a subscriber
//! - Log level configurable via `RUST_LOG`, falling back to a default filter

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a fmt subscriber filtered by `RUST_LOG` or `default_filter`.
pub fn init(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
