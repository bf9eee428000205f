//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Executor, pool and classifier produce:
//!     → tracing events (structured fields, `client` span per request)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber (binary only)
//!     → any `metrics` recorder installed by the embedding application
//! ```
//!
//! # Design Decisions
//! - Every event and metric carries the client id
//! - Oversized responses are a warning, never an error

pub mod logging;
pub mod metrics;
