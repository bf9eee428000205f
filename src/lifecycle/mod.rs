//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Start (HttpClient::start):
//!     Validate config → Build I/O runtime → Allocate pool → Ready
//!
//! Stop (HttpClient::stop):
//!     Close pool (wake waiters) → shutdown.rs trigger (connection drivers exit)
//!     → Runtime shutdown, bounded by stop_timeout_ms
//! ```
//!
//! # Design Decisions
//! - Fail fast: an invalid config never produces a client
//! - Stop never hangs; in-flight requests fail instead of being awaited forever

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownListener};
