//! Client subsystem.
//!
//! # Data Flow
//! ```text
//! Caller thread:
//!     HttpClient::execute / perform
//!     → spawn on the I/O runtime, block on a oneshot reply
//!
//! I/O runtime:
//!     executor.rs (route → pool lease → connect if needed → dispatch)
//!     → reply sent back
//!
//! Caller thread again:
//!     → ResponseClassifier (5xx → failure, oversized body → warning)
//!     → exactly one continuation runs
//! ```

pub mod blocking;
pub mod executor;

pub use blocking::HttpClient;
pub use executor::RequestExecutor;
