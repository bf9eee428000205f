//! HTTP request/response model.
//!
//! # Data Flow
//! ```text
//! Caller builds Request (method, uri, headers, body)
//!     → request.rs (target label, wire form for a route)
//!     → transport dispatch
//!     → response.rs (status, headers, buffered body)
//!     → classify.rs (success vs remote server error, size advisory)
//! ```

pub mod classify;
pub mod request;
pub mod response;

pub use classify::{ResponseClassifier, WARN_AT_BODY_SIZE};
pub use request::Request;
pub use response::Response;
