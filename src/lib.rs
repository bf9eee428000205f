//! Pooled, blocking HTTP/1.1 client library.
//!
//! ```text
//!  caller thread ──▶ HttpClient ──▶ I/O runtime: executor ──▶ pool ──▶ transport ──▶ server
//!        ▲                                                                      │
//!        └──── continuation ◀── ResponseClassifier ◀── reply ◀──────────────────┘
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod outcome;
pub mod pool;
pub mod transport;

pub use client::HttpClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, StartError, TimeoutPhase, TransportErrorKind};
pub use http::{Request, Response};
pub use outcome::Outcome;
