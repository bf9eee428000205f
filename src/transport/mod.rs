//! HTTP/1.1 transport subsystem.
//!
//! # Data Flow
//! ```text
//! Route (from pool lease without a connection):
//!     → proxy.rs (swap in the ambient proxy unless no_proxy matches)
//!     → connector.rs (resolve, TCP connect, TLS for https; all under the
//!       connect timeout; then the HTTP/1.1 handshake)
//!     → tls.rs (root store and rustls config, built once at start)
//!     → Connection handed to the lease
//!
//! Request on a leased connection:
//!     → dispatch.rs (ready, send, read body; socket timeout per wait)
//!     → failure.rs (hyper/io errors → ClientError)
//! ```
//!
//! # Design Decisions
//! - One in-flight request per connection; HTTP/1.1 only
//! - Connection drivers are plain Tokio tasks tied to client shutdown

pub mod connector;
pub(crate) mod dispatch;
pub(crate) mod failure;
pub mod proxy;
pub mod timeouts;
pub mod tls;

pub use connector::{Connection, ConnectionId, Connector};
pub use proxy::ProxySettings;
