//! Connection pooling subsystem.
//!
//! # Data Flow
//! ```text
//! Request URI
//!     → route.rs (scheme + host + port, optional proxy)
//!     → manager.rs (wait for a per-route and a global permit, FIFO)
//!         - idle connection for the route → reuse
//!         - none idle → caller opens one (after evicting other routes' idle
//!           connections if the global cap would be exceeded)
//!     → lease.rs (RAII grant; returned or discarded on drop)
//! ```
//!
//! # Design Decisions
//! - Caps bound concurrent leases; semaphores serve waiters in order
//! - The acquisition wait is bounded; a timed-out waiter leaves no trace
//! - Idle sets live behind one mutex; connections are dropped outside it
//! - Generic over the connection type so the pool is testable without sockets

pub mod lease;
pub mod manager;
pub mod route;

pub use lease::Lease;
pub use manager::{ConnectionPool, PoolError, PoolLimits, PoolStats, Poolable, RouteStats};
pub use route::{Endpoint, Route, RouteError};
