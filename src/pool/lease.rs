//! Pool leases.
//!
//! # Responsibilities
//! - Hold the per-route and global permits for the duration of one request
//! - Carry the pooled connection, if any
//! - Return the connection to the pool or discard it on drop

use std::fmt;
use std::sync::Arc;

use tokio::sync::OwnedSemaphorePermit;

use crate::pool::manager::{PoolInner, Poolable};
use crate::pool::route::Route;

/// A RAII grant from the pool.
///
/// A lease starts either with an idle connection for its route or empty, in
/// which case the holder opens a connection and [`attach`](Lease::attach)es it.
/// On drop the connection goes back to the idle set only if the lease was
/// [`release`](Lease::release)d and the connection is still open; otherwise it
/// is discarded. The permits are given back after that, so a waiter woken by
/// them finds the idle connection.
pub struct Lease<C: Poolable> {
    pool: Arc<PoolInner<C>>,
    route: Route,
    conn: Option<C>,
    reused: bool,
    reusable: bool,
    route_permit: Option<OwnedSemaphorePermit>,
    global_permit: Option<OwnedSemaphorePermit>,
}

impl<C: Poolable> Lease<C> {
    pub(crate) fn new(
        pool: Arc<PoolInner<C>>,
        route: Route,
        conn: Option<C>,
        route_permit: OwnedSemaphorePermit,
        global_permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            pool,
            route,
            reused: conn.is_some(),
            conn,
            reusable: false,
            route_permit: Some(route_permit),
            global_permit: Some(global_permit),
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Whether the current connection was taken from the idle set.
    pub fn is_reused(&self) -> bool {
        self.reused && self.conn.is_some()
    }

    pub fn connection(&self) -> Option<&C> {
        self.conn.as_ref()
    }

    pub fn connection_mut(&mut self) -> Option<&mut C> {
        self.conn.as_mut()
    }

    /// Store a freshly opened connection in this lease.
    pub fn attach(&mut self, conn: C) -> &mut C {
        self.reused = false;
        self.conn.insert(conn)
    }

    /// Take the connection out of the lease, keeping the permits.
    pub fn detach(&mut self) -> Option<C> {
        self.conn.take()
    }

    /// Evict idle connections of other routes so opening one more stays
    /// within the global cap.
    pub fn make_room(&self) {
        self.pool.make_room(&self.route);
    }

    /// Hand the connection back for reuse.
    pub fn release(mut self) {
        self.reusable = true;
    }

    /// Close the connection instead of returning it.
    pub fn discard(mut self) {
        self.reusable = false;
    }
}

impl<C: Poolable> Drop for Lease<C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if self.reusable && conn.is_open() {
                self.pool.put_idle(&self.route, conn);
            } else {
                tracing::trace!(route = %self.route, "Discarding pooled connection");
                drop(conn);
            }
        }

        // Permits go back only after the connection is idle again.
        self.route_permit.take();
        self.global_permit.take();
        self.pool.forget_if_unused(&self.route);
    }
}

impl<C: Poolable> fmt::Debug for Lease<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("route", &self.route)
            .field("connected", &self.conn.is_some())
            .field("reused", &self.reused)
            .field("reusable", &self.reusable)
            .finish()
    }
}
