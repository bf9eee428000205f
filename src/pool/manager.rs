//! Connection pool management.
//!
//! # Responsibilities
//! - Bound concurrent leases per route and across all routes
//! - Queue acquirers FIFO and give up after the acquisition timeout
//! - Keep idle connections per route for reuse
//! - Evict idle connections of other routes when the global cap is reached

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::ClientConfig;
use crate::pool::lease::Lease;
use crate::pool::route::Route;

/// A connection the pool can hold.
pub trait Poolable: Send + 'static {
    /// Whether the connection can still carry a request.
    fn is_open(&self) -> bool;
}

/// Capacity and wait limits of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    pub max_per_route: usize,
    pub max_total: usize,
    /// Zero waits without bound.
    pub acquisition_timeout: Duration,
}

impl From<&ClientConfig> for PoolLimits {
    fn from(config: &ClientConfig) -> Self {
        Self {
            max_per_route: config.max_connections_per_route,
            max_total: config.max_connections_total,
            acquisition_timeout: config.acquisition_timeout(),
        }
    }
}

/// Errors that can occur while acquiring a lease.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("timed out after {} ms waiting for a pooled connection", .0.as_millis())]
    Timeout(Duration),

    #[error("connection pool is closed")]
    Closed,
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Leases currently held.
    pub leased: usize,
    /// Open connections waiting for reuse.
    pub idle: usize,
    /// Acquirers still waiting for a lease.
    pub pending: usize,
    pub max_per_route: usize,
    pub max_total: usize,
}

/// Occupancy of a single route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteStats {
    pub leased: usize,
    pub idle: usize,
}

/// Bounded pool of reusable connections partitioned by route.
pub struct ConnectionPool<C> {
    inner: Arc<PoolInner<C>>,
}

impl<C> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Poolable> std::fmt::Debug for ConnectionPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("stats", &self.stats())
            .finish()
    }
}

pub(crate) struct PoolInner<C> {
    limits: PoolLimits,
    global: Arc<Semaphore>,
    pending: AtomicUsize,
    state: Mutex<PoolState<C>>,
}

struct PoolState<C> {
    routes: HashMap<Route, RouteEntry<C>>,
    idle_total: usize,
    closed: bool,
}

impl<C> PoolState<C> {
    /// Remove the entry of `route` when it has no idle connections and no
    /// lease or waiter still holds its semaphore.
    fn prune(&mut self, route: &Route) {
        let unused = self.routes.get(route).is_some_and(|entry| {
            entry.idle.is_empty() && Arc::strong_count(&entry.permits) == 1
        });
        if unused {
            self.routes.remove(route);
        }
    }
}

struct RouteEntry<C> {
    permits: Arc<Semaphore>,
    /// Oldest first.
    idle: VecDeque<IdleConnection<C>>,
}

impl<C> RouteEntry<C> {
    fn new(max_per_route: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_per_route)),
            idle: VecDeque::new(),
        }
    }
}

struct IdleConnection<C> {
    conn: C,
    since: Instant,
}

/// Counts an acquirer as pending until dropped.
struct Pending<'a>(&'a AtomicUsize);

impl<'a> Pending<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<C: Poolable> ConnectionPool<C> {
    /// Create an empty pool.
    pub fn new(limits: PoolLimits) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                limits,
                global: Arc::new(Semaphore::new(limits.max_total)),
                pending: AtomicUsize::new(0),
                state: Mutex::new(PoolState {
                    routes: HashMap::new(),
                    idle_total: 0,
                    closed: false,
                }),
            }),
        }
    }

    pub fn limits(&self) -> PoolLimits {
        self.inner.limits
    }

    /// Acquire a lease for `route`, waiting at most the acquisition timeout.
    ///
    /// The lease carries the newest open idle connection of the route, or no
    /// connection when none is idle.
    pub async fn acquire(&self, route: &Route) -> Result<Lease<C>, PoolError> {
        let route_permits = self.inner.route_permits(route)?;
        let global = Arc::clone(&self.inner.global);

        let waiting = Pending::enter(&self.inner.pending);
        let permits = async move {
            let route_permit = route_permits
                .acquire_owned()
                .await
                .map_err(|_| PoolError::Closed)?;
            let global_permit = global.acquire_owned().await.map_err(|_| PoolError::Closed)?;
            Ok::<_, PoolError>((route_permit, global_permit))
        };

        let limit = self.inner.limits.acquisition_timeout;
        let granted = if limit.is_zero() {
            permits.await
        } else {
            match tokio::time::timeout(limit, permits).await {
                Ok(granted) => granted,
                Err(_) => Err(PoolError::Timeout(limit)),
            }
        };
        drop(waiting);
        let (route_permit, global_permit) = match granted {
            Ok(permits) => permits,
            Err(e) => {
                self.inner.forget_if_unused(route);
                return Err(e);
            }
        };

        let conn = self.inner.take_idle(route);
        tracing::trace!(route = %route, reused = conn.is_some(), "Lease granted");

        Ok(Lease::new(
            Arc::clone(&self.inner),
            route.clone(),
            conn,
            route_permit,
            global_permit,
        ))
    }

    /// Close the pool: wake every waiter with [`PoolError::Closed`] and drop
    /// all idle connections. Outstanding leases stay valid; their connections
    /// are discarded when dropped.
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn stats(&self) -> PoolStats {
        let idle = self.inner.lock().idle_total;
        PoolStats {
            leased: self.inner.leased(),
            idle,
            pending: self.inner.pending.load(Ordering::SeqCst),
            max_per_route: self.inner.limits.max_per_route,
            max_total: self.inner.limits.max_total,
        }
    }

    pub fn route_stats(&self, route: &Route) -> RouteStats {
        let state = self.inner.lock();
        match state.routes.get(route) {
            Some(entry) => RouteStats {
                leased: self
                    .inner
                    .limits
                    .max_per_route
                    .saturating_sub(entry.permits.available_permits()),
                idle: entry.idle.len(),
            },
            None => RouteStats::default(),
        }
    }
}

impl<C: Poolable> PoolInner<C> {
    fn lock(&self) -> MutexGuard<'_, PoolState<C>> {
        // Nothing panics while holding the lock, so the state is consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called once a lease or waiter has let go of `route`'s semaphore.
    pub(crate) fn forget_if_unused(&self, route: &Route) {
        self.lock().prune(route);
    }

    fn leased(&self) -> usize {
        self.limits
            .max_total
            .saturating_sub(self.global.available_permits())
    }

    fn route_permits(&self, route: &Route) -> Result<Arc<Semaphore>, PoolError> {
        let mut state = self.lock();
        if state.closed {
            return Err(PoolError::Closed);
        }
        let max_per_route = self.limits.max_per_route;
        let entry = state
            .routes
            .entry(route.clone())
            .or_insert_with(|| RouteEntry::new(max_per_route));
        Ok(Arc::clone(&entry.permits))
    }

    fn take_idle(&self, route: &Route) -> Option<C> {
        let mut stale = Vec::new();
        let found = {
            let mut state = self.lock();
            let mut found = None;
            let mut taken = 0;
            if let Some(entry) = state.routes.get_mut(route) {
                while let Some(idle) = entry.idle.pop_back() {
                    taken += 1;
                    if idle.conn.is_open() {
                        found = Some(idle.conn);
                        break;
                    }
                    stale.push(idle.conn);
                }
            }
            state.idle_total -= taken;
            state.prune(route);
            found
        };

        if !stale.is_empty() {
            tracing::debug!(route = %route, discarded = stale.len(), "Discarded closed idle connections");
        }
        found
    }

    pub(crate) fn put_idle(&self, route: &Route, conn: C) {
        let evicted = {
            let mut state = self.lock();
            if state.closed {
                Some(conn)
            } else {
                let max_per_route = self.limits.max_per_route;
                let entry = state
                    .routes
                    .entry(route.clone())
                    .or_insert_with(|| RouteEntry::new(max_per_route));
                entry.idle.push_back(IdleConnection {
                    conn,
                    since: Instant::now(),
                });
                let evicted = if entry.idle.len() > max_per_route {
                    entry.idle.pop_front().map(|idle| idle.conn)
                } else {
                    None
                };
                if evicted.is_none() {
                    state.idle_total += 1;
                }
                evicted
            }
        };
        drop(evicted);
    }

    pub(crate) fn make_room(&self, route: &Route) {
        let mut evicted = Vec::new();
        {
            let mut state = self.lock();
            let leased = self.leased();
            while state.idle_total + leased > self.limits.max_total {
                let victim = state
                    .routes
                    .iter()
                    .filter(|(r, entry)| *r != route && !entry.idle.is_empty())
                    .min_by_key(|(_, entry)| entry.idle.front().map(|idle| idle.since))
                    .map(|(r, _)| r.clone());
                let Some(victim) = victim else {
                    break;
                };
                let popped = state
                    .routes
                    .get_mut(&victim)
                    .and_then(|entry| entry.idle.pop_front());
                match popped {
                    Some(idle) => {
                        state.idle_total -= 1;
                        evicted.push(idle.conn);
                        state.prune(&victim);
                    }
                    None => break,
                }
            }
        }

        if !evicted.is_empty() {
            tracing::debug!(route = %route, evicted = evicted.len(), "Evicted idle connections of other routes");
        }
    }

    fn close(&self) {
        let mut drained = Vec::new();
        {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.idle_total = 0;
            self.global.close();
            for entry in state.routes.values_mut() {
                entry.permits.close();
                drained.extend(entry.idle.drain(..).map(|idle| idle.conn));
            }
        }
        tracing::debug!(closed_idle = drained.len(), "Connection pool closed");
    }
}
