//! Request execution on the I/O runtime.
//!
//! # Responsibilities
//! - Resolve the request's route, applying ambient proxy settings
//! - Lease a pooled connection, opening one when none is idle
//! - Drive the exchange under the response timeout
//! - Return healthy connections to the pool, discard the rest

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, TimeoutPhase, TransportErrorKind};
use crate::http::{Request, Response};
use crate::observability::metrics;
use crate::pool::{ConnectionPool, PoolError, Route, RouteError};
use crate::transport::{dispatch, timeouts, Connection, Connector, ProxySettings};

/// Runs one request from route resolution to a buffered response.
#[derive(Debug)]
pub struct RequestExecutor {
    config: Arc<ClientConfig>,
    pool: ConnectionPool<Connection>,
    connector: Connector,
    proxy: Option<ProxySettings>,
}

impl RequestExecutor {
    pub fn new(
        config: Arc<ClientConfig>,
        pool: ConnectionPool<Connection>,
        connector: Connector,
        proxy: Option<ProxySettings>,
    ) -> Self {
        Self {
            config,
            pool,
            connector,
            proxy,
        }
    }

    pub fn pool(&self) -> &ConnectionPool<Connection> {
        &self.pool
    }

    /// Execute `request`. Any status code is a successful exchange here;
    /// classification happens later.
    pub async fn send(&self, request: Request, target: &str) -> ClientResult<Response> {
        let (route, wire) = self.prepare(request, target)?;

        let mut lease = self
            .pool
            .acquire(&route)
            .await
            .map_err(|e| self.pool_failure(e, target))?;

        let stale = match lease.connection_mut() {
            Some(conn) => dispatch::ready(conn, self.config.socket_timeout(), target)
                .await
                .is_err(),
            None => false,
        };
        if stale {
            if let Some(conn) = lease.detach() {
                tracing::debug!(connection_id = %conn.id(), route = %route, "Dropping stale pooled connection");
            }
        }

        if !lease.is_connected() {
            lease.make_room();
            let conn = self.connector.connect(&route, target).await?;
            lease.attach(conn);
        }

        tracing::trace!(route = %route, reused = lease.is_reused(), "Dispatching request");
        let conn = lease.connection_mut().ok_or_else(|| {
            ClientError::transport(TransportErrorKind::Other, target, "lease holds no connection")
        })?;
        let response = timeouts::bounded(
            self.config.response_timeout(),
            TimeoutPhase::Response,
            target,
            dispatch::send(conn, wire, self.config.socket_timeout(), target),
        )
        .await?;

        lease.release();
        Ok(response)
    }

    fn prepare(
        &self,
        request: Request,
        target: &str,
    ) -> ClientResult<(Route, hyper::Request<Full<Bytes>>)> {
        let uri = request
            .parse_uri()
            .map_err(|e| ClientError::transport(TransportErrorKind::InvalidUri, target, e))?;

        let route = Route::from_uri(&uri).map_err(|e| {
            let kind = match e {
                RouteError::UnsupportedScheme(_) => TransportErrorKind::UnsupportedScheme,
                RouteError::MissingScheme | RouteError::MissingHost => {
                    TransportErrorKind::InvalidUri
                }
            };
            ClientError::transport(kind, target, e)
        })?;
        let route = match &self.proxy {
            Some(proxy) => proxy.route_for(route),
            None => route,
        };

        let wire = request
            .into_wire(&uri, &route)
            .map_err(|e| ClientError::transport(TransportErrorKind::InvalidUri, target, e))?;
        Ok((route, wire))
    }

    fn pool_failure(&self, err: PoolError, target: &str) -> ClientError {
        match err {
            PoolError::Timeout(limit) => {
                metrics::record_pool_timeout(&self.config.id);
                tracing::debug!(
                    uri = %target,
                    stats = ?self.pool.stats(),
                    "Timed out waiting for a pooled connection"
                );
                ClientError::timeout(
                    TimeoutPhase::PoolAcquisition,
                    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    target,
                )
            }
            PoolError::Closed => {
                ClientError::transport(TransportErrorKind::ClientClosed, target, err)
            }
        }
    }
}
