//! Connection establishment.
//!
//! # Responsibilities
//! - Resolve the route's connect endpoint and open a TCP stream
//! - Wrap `https` streams in TLS
//! - Run the HTTP/1.1 handshake and spawn the connection driver
//! - Generate unique connection IDs for tracing
//!
//! # Design Decisions
//! - The connect timeout bounds resolution, TCP connect and the TLS handshake
//! - Driver tasks exit when the client shuts down, failing whatever they carry

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::error::{ClientError, ClientResult, TimeoutPhase, TransportErrorKind};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::pool::{Endpoint, Poolable, Route};
use crate::transport::{failure, timeouts};

static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// An established HTTP/1.1 connection to one route.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    route: Route,
    sender: SendRequest<Full<Bytes>>,
}

impl Connection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub(crate) async fn ready(&mut self) -> hyper::Result<()> {
        self.sender.ready().await
    }

    pub(crate) async fn send(
        &mut self,
        request: hyper::Request<Full<Bytes>>,
    ) -> hyper::Result<hyper::Response<Incoming>> {
        self.sender.send_request(request).await
    }
}

impl Poolable for Connection {
    fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// Opens new connections on behalf of the executor.
#[derive(Debug, Clone)]
pub struct Connector {
    client_id: Arc<str>,
    connect_timeout: Duration,
    tls: Arc<rustls::ClientConfig>,
    shutdown: Shutdown,
}

impl Connector {
    pub fn new(
        client_id: impl Into<Arc<str>>,
        connect_timeout: Duration,
        tls: Arc<rustls::ClientConfig>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            connect_timeout,
            tls,
            shutdown,
        }
    }

    /// Open a connection for `route`. `target` labels any failure.
    pub async fn connect(&self, route: &Route, target: &str) -> ClientResult<Connection> {
        let endpoint = route.connect_endpoint();
        let sender = if route.is_tls() {
            let stream = timeouts::bounded(
                self.connect_timeout,
                TimeoutPhase::Connect,
                target,
                self.open_tls_stream(endpoint, target),
            )
            .await?;
            self.handshake(stream, target).await?
        } else {
            let stream = timeouts::bounded(
                self.connect_timeout,
                TimeoutPhase::Connect,
                target,
                open_stream(endpoint, target),
            )
            .await?;
            self.handshake(stream, target).await?
        };

        let id = sender.id;
        metrics::record_connection_opened(&self.client_id);
        tracing::debug!(connection_id = %id, route = %route, tls = route.is_tls(), "Connection established");

        Ok(Connection {
            id,
            route: route.clone(),
            sender: sender.inner,
        })
    }

    async fn open_tls_stream(
        &self,
        endpoint: &Endpoint,
        target: &str,
    ) -> ClientResult<TlsStream<TcpStream>> {
        let server_name = ServerName::try_from(endpoint.host.as_str())
            .map(|name| name.to_owned())
            .map_err(|e| ClientError::transport(TransportErrorKind::InvalidUri, target, e))?;
        let stream = open_stream(endpoint, target).await?;
        TlsConnector::from(Arc::clone(&self.tls))
            .connect(server_name, stream)
            .await
            .map_err(|e| ClientError::transport(TransportErrorKind::Tls, target, e))
    }

    /// HTTP/1.1 handshake over `io`, with the connection driver spawned.
    async fn handshake<S>(&self, io: S, target: &str) -> ClientResult<Sender>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (inner, connection) = http1::handshake(TokioIo::new(io))
            .await
            .map_err(|e| failure::from_hyper(e, target))?;

        let id = ConnectionId::new();
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                result = connection => {
                    if let Err(e) = result {
                        tracing::debug!(connection_id = %id, error = %e, "Connection closed with error");
                    } else {
                        tracing::trace!(connection_id = %id, "Connection closed");
                    }
                }
                _ = shutdown.wait() => {
                    tracing::trace!(connection_id = %id, "Connection dropped on client shutdown");
                }
            }
        });

        Ok(Sender { id, inner })
    }
}

struct Sender {
    id: ConnectionId,
    inner: SendRequest<Full<Bytes>>,
}

async fn open_stream(endpoint: &Endpoint, target: &str) -> ClientResult<TcpStream> {
    let stream = connect_tcp(endpoint, target).await?;
    if let Err(e) = stream.set_nodelay(true) {
        tracing::trace!(error = %e, "Failed to set TCP_NODELAY");
    }
    Ok(stream)
}

async fn connect_tcp(endpoint: &Endpoint, target: &str) -> ClientResult<TcpStream> {
    let addrs = tokio::net::lookup_host((endpoint.host.as_str(), endpoint.port))
        .await
        .map_err(|e| ClientError::transport(TransportErrorKind::Dns, target, e))?;

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::trace!(%addr, error = %e, "Connect attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(e) => ClientError::transport(TransportErrorKind::Connect, target, e),
        None => ClientError::transport(
            TransportErrorKind::Dns,
            target,
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses resolved for {}", endpoint),
            ),
        ),
    })
}
