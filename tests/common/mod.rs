//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{any, get};
use axum::Router;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use simple_http_client::ClientConfig;

pub const LARGE_BODY: usize = 2 * 1024 * 1024;

/// Client settings for tests: generous timeouts, no ambient proxy.
pub fn test_config(id: &str) -> ClientConfig {
    ClientConfig {
        id: id.to_string(),
        socket_timeout_ms: 5_000,
        connect_timeout_ms: 1_000,
        response_timeout_ms: 10_000,
        use_ambient_proxy_settings: false,
        stop_timeout_ms: 1_000,
        ..ClientConfig::default()
    }
}

/// Mock backend on an ephemeral port, served from its own runtime.
pub struct MockServer {
    addr: SocketAddr,
    scheme: &'static str,
    runtime: Option<Runtime>,
}

impl MockServer {
    pub fn start() -> Self {
        let runtime = server_runtime();
        let listener = runtime
            .block_on(TcpListener::bind("127.0.0.1:0"))
            .unwrap();
        let addr = listener.local_addr().unwrap();
        runtime.spawn(async move {
            let _ = axum::serve(listener, app()).await;
        });
        Self {
            addr,
            scheme: "http",
            runtime: Some(runtime),
        }
    }

    /// Same routes over TLS, with a certificate for `127.0.0.1` and
    /// `localhost` signed by `fixture("ca.pem")`.
    pub fn start_tls() -> Self {
        let runtime = server_runtime();
        let inner = runtime
            .block_on(TcpListener::bind("127.0.0.1:0"))
            .unwrap();
        let addr = inner.local_addr().unwrap();
        let listener = TlsListener {
            inner,
            acceptor: tls_acceptor(),
        };
        runtime.spawn(async move {
            let _ = axum::serve(listener, app()).await;
        });
        Self {
            addr,
            scheme: "https",
            runtime: Some(runtime),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.addr, path)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

fn server_runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

/// Path of a file under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn tls_acceptor() -> TlsAcceptor {
    let certs = rustls_pemfile::certs(&mut BufReader::new(
        File::open(fixture("server.pem")).unwrap(),
    ))
    .collect::<Result<Vec<_>, _>>()
    .unwrap();
    let key = rustls_pemfile::private_key(&mut BufReader::new(
        File::open(fixture("server.key")).unwrap(),
    ))
    .unwrap()
    .unwrap();

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .unwrap();
    TlsAcceptor::from(Arc::new(config))
}

/// TCP listener that completes the TLS handshake before handing out streams.
struct TlsListener {
    inner: TcpListener,
    acceptor: TlsAcceptor,
}

impl axum::serve::Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            let Ok((stream, addr)) = self.inner.accept().await else {
                continue;
            };
            // Failed handshakes are expected from clients that distrust the CA.
            if let Ok(stream) = self.acceptor.accept(stream).await {
                return (stream, addr);
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}

fn app() -> Router {
    Router::new()
        .route("/ok", get(|| async { "ok" }))
        .route(
            "/status/{code}",
            get(|Path(code): Path<u16>| async move {
                let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
                (status, format!("status {code}"))
            }),
        )
        .route(
            "/delay/{ms}",
            get(|Path(ms): Path<u64>| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                "late"
            }),
        )
        .route("/large", get(|| async { vec![b'x'; LARGE_BODY] }))
        .route(
            "/large-error",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, vec![b'x'; LARGE_BODY]) }),
        )
        .route("/echo", any(|body: Bytes| async move { body }))
        .route(
            "/host",
            get(|headers: HeaderMap| async move {
                headers
                    .get("host")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            }),
        )
}

/// A backend that accepts connections and closes them without answering.
pub fn start_closing_backend() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => drop(stream),
                Err(_) => break,
            }
        }
    });
    addr
}

/// A backend that reads one byte of each request and closes the socket.
/// The unread remainder makes the kernel reset the connection.
pub fn start_resetting_backend() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(mut stream) => {
                    let mut first = [0u8; 1];
                    let _ = stream.read(&mut first);
                    std::thread::sleep(Duration::from_millis(20));
                    drop(stream);
                }
                Err(_) => break,
            }
        }
    });
    addr
}

/// An address nothing listens on.
pub fn refused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Counts WARN events seen by the subscriber it is installed in.
#[derive(Clone, Default)]
pub struct WarnCounter {
    count: Arc<AtomicUsize>,
}

impl WarnCounter {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}
