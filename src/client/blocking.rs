//! Blocking client facade.
//!
//! # Responsibilities
//! - Own the background I/O runtime and the connection pool
//! - Bridge calling threads to the runtime and block until an outcome exists
//! - Classify every exchange and hand exactly one continuation the outcome
//! - Stop promptly, failing requests that are still in flight

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::runtime::{Handle, Runtime};
use tokio::sync::oneshot::{self, error::RecvError};
use tracing::Instrument;

use crate::client::executor::RequestExecutor;
use crate::config::{validate_config, ClientConfig};
use crate::error::{ClientError, ClientResult, StartError, TransportErrorKind};
use crate::http::{Request, Response, ResponseClassifier};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::outcome::Outcome;
use crate::pool::{ConnectionPool, PoolLimits, PoolStats};
use crate::transport::{tls, Connector, ProxySettings};

type Reply = oneshot::Receiver<ClientResult<Response>>;

/// A pooled HTTP/1.1 client with a blocking API.
///
/// Requests run on a private multi-threaded Tokio runtime; the calling thread
/// waits for the outcome. The client is `Send + Sync` and meant to be shared
/// (for example behind an `Arc`) by many threads.
pub struct HttpClient {
    config: Arc<ClientConfig>,
    executor: Arc<RequestExecutor>,
    classifier: ResponseClassifier,
    handle: Handle,
    runtime: Mutex<Option<Runtime>>,
    shutdown: Shutdown,
}

impl HttpClient {
    /// Validate `config`, start the I/O runtime and allocate the pool.
    pub fn start(config: ClientConfig) -> Result<Self, StartError> {
        validate_config(&config).map_err(StartError::Invalid)?;
        let tls = tls::client_config(config.tls_ca_file.as_deref())?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.io_threads)
            .thread_name(format!("http-client-{}", config.id))
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();

        let proxy = if config.use_ambient_proxy_settings {
            ProxySettings::from_env()
        } else {
            None
        };
        if let Some(proxy) = &proxy {
            tracing::info!(client = %config.id, proxy = %proxy.endpoint(), "Using ambient proxy");
        }

        let config = Arc::new(config);
        let shutdown = Shutdown::new();
        let pool = ConnectionPool::new(PoolLimits::from(config.as_ref()));
        let connector = Connector::new(
            config.id.as_str(),
            config.connect_timeout(),
            tls,
            shutdown.clone(),
        );
        let executor = Arc::new(RequestExecutor::new(
            Arc::clone(&config),
            pool,
            connector,
            proxy,
        ));
        let classifier = ResponseClassifier::new(config.id.as_str());

        tracing::info!(client = %config.id, "started {}", config);

        Ok(Self {
            config,
            executor,
            classifier,
            handle,
            runtime: Mutex::new(Some(runtime)),
            shutdown,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_triggered()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.executor.pool().stats()
    }

    /// Execute `request` and pass the outcome to exactly one of the two
    /// continuations, on the calling thread.
    ///
    /// # Panics
    /// Panics if called from within an async execution context.
    pub fn execute<R>(
        &self,
        request: Request,
        on_success: impl FnOnce(Response) -> R,
        on_failure: impl FnOnce(ClientError) -> R,
    ) -> R {
        self.perform(request).fold(on_success, on_failure)
    }

    /// Execute `request`, blocking the calling thread until it has an outcome.
    ///
    /// # Panics
    /// Panics if called from within an async execution context; use
    /// [`HttpClient::perform_async`] there.
    pub fn perform(&self, request: Request) -> Outcome {
        let started = Instant::now();
        let target = request.target_label();
        let span = tracing::debug_span!("client", client = %self.config.id);
        let _entered = span.enter();
        tracing::debug!(method = %request.method(), uri = %target, "Executing request");

        let received = match self.submit(request, &target) {
            Ok(reply) => reply.blocking_recv(),
            Err(e) => Ok(Err(e)),
        };
        self.settle(&target, received, started)
    }

    /// Execute `request` from async code.
    pub async fn perform_async(&self, request: Request) -> Outcome {
        let started = Instant::now();
        let target = request.target_label();
        let span = tracing::debug_span!("client", client = %self.config.id);

        async {
            tracing::debug!(method = %request.method(), uri = %target, "Executing request");
            let received = match self.submit(request, &target) {
                Ok(reply) => reply.await,
                Err(e) => Ok(Err(e)),
            };
            self.settle(&target, received, started)
        }
        .instrument(span)
        .await
    }

    /// Stop the client. In-flight requests fail; later requests fail with
    /// [`TransportErrorKind::ClientClosed`]. Idempotent.
    ///
    /// # Panics
    /// Panics if called from within an async execution context.
    pub fn stop(&self) {
        if !self.shutdown.trigger() {
            return;
        }
        self.executor.pool().close();

        let runtime = self
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            runtime.shutdown_timeout(self.config.stop_timeout());
        }
        tracing::info!(client = %self.config.id, "stopped {}", self.config);
    }

    fn submit(&self, request: Request, target: &str) -> ClientResult<Reply> {
        if !self.is_running() {
            return Err(ClientError::transport(
                TransportErrorKind::ClientClosed,
                target,
                "client is stopped",
            ));
        }

        let (tx, rx) = oneshot::channel();
        let executor = Arc::clone(&self.executor);
        let target = target.to_string();
        self.handle.spawn(
            async move {
                let result = executor.send(request, &target).await;
                let _ = tx.send(result);
            }
            .in_current_span(),
        );
        Ok(rx)
    }

    fn settle(
        &self,
        target: &str,
        received: Result<ClientResult<Response>, RecvError>,
        started: Instant,
    ) -> Outcome {
        let outcome = match received {
            Ok(Ok(response)) => self.classifier.classify(target, response),
            Ok(Err(e)) => Outcome::Failure(e),
            Err(_) => {
                tracing::error!(uri = %target, "Request task ended without an outcome");
                Outcome::Failure(ClientError::Cancelled {
                    target: target.to_string(),
                })
            }
        };

        match &outcome {
            Outcome::Success(response) => tracing::debug!(
                uri = %target,
                status = response.code(),
                body_bytes = response.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Request completed"
            ),
            Outcome::Failure(e) => tracing::debug!(
                uri = %target,
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Request failed"
            ),
        }
        metrics::record_request(&self.config.id, outcome.label(), started);
        outcome
    }
}

impl fmt::Display for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.config.as_ref(), f)
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("id", &self.config.id)
            .field("running", &self.is_running())
            .field("pool", &self.pool_stats())
            .finish()
    }
}

impl Drop for HttpClient {
    fn drop(&mut self) {
        if self.shutdown.trigger() {
            self.executor.pool().close();
        }
        let runtime = self.runtime.get_mut().ok().and_then(Option::take);
        if let Some(runtime) = runtime {
            runtime.shutdown_background();
        }
    }
}
