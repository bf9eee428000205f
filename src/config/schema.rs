//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default socket timeout (time waiting for data on an established connection).
pub const DEFAULT_SOCKET_TIMEOUT_MS: u64 = 1000;

/// Default connect timeout (time to establish a connection).
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1000;

/// Default total wait for a response after dispatch.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 1000;

/// Default wait for a free pooled connection.
pub const DEFAULT_ACQUISITION_TIMEOUT_MS: u64 = 500;

pub const DEFAULT_MAX_CONNECTIONS_PER_ROUTE: usize = 10;

pub const DEFAULT_MAX_CONNECTIONS_TOTAL: usize = 20;

/// Configuration for one client instance.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Name through which this instance is referenced in logs and metrics.
    pub id: String,

    /// Time waiting for data once the connection is established.
    pub socket_timeout_ms: u64,

    /// Time to establish the connection, including the TLS handshake.
    pub connect_timeout_ms: u64,

    /// Total time waiting for the response after the request is dispatched.
    pub response_timeout_ms: u64,

    /// Time waiting for a connection from the pool.
    pub acquisition_timeout_ms: u64,

    /// Honour `http_proxy` / `no_proxy` from the environment.
    pub use_ambient_proxy_settings: bool,

    /// Maximum concurrent connections to one route.
    pub max_connections_per_route: usize,

    /// Maximum concurrent connections across all routes.
    pub max_connections_total: usize,

    /// Worker threads of the background I/O runtime.
    pub io_threads: usize,

    /// Upper bound on how long `stop()` waits for in-flight work.
    pub stop_timeout_ms: u64,

    /// PEM file of extra root certificates trusted for `https`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_ca_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            socket_timeout_ms: DEFAULT_SOCKET_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            acquisition_timeout_ms: DEFAULT_ACQUISITION_TIMEOUT_MS,
            use_ambient_proxy_settings: true,
            max_connections_per_route: DEFAULT_MAX_CONNECTIONS_PER_ROUTE,
            max_connections_total: DEFAULT_MAX_CONNECTIONS_TOTAL,
            io_threads: 2,
            stop_timeout_ms: 5000,
            tls_ca_file: None,
        }
    }
}

impl ClientConfig {
    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn acquisition_timeout(&self) -> Duration {
        Duration::from_millis(self.acquisition_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl fmt::Display for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "simple-http-client(id={},socketTimeout={} ms,connectTimeout={} ms,\
             responseTimeout={} ms,acquisitionTimeout={} ms,\
             maxConnectionsPerRoute={},maxConnections={})",
            self.id,
            self.socket_timeout_ms,
            self.connect_timeout_ms,
            self.response_timeout_ms,
            self.acquisition_timeout_ms,
            self.max_connections_per_route,
            self.max_connections_total,
        )
    }
}
