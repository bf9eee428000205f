//! Error taxonomy delivered through the failure continuation.
//!
//! # Design Decisions
//! - Every expected failure is a value, never a panic
//! - Variants are distinguishable without string inspection
//! - Transport errors carry the most specific cause available

use std::fmt;

use thiserror::Error;

use crate::config::validation::ValidationError;
use crate::transport::tls::TlsSetupError;

/// Boxed error used as the root cause of transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The wait that ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutPhase {
    /// Waiting for a free pooled connection.
    PoolAcquisition,
    /// Establishing the connection, TLS handshake included.
    Connect,
    /// Waiting for data on an established connection.
    Socket,
    /// Total wait for the response after dispatch.
    Response,
}

impl TimeoutPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PoolAcquisition => "pool-acquisition",
            Self::Connect => "connect",
            Self::Socket => "socket",
            Self::Response => "response",
        }
    }
}

impl fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The target could not be parsed into a route.
    InvalidUri,
    /// The scheme is neither `http` nor `https`.
    UnsupportedScheme,
    /// Name resolution failed.
    Dns,
    /// The TCP connection could not be established.
    Connect,
    /// The TLS handshake failed, including certificate verification.
    Tls,
    /// The peer closed or reset the connection.
    ConnectionClosed,
    /// The peer violated the HTTP protocol.
    Protocol,
    /// The client was stopped.
    ClientClosed,
    Other,
}

impl TransportErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUri => "invalid_uri",
            Self::UnsupportedScheme => "unsupported_scheme",
            Self::Dns => "dns",
            Self::Connect => "connect",
            Self::Tls => "tls",
            Self::ConnectionClosed => "connection_closed",
            Self::Protocol => "protocol",
            Self::ClientClosed => "client_closed",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single request.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The remote server answered with a 5xx status.
    #[error("{message}")]
    RemoteServerError { status: u16, message: String },

    /// A bounded wait expired.
    #[error("{phase} timeout after {timeout_ms} ms for {target}")]
    Timeout {
        phase: TimeoutPhase,
        timeout_ms: u64,
        target: String,
    },

    /// The request failed below HTTP status level.
    #[error("transport error ({kind}) for {target}: {source}")]
    Transport {
        kind: TransportErrorKind,
        target: String,
        #[source]
        source: BoxError,
    },

    /// The wait for the outcome was interrupted.
    #[error("request to {target} was cancelled")]
    Cancelled { target: String },
}

impl ClientError {
    pub(crate) fn remote_server_error(target: &str, status: u16) -> Self {
        Self::RemoteServerError {
            status,
            message: format!("request to {} returned status {}", target, status),
        }
    }

    pub(crate) fn timeout(phase: TimeoutPhase, timeout_ms: u64, target: &str) -> Self {
        Self::Timeout {
            phase,
            timeout_ms,
            target: target.to_string(),
        }
    }

    pub(crate) fn transport(
        kind: TransportErrorKind,
        target: &str,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Transport {
            kind,
            target: target.to_string(),
            source: source.into(),
        }
    }

    /// Status code of a remote server error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteServerError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Phase of a timeout.
    pub fn timeout_phase(&self) -> Option<TimeoutPhase> {
        match self {
            Self::Timeout { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Kind of a transport failure.
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            Self::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Short label used for metrics.
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::RemoteServerError { .. } => "remote_server_error",
            Self::Timeout { .. } => "timeout",
            Self::Transport { .. } => "transport",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

/// Errors raised while starting a client.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("invalid configuration: {}", join(.0))]
    Invalid(Vec<ValidationError>),

    #[error("failed to start I/O runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("failed to set up TLS: {0}")]
    Tls(#[from] TlsSetupError),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
