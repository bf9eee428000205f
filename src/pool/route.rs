//! Route resolution.
//!
//! # Responsibilities
//! - Derive the pool partition key (scheme, host, port) from a request URI
//! - Apply default ports and normalise host case
//! - Record the forward proxy a route is reached through

use std::fmt;

use hyper::Uri;
use thiserror::Error;

/// Why a URI could not be turned into a route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("uri has no scheme")]
    MissingScheme,

    #[error("uri has no host")]
    MissingHost,

    #[error("scheme {0} is not supported")]
    UnsupportedScheme(String),
}

/// A host and port to open a TCP connection to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: normalize_host(&host.into()),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Destination of a request; the unit of connection-pool partitioning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    scheme: String,
    target: Endpoint,
    proxy: Option<Endpoint>,
}

impl Route {
    /// A route reached without a proxy.
    pub fn direct(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into().to_ascii_lowercase(),
            target: Endpoint::new(host, port),
            proxy: None,
        }
    }

    /// Resolve the route of an absolute `http` or `https` URI.
    pub fn from_uri(uri: &Uri) -> Result<Self, RouteError> {
        let scheme = uri.scheme_str().ok_or(RouteError::MissingScheme)?;
        let host = uri.host().filter(|h| !h.is_empty()).ok_or(RouteError::MissingHost)?;

        let default_port = match scheme.to_ascii_lowercase().as_str() {
            "http" => 80,
            "https" => 443,
            other => return Err(RouteError::UnsupportedScheme(other.to_string())),
        };
        let port = uri.port_u16().unwrap_or(default_port);

        Ok(Self::direct(scheme, host, port))
    }

    /// The same destination, reached through a forward proxy.
    pub fn via(mut self, proxy: Endpoint) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn target(&self) -> &Endpoint {
        &self.target
    }

    pub fn proxy(&self) -> Option<&Endpoint> {
        self.proxy.as_ref()
    }

    pub fn is_proxied(&self) -> bool {
        self.proxy.is_some()
    }

    pub fn is_tls(&self) -> bool {
        self.scheme == "https"
    }

    /// The endpoint the TCP connection is opened to.
    pub fn connect_endpoint(&self) -> &Endpoint {
        self.proxy.as_ref().unwrap_or(&self.target)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.target)?;
        if let Some(proxy) = &self.proxy {
            write!(f, " via {}", proxy)?;
        }
        Ok(())
    }
}

fn normalize_host(host: &str) -> String {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .to_ascii_lowercase()
}
