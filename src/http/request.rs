//! Request description.
//!
//! # Responsibilities
//! - Hold method, target URI, headers and optional body as given by the caller
//! - Produce a diagnostic label for the target, even when it does not parse
//! - Convert into a wire request for a resolved route (origin-form or, through a
//!   proxy, absolute-form), adding `Host` when missing

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue, HOST};
use hyper::{HeaderMap, Method, Uri};

use crate::pool::Route;

/// An HTTP request as submitted by the caller.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Request {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn head(uri: impl Into<String>) -> Self {
        Self::new(Method::HEAD, uri)
    }

    pub fn delete(uri: impl Into<String>) -> Self {
        Self::new(Method::DELETE, uri)
    }

    pub fn post(uri: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(Method::POST, uri).with_body(body)
    }

    pub fn put(uri: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(Method::PUT, uri).with_body(body)
    }

    /// Append a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub(crate) fn parse_uri(&self) -> Result<Uri, hyper::http::uri::InvalidUri> {
        self.uri.parse()
    }

    /// The target as used in diagnostics.
    ///
    /// Unparseable targets yield a descriptive placeholder instead of failing.
    pub fn target_label(&self) -> String {
        match self.parse_uri() {
            Ok(uri) => uri.to_string(),
            Err(e) => format!("(invalid uri, error = {})", e),
        }
    }

    /// Build the wire request sent over a connection for `route`.
    pub(crate) fn into_wire(
        self,
        uri: &Uri,
        route: &Route,
    ) -> Result<hyper::Request<Full<Bytes>>, hyper::http::Error> {
        let request_target = if route.is_proxied() {
            uri.clone()
        } else {
            let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
            let path = if path.is_empty() { "/" } else { path };
            path.parse::<Uri>()?
        };

        let mut headers = self.headers;
        if !headers.contains_key(HOST) {
            if let Some(authority) = uri.authority() {
                headers.insert(HOST, HeaderValue::from_str(authority.as_str())?);
            }
        }

        let mut builder = hyper::Request::builder()
            .method(self.method)
            .uri(request_target);
        if let Some(map) = builder.headers_mut() {
            *map = headers;
        }
        builder.body(Full::new(self.body.unwrap_or_default()))
    }
}
