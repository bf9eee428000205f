//! Ambient forward-proxy settings.
//!
//! Read from the `http_proxy` / `HTTP_PROXY` and `no_proxy` / `NO_PROXY`
//! environment variables when the client is configured to honour them.

use hyper::Uri;

use crate::pool::{Endpoint, Route};

const DEFAULT_PROXY_PORT: u16 = 80;

/// One entry of a `no_proxy` list.
#[derive(Debug, Clone, PartialEq, Eq)]
enum NoProxyRule {
    Any,
    Domain(String),
}

impl NoProxyRule {
    fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }
        if entry == "*" {
            return Some(Self::Any);
        }
        // Ports in no_proxy entries are ignored.
        let host = match entry.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') && port.parse::<u16>().is_ok() => host,
            _ => entry,
        };
        let host = host.trim_start_matches('.').to_ascii_lowercase();
        if host.is_empty() {
            None
        } else {
            Some(Self::Domain(host))
        }
    }

    fn matches(&self, host: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Domain(domain) => {
                host == domain
                    || host
                        .strip_suffix(domain.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
        }
    }
}

/// A forward proxy plus the hosts that bypass it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    endpoint: Endpoint,
    no_proxy: Vec<NoProxyRule>,
}

impl ProxySettings {
    /// Settings from the process environment, or `None` if no proxy is set.
    pub fn from_env() -> Option<Self> {
        let proxy = env_var(&["http_proxy", "HTTP_PROXY"])?;
        let no_proxy = env_var(&["no_proxy", "NO_PROXY"]);
        let settings = Self::from_values(&proxy, no_proxy.as_deref());
        if settings.is_none() {
            tracing::warn!(http_proxy = %proxy, "Ignoring unusable proxy setting");
        }
        settings
    }

    /// Settings from raw `http_proxy` and `no_proxy` values.
    pub fn from_values(http_proxy: &str, no_proxy: Option<&str>) -> Option<Self> {
        let endpoint = parse_proxy(http_proxy)?;
        let no_proxy = no_proxy
            .map(|list| list.split(',').filter_map(NoProxyRule::parse).collect())
            .unwrap_or_default();
        Some(Self { endpoint, no_proxy })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Whether requests to `host` go direct.
    pub fn bypasses(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.no_proxy.iter().any(|rule| rule.matches(&host))
    }

    /// The route a request to `route` should actually take. Only `http`
    /// routes go through the proxy; tunnelling is not supported.
    pub fn route_for(&self, route: Route) -> Route {
        if route.is_tls() || route.is_proxied() || self.bypasses(&route.target().host) {
            route
        } else {
            route.via(self.endpoint.clone())
        }
    }
}

fn env_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn parse_proxy(raw: &str) -> Option<Endpoint> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let uri: Uri = if raw.contains("://") {
        raw.parse().ok()?
    } else {
        format!("http://{raw}").parse().ok()?
    };
    if !uri.scheme_str()?.eq_ignore_ascii_case("http") {
        return None;
    }
    let host = uri.host().filter(|h| !h.is_empty())?;
    Some(Endpoint::new(host, uri.port_u16().unwrap_or(DEFAULT_PROXY_PORT)))
}
