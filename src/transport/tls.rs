//! TLS client configuration.
//!
//! # Responsibilities
//! - Build the rustls client config shared by every https connection
//! - Trust the bundled web PKI roots plus any extra PEM roots from config
//!
//! # Design Decisions
//! - The ring provider is selected explicitly, never the process default
//! - ALPN offers only `http/1.1` since connections speak HTTP/1.1

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::RootCertStore;
use thiserror::Error;

/// Why the TLS configuration could not be built.
#[derive(Debug, Error)]
pub enum TlsSetupError {
    #[error("failed to read root certificates from {path}: {source}")]
    ReadRoots {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no usable certificates in {0}")]
    NoRoots(PathBuf),

    #[error("TLS backend rejected configuration: {0}")]
    Backend(#[from] rustls::Error),
}

/// Client config trusting the web PKI roots and, if given, the PEM
/// certificates in `extra_roots`.
pub fn client_config(extra_roots: Option<&Path>) -> Result<Arc<rustls::ClientConfig>, TlsSetupError> {
    let mut roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    if let Some(path) = extra_roots {
        let added = add_pem_roots(&mut roots, path)?;
        tracing::debug!(path = %path.display(), added, "Loaded extra root certificates");
    }

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}

fn add_pem_roots(roots: &mut RootCertStore, path: &Path) -> Result<usize, TlsSetupError> {
    let read_error = |source| TlsSetupError::ReadRoots {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_error)?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_error)?;

    let (added, _ignored) = roots.add_parsable_certificates(certs);
    if added == 0 {
        return Err(TlsSetupError::NoRoots(path.to_path_buf()));
    }
    Ok(added)
}
