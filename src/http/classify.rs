//! Response classification.
//!
//! # Responsibilities
//! - Turn a completed response into success or remote server error
//! - Warn about responses too large to comfortably buffer
//!
//! # Design Decisions
//! - Only 5xx is a failure here; 4xx is left for the caller to judge
//! - The size warning never changes the verdict

use std::sync::Arc;

use crate::error::ClientError;
use crate::http::Response;
use crate::observability::metrics;
use crate::outcome::Outcome;

/// Body size above which a warning is logged (1 MiB).
pub const WARN_AT_BODY_SIZE: usize = 1024 * 1024;

/// Whether a body of `len` bytes triggers the size warning.
pub fn exceeds_advisory_threshold(len: usize) -> bool {
    len > WARN_AT_BODY_SIZE
}

/// Decides the outcome of completed responses for one client.
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    client_id: Arc<str>,
}

impl ResponseClassifier {
    pub fn new(client_id: impl Into<Arc<str>>) -> Self {
        Self {
            client_id: client_id.into(),
        }
    }

    pub fn classify(&self, target: &str, response: Response) -> Outcome {
        let status = response.code();
        if status >= 500 {
            return Outcome::Failure(ClientError::remote_server_error(target, status));
        }

        let size = response.len();
        if exceeds_advisory_threshold(size) {
            tracing::warn!(
                client = %self.client_id,
                uri = %target,
                body_bytes = size,
                "the response size for the request [{}] is {} bytes; \
                 please consider switching to a streaming approach for such requests",
                target,
                size
            );
            metrics::record_oversized_response(&self.client_id);
        }

        Outcome::Success(response)
    }
}
