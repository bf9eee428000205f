//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities >= 1, worker threads >= 1)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before a client is started

use thiserror::Error;

use crate::config::schema::ClientConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("id must not be empty")]
    EmptyId,

    #[error("{0} must be at least 1")]
    ZeroCapacity(&'static str),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.id.trim().is_empty() {
        errors.push(ValidationError::EmptyId);
    }
    if config.max_connections_per_route == 0 {
        errors.push(ValidationError::ZeroCapacity("max_connections_per_route"));
    }
    if config.max_connections_total == 0 {
        errors.push(ValidationError::ZeroCapacity("max_connections_total"));
    }
    if config.io_threads == 0 {
        errors.push(ValidationError::ZeroCapacity("io_threads"));
    }

    // Legal, but one route can never reach its own cap.
    if config.max_connections_per_route > config.max_connections_total {
        tracing::warn!(
            client = %config.id,
            per_route = config.max_connections_per_route,
            total = config.max_connections_total,
            "max_connections_per_route exceeds max_connections_total"
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
