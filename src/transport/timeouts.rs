//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap transport waits with a deadline
//! - Tag an expired deadline with the phase it belongs to
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the wrapped future is dropped on expiry
//! - A zero limit means the wait is unbounded

use std::future::Future;
use std::time::Duration;

use crate::error::{ClientError, ClientResult, TimeoutPhase};

/// Run `fut`, failing with a `phase` timeout if it takes longer than `limit`.
pub async fn bounded<F, T>(
    limit: Duration,
    phase: TimeoutPhase,
    target: &str,
    fut: F,
) -> ClientResult<T>
where
    F: Future<Output = ClientResult<T>>,
{
    if limit.is_zero() {
        return fut.await;
    }
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::timeout(phase, millis(limit), target)),
    }
}

fn millis(limit: Duration) -> u64 {
    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)
}
