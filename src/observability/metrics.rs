//! Metrics collection.
//!
//! # Metrics
//! - `http_client_requests_total` (counter): requests by client and outcome
//! - `http_client_request_duration_seconds` (histogram): time until the outcome
//! - `http_client_pool_acquire_timeouts_total` (counter): pool-acquisition timeouts
//! - `http_client_connections_opened_total` (counter): new connections
//! - `http_client_oversized_responses_total` (counter): bodies over the advisory size
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; installing an exporter is up to
//!   the embedding application
//! - Every metric is labelled with the client id

use std::time::Instant;

/// Record the outcome of one request.
pub fn record_request(client: &str, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "http_client_requests_total",
        "client" => client.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!(
        "http_client_request_duration_seconds",
        "client" => client.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_pool_timeout(client: &str) {
    metrics::counter!("http_client_pool_acquire_timeouts_total", "client" => client.to_string())
        .increment(1);
}

pub fn record_connection_opened(client: &str) {
    metrics::counter!("http_client_connections_opened_total", "client" => client.to_string())
        .increment(1);
}

pub fn record_oversized_response(client: &str) {
    metrics::counter!("http_client_oversized_responses_total", "client" => client.to_string())
        .increment(1);
}
