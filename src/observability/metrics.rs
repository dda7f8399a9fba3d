//! Metrics collection and exposition.
//!
//! # Metrics
//! - `explorer_rpc_calls_total` (counter): daemon calls by method, outcome
//! - `explorer_rpc_duration_seconds` (histogram): daemon call latency
//! - `explorer_cache_refreshes_total` (counter): refresh cycles by outcome
//! - `explorer_cache_highest_block` (gauge): newest cached height
//! - `explorer_unsafe_content_total` (counter): rejected daemon strings
//! - `explorer_block_body_parse_failures_total` (counter)
//! - `explorer_http_requests_total` (counter): page requests by route, status
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::daemon::DaemonError;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Short label for the outcome of a daemon call.
pub fn outcome_label<T>(result: &Result<T, DaemonError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(DaemonError::Rpc { .. }) => "rpc_error",
        Err(DaemonError::Timeout(_)) => "timeout",
        Err(DaemonError::HttpStatus(_)) => "http_status",
        Err(DaemonError::Auth(_)) => "auth",
        Err(DaemonError::Decode(_)) | Err(DaemonError::Status(_)) => "bad_response",
        Err(DaemonError::Connect(_)) | Err(DaemonError::Transport(_)) => "transport",
    }
}

pub fn record_rpc_call<T>(method: &str, result: &Result<T, DaemonError>, start: Instant) {
    let method = method.to_string();
    counter!(
        "explorer_rpc_calls_total",
        "method" => method.clone(),
        "outcome" => outcome_label(result)
    )
    .increment(1);
    histogram!("explorer_rpc_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_refresh(success: bool, highest: Option<u64>) {
    let outcome = if success { "ok" } else { "error" };
    counter!("explorer_cache_refreshes_total", "outcome" => outcome).increment(1);
    if let Some(height) = highest {
        gauge!("explorer_cache_highest_block").set(height as f64);
    }
}

pub fn record_unsafe_content() {
    counter!("explorer_unsafe_content_total").increment(1);
}

pub fn record_block_body_parse_failure() {
    counter!("explorer_block_body_parse_failures_total").increment(1);
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    let route = route.to_string();
    counter!(
        "explorer_http_requests_total",
        "route" => route.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("explorer_http_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}
