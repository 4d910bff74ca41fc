//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, and
//!   matched route prefix ("unmatched" for unrouted paths, so label
//!   cardinality stays bounded)
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_rate_limited_total` (counter): rejections by scope
//! - `gateway_upstream_attempts_total` (counter): forward attempts by
//!   service and outcome
//! - `gateway_backend_health` (gauge): 1=healthy, 0=unhealthy

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, route: &str, started: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string(),
    )
    .increment(1);
    metrics::histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
    )
    .record(started.elapsed().as_secs_f64());
}

pub fn record_rate_limited(scope: &str) {
    metrics::counter!("gateway_rate_limited_total", "scope" => scope.to_string()).increment(1);
}

pub fn record_upstream_attempt(service: &str, outcome: &str) {
    metrics::counter!(
        "gateway_upstream_attempts_total",
        "service" => service.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);
}

pub fn record_backend_health(service: &str, healthy: bool) {
    metrics::gauge!("gateway_backend_health", "service" => service.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}
