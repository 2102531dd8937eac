//! Metrics collection and exposition.
//!
//! # Metrics
//! - `zeus_proxy_requests_total` (counter): requests by resource, method, status
//! - `zeus_proxy_request_duration_seconds` (histogram): latency by resource, method
//! - `zeus_proxy_upstream_errors_total` (counter): backend failures by resource, kind
//!
//! Recording is a no-op until a recorder is installed, so tests and the CLI
//! can run the handler without an exporter.

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::Method;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Count one finished request and record its latency.
pub fn record_request(resource: &str, method: &Method, status: u16, start: Instant) {
    metrics::counter!(
        "zeus_proxy_requests_total",
        "resource" => resource.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "zeus_proxy_request_duration_seconds",
        "resource" => resource.to_string(),
        "method" => method.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Count a failed backend call by error kind.
pub fn record_upstream_error(resource: &str, kind: &'static str) {
    metrics::counter!(
        "zeus_proxy_upstream_errors_total",
        "resource" => resource.to_string(),
        "kind" => kind
    )
    .increment(1);
}
