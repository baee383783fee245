//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rest_mux_requests_total` (counter): requests by method, status, outcome
//! - `rest_mux_request_duration_seconds` (histogram): latency distribution
//! - `rest_mux_routes` (gauge): number of registered routes
//!
//! # Design Decisions
//! - Recording is a no-op until [`init_metrics`] installs the exporter
//! - `outcome` is the request error kind, or `ok`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder with its scrape listener on `addr`.
///
/// Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "rest_mux_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("rest_mux_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_routes(count: usize) {
    metrics::gauge!("rest_mux_routes").set(count as f64);
}
