//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define balancer metrics (requests, retries, failovers, backend state)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `lb_requests_total` (counter): requests by response status
//! - `lb_forward_retries_total` (counter): same-backend retries
//! - `lb_failovers_total` (counter): switches to another backend
//! - `lb_backend_alive` (gauge): 1=alive, 0=dead
//! - `lb_backend_load` (gauge): in-flight requests per backend
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels for backend address and status code

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(status: u16) {
    metrics::counter!("lb_requests_total", "status" => status.to_string()).increment(1);
}

pub fn record_retry(backend: &str) {
    metrics::counter!("lb_forward_retries_total", "backend" => backend.to_string()).increment(1);
}

pub fn record_failover(backend: &str) {
    metrics::counter!("lb_failovers_total", "backend" => backend.to_string()).increment(1);
}

pub fn record_backend_alive(backend: &str, alive: bool) {
    metrics::gauge!("lb_backend_alive", "backend" => backend.to_string())
        .set(if alive { 1.0 } else { 0.0 });
}

pub fn record_backend_load(backend: &str, load: usize) {
    metrics::gauge!("lb_backend_load", "backend" => backend.to_string()).set(load as f64);
}
