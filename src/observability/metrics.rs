//! Metrics collection and exposition.
//!
//! # Metrics
//! - `service_requests_total` (counter): requests by method, status
//! - `service_request_duration_seconds` (histogram): latency distribution
//! - `inactivity_in_flight_requests` (gauge): requests currently tracked by the watchdog
//! - `inactivity_resets_total` (counter): deadline re-arms
//! - `inactivity_shutdowns_total` (counter): inactivity shutdowns (0 or 1 per process)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    counter!("service_requests_total", "method" => method.clone(), "status" => status.clone())
        .increment(1);
    histogram!("service_request_duration_seconds", "method" => method, "status" => status)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_in_flight(in_flight: usize) {
    gauge!("inactivity_in_flight_requests").set(in_flight as f64);
}

pub fn record_reset() {
    counter!("inactivity_resets_total").increment(1);
}

pub fn record_inactivity_shutdown() {
    counter!("inactivity_shutdowns_total").increment(1);
}
