//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): inbound requests by method, path, status
//! - `gateway_request_duration_seconds` (histogram): inbound latency by path
//! - `gateway_breaker_transitions_total` (counter): breaker state changes
//! - `gateway_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `gateway_retry_queue_depth` (gauge): deferred operations per backend
//! - `gateway_retry_dropped_total` (counter): evictions from full queues
//! - `gateway_replays_total` (counter): replay outcomes per operation
//! - `gateway_dead_letters_total` (counter): operations given up on
//! - `gateway_fallbacks_total` (counter): degraded responses served
//! - `gateway_car_cache_entries` (gauge): catalog entries held for fallbacks
//! - `gateway_backend_up` (gauge): last probe result, 1=up
//! - `gateway_probe_duration_seconds` (histogram): probe latency
//!
//! # Design Decisions
//! - Low-overhead updates (atomic operations behind the `metrics` facade)
//! - Route templates as labels, never raw paths with uuids in them

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init(address: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()?;
    tracing::info!(address = %address, "Metrics exporter listening");
    Ok(())
}

pub fn http_request(method: &str, path: &str, status: u16, elapsed_secs: f64) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "path" => path.to_string())
        .record(elapsed_secs);
}

pub fn breaker_transition(backend: &'static str, to: &'static str) {
    counter!("gateway_breaker_transitions_total", "backend" => backend, "to" => to).increment(1);
}

pub fn breaker_state(backend: &'static str, value: f64) {
    gauge!("gateway_breaker_state", "backend" => backend).set(value);
}

pub fn queue_depth(backend: &'static str, depth: usize) {
    gauge!("gateway_retry_queue_depth", "backend" => backend).set(depth as f64);
}

pub fn operation_dropped(backend: &'static str) {
    counter!("gateway_retry_dropped_total", "backend" => backend).increment(1);
}

pub fn replay(backend: &'static str, operation: &'static str, outcome: &'static str) {
    counter!(
        "gateway_replays_total",
        "backend" => backend,
        "operation" => operation,
        "outcome" => outcome,
    )
    .increment(1);
}

pub fn dead_letter(backend: &'static str) {
    counter!("gateway_dead_letters_total", "backend" => backend).increment(1);
}

pub fn fallback(backend: &'static str, operation: &'static str) {
    counter!("gateway_fallbacks_total", "backend" => backend, "operation" => operation)
        .increment(1);
}

pub fn cache_size(entries: usize) {
    gauge!("gateway_car_cache_entries").set(entries as f64);
}

pub fn backend_up(backend: &'static str, up: bool) {
    gauge!("gateway_backend_up", "backend" => backend).set(if up { 1.0 } else { 0.0 });
}

pub fn probe_duration(backend: &'static str, seconds: f64) {
    histogram!("gateway_probe_duration_seconds", "backend" => backend).record(seconds);
}
