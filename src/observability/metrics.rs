//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_requests_total` (counter): requests by method and status
//! - `api_request_duration_seconds` (histogram): latency distribution
//! - `api_forbidden_total` (counter): denied requests
//! - `api_cache_lookups_total` (counter): freshness cache hits/misses
//! - `api_push_events_total` (counter): broadcast events by name
//! - `api_live_clients` (gauge): connected live clients

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter started"),
        Err(e) => tracing::error!(error = %e, "Failed to start metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "api_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("api_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_forbidden() {
    counter!("api_forbidden_total").increment(1);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("api_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_push_event(event: &'static str) {
    counter!("api_push_events_total", "event" => event).increment(1);
}

pub fn record_live_clients(count: usize) {
    gauge!("api_live_clients").set(count as f64);
}
