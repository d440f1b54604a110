//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_pairs_emitted_total` (counter): correlated pairs handed to the feed
//! - `relay_orphaned_responses_total` (counter): responses with no pending match
//! - `relay_records_dropped_total` (counter, by reason): pairs that never reached the wire
//! - `relay_transport_errors_total` (counter): failed sends on the outbound connection
//! - `relay_pending_evicted_total` (counter): stale pendings dropped by the sweeper
//! - `relay_pending_entries` (gauge): current pending table size
//! - `relay_malformed_events_total` (counter): undecodable ingest lines
//!
//! All updates are cheap atomic operations; without an installed exporter
//! they are no-ops.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_pair_emitted(method: &str, status_code: u16) {
    metrics::counter!(
        "relay_pairs_emitted_total",
        "method" => method.to_string(),
        "status" => status_code.to_string(),
    )
    .increment(1);
}

pub fn record_orphaned_response() {
    metrics::counter!("relay_orphaned_responses_total").increment(1);
}

pub fn record_dropped(reason: &'static str) {
    metrics::counter!("relay_records_dropped_total", "reason" => reason).increment(1);
}

pub fn record_transport_error() {
    metrics::counter!("relay_transport_errors_total").increment(1);
}

pub fn record_evictions(count: usize) {
    metrics::counter!("relay_pending_evicted_total").increment(count as u64);
}

pub fn record_pending_size(size: usize) {
    metrics::gauge!("relay_pending_entries").set(size as f64);
}

pub fn record_malformed_event() {
    metrics::counter!("relay_malformed_events_total").increment(1);
}

pub fn record_feed_connected(connected: bool) {
    metrics::gauge!("relay_feed_connected").set(if connected { 1.0 } else { 0.0 });
}
