//! Prometheus metrics for monitoring the table server.
//!
//! When `METRICS_BIND` is set, metrics are exposed in Prometheus text format
//! on that address for scraping by monitoring systems. Without an installed
//! exporter the recording functions are no-ops.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use sb_server::metrics;
//! use std::net::SocketAddr;
//!
//! // Initialize metrics exporter
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! // Record WebSocket connection
//! metrics::websocket_connections_total();
//! metrics::websocket_connections_active(10);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Errors
///
/// Returns an error message if the exporter can't be installed
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// Set current active WebSocket connections count.
pub fn websocket_connections_active(count: usize) {
    metrics::gauge!("websocket_connections_active").set(count as f64);
}

/// Increment total WebSocket connections counter.
pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

/// Increment WebSocket messages sent counter.
pub fn websocket_messages_sent() {
    metrics::counter!("websocket_messages_sent").increment(1);
}

/// Increment WebSocket messages received counter.
pub fn websocket_messages_received() {
    metrics::counter!("websocket_messages_received").increment(1);
}

/// Increment undecodable frames counter, labelled by failure kind.
pub fn websocket_bad_requests_total(kind: &str) {
    metrics::counter!("websocket_bad_requests_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Increment connections dropped for falling behind.
pub fn websocket_stalled_total() {
    metrics::counter!("websocket_stalled_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter() {
        // No recorder installed: every call is a no-op and must not panic
        websocket_connections_total();
        websocket_connections_active(3);
        websocket_messages_sent();
        websocket_messages_received();
        websocket_bad_requests_total("json");
        websocket_stalled_total();
    }
}
