//! Prometheus metrics for monitoring server health.
//!
//! Metrics are exposed via a dedicated Prometheus exporter listener,
//! separate from the main HTTP/WebSocket bind address.
//!
//! # Metrics Categories
//!
//! - **Room metrics**: active rooms, seats filled, rounds played
//! - **WebSocket metrics**: active connections, messages sent/received
//! - **Bot metrics**: actions taken
//! - **Rate limiting metrics**: limiter hits

#![allow(dead_code)]

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize the Prometheus metrics exporter.
///
/// Binds its own HTTP listener at `addr`; scrapes are served from
/// `http://<addr>/metrics`. This is independent from the axum router
/// serving `/health` and `/ws`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install Prometheus exporter: {e}"))
}

// ============================================================================
// Room metrics
// ============================================================================

/// Set the current active room count.
pub fn active_rooms(count: usize) {
    metrics::gauge!("active_rooms").set(count as f64);
}

/// Set the current total seats filled across all rooms.
pub fn active_players(count: usize) {
    metrics::gauge!("active_players").set(count as f64);
}

/// Increment the rounds-played counter.
pub fn rounds_played_total() {
    metrics::counter!("rounds_played_total").increment(1);
}

/// Increment the redeals counter.
pub fn redeals_total() {
    metrics::counter!("redeals_total").increment(1);
}

// ============================================================================
// WebSocket metrics
// ============================================================================

/// Set the current active WebSocket connections count.
pub fn websocket_connections_active(count: u64) {
    metrics::gauge!("websocket_connections_active").set(count as f64);
}

/// Increment the total WebSocket connections counter.
pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

/// Increment the WebSocket messages sent counter.
pub fn websocket_messages_sent() {
    metrics::counter!("websocket_messages_sent").increment(1);
}

/// Increment the WebSocket messages received counter.
pub fn websocket_messages_received() {
    metrics::counter!("websocket_messages_received").increment(1);
}

// ============================================================================
// Bot metrics
// ============================================================================

/// Increment the bot-actions-taken counter.
pub fn bot_actions_total(action: &str) {
    metrics::counter!("bot_actions_total", "action" => action.to_string()).increment(1);
}

// ============================================================================
// Rate limiting metrics
// ============================================================================

/// Increment the rate-limit-hits counter.
pub fn rate_limit_hits_total(scope: &str) {
    metrics::counter!("rate_limit_hits_total", "scope" => scope.to_string()).increment(1);
}
