// src/core/metrics.rs

//! Defines and registers Prometheus metrics for server monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, TextEncoder, register_counter, register_counter_vec,
    register_gauge,
};

lazy_static! {
    // --- Gauges ---
    /// The number of clients currently connected to the server.
    pub static ref CONNECTED_CLIENTS: Gauge =
        register_gauge!("scriptorium_connected_clients", "Number of currently connected clients.").unwrap();
    /// The number of connections with a bound principal.
    pub static ref AUTHENTICATED_SESSIONS: Gauge =
        register_gauge!("scriptorium_authenticated_sessions", "Number of connections with an authenticated user.").unwrap();

    // --- Counters ---
    /// The total number of connections accepted by the server since startup.
    pub static ref CONNECTIONS_RECEIVED_TOTAL: Counter =
        register_counter!("scriptorium_connections_received_total", "Total number of connections received.").unwrap();
    /// Connections closed on accept because `max_clients` was reached.
    pub static ref CONNECTIONS_REJECTED_TOTAL: Counter =
        register_counter!("scriptorium_connections_rejected_total", "Total number of connections rejected at the client limit.").unwrap();
    /// Commands dispatched, labelled by lowercase command name and outcome.
    pub static ref COMMANDS_PROCESSED_TOTAL: CounterVec =
        register_counter_vec!("scriptorium_commands_processed_total", "Total number of commands processed.", &["command", "outcome"]).unwrap();
    /// Frames that could not be decrypted or decoded.
    pub static ref DECODE_FAILURES_TOTAL: Counter =
        register_counter!("scriptorium_decode_failures_total", "Total number of frames discarded as undecodable.").unwrap();
    /// Messages delivered by registry broadcasts.
    pub static ref BROADCAST_DELIVERIES_TOTAL: Counter =
        register_counter!("scriptorium_broadcast_deliveries_total", "Total number of broadcast messages delivered.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|e| format!("# failed to encode metrics: {e}\n"))
}
