//! Metrics collection.
//!
//! # Metrics
//! - `swap_quotes_total` (counter): quote results by outcome (ok, no_route)
//! - `swap_stale_results_total` (counter): discarded results by kind
//! - `swap_transactions_total` (counter): approvals/swaps by outcome
//! - `swap_session_connected` (gauge): 1=connected, 0=disconnected
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; no-ops until a recorder is
//!   installed

/// Record a committed quote result.
pub fn record_quote(outcome: &'static str) {
    metrics::counter!("swap_quotes_total", "outcome" => outcome).increment(1);
}

/// Record a result dropped because a newer request or session superseded it.
pub fn record_stale(kind: &'static str) {
    metrics::counter!("swap_stale_results_total", "kind" => kind).increment(1);
}

/// Record the outcome of a write transaction.
pub fn record_transaction(kind: &'static str, outcome: &'static str) {
    metrics::counter!("swap_transactions_total", "kind" => kind, "outcome" => outcome)
        .increment(1);
}

/// Record session connectivity.
pub fn set_connected(connected: bool) {
    metrics::gauge!("swap_session_connected").set(if connected { 1.0 } else { 0.0 });
}
