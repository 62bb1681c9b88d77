//! Prometheus metrics for the bridge orchestrator.
//!
//! Exposed on the /metrics endpoint for scraping.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Gauge, HistogramVec,
};

lazy_static! {
    // Attempt outcomes
    pub static ref BRIDGES_ATTEMPTED: CounterVec = register_counter_vec!(
        "bridge_attempts_total",
        "Total number of bridge attempts started",
        &["direction"]
    ).unwrap();

    pub static ref BRIDGES_COMPLETED: CounterVec = register_counter_vec!(
        "bridge_completed_total",
        "Total number of bridge attempts confirmed on the source ledger",
        &["direction"]
    ).unwrap();

    pub static ref BRIDGES_CANCELLED: CounterVec = register_counter_vec!(
        "bridge_cancelled_total",
        "Total number of bridge attempts cancelled in the wallet",
        &["direction"]
    ).unwrap();

    pub static ref BRIDGES_FAILED: CounterVec = register_counter_vec!(
        "bridge_failed_total",
        "Total number of failed bridge attempts",
        &["direction", "kind"]
    ).unwrap();

    // Collaborator errors
    pub static ref RELAY_ERRORS: CounterVec = register_counter_vec!(
        "bridge_relay_errors_total",
        "Total number of deposit relay errors",
        &["operation"]
    ).unwrap();

    pub static ref WALLET_ERRORS: CounterVec = register_counter_vec!(
        "bridge_wallet_errors_total",
        "Total number of wallet provider errors",
        &["network", "kind"]
    ).unwrap();

    // Latency from attempt start to source-ledger confirmation
    pub static ref BRIDGE_LATENCY: HistogramVec = register_histogram_vec!(
        "bridge_attempt_latency_seconds",
        "Time from attempt start to source-side confirmation",
        &["direction"],
        vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]
    ).unwrap();

    // Volume
    pub static ref VOLUME_BRIDGED: CounterVec = register_counter_vec!(
        "bridge_volume_total",
        "Total volume bridged (in display units)",
        &["direction"]
    ).unwrap();

    // Health
    pub static ref UP: Gauge = register_gauge!(
        "bridge_up",
        "Whether the bridge orchestrator is up and running"
    ).unwrap();
}

/// Record an attempt starting.
pub fn record_bridge_attempt(direction: &str) {
    BRIDGES_ATTEMPTED.with_label_values(&[direction]).inc();
}

/// Record a confirmed attempt and its latency.
pub fn record_bridge_completed(direction: &str, seconds: f64) {
    BRIDGES_COMPLETED.with_label_values(&[direction]).inc();
    BRIDGE_LATENCY
        .with_label_values(&[direction])
        .observe(seconds);
}

/// Record a wallet-cancelled attempt.
pub fn record_bridge_cancelled(direction: &str) {
    BRIDGES_CANCELLED.with_label_values(&[direction]).inc();
}

/// Record a failed attempt by error kind.
pub fn record_bridge_failed(direction: &str, kind: &str) {
    BRIDGES_FAILED.with_label_values(&[direction, kind]).inc();
}

/// Record a relay error by operation.
pub fn record_relay_error(operation: &str) {
    RELAY_ERRORS.with_label_values(&[operation]).inc();
}

/// Record a wallet provider error.
pub fn record_wallet_error(network: &str, kind: &str) {
    WALLET_ERRORS.with_label_values(&[network, kind]).inc();
}

/// Record bridged volume in display units.
pub fn record_volume(direction: &str, amount: f64) {
    VOLUME_BRIDGED.with_label_values(&[direction]).inc_by(amount);
}
