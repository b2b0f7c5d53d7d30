//! Prometheus metrics for the dexmm market making bots.
//!
//! Covers the rebalance loop:
//! - Rebalance outcomes and skipped (overlapping) cycles
//! - Pre-order problems by kind
//! - Placements submitted per side
//! - Latest basis price and fee gap per market
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, GaugeVec,
    HistogramVec,
};

/// Rebalance cycles by outcome.
/// Labels: market, outcome (placed/pre_order_failure/unhealthy)
pub static REBALANCE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexmm_rebalance_total",
        "Total rebalance cycles by outcome",
        &["market", "outcome"]
    )
    .unwrap()
});

/// Rebalances skipped because one was already running.
pub static REBALANCE_SKIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexmm_rebalance_skipped_total",
        "Rebalances skipped because another was in progress",
        &["market"]
    )
    .unwrap()
});

/// Rebalance wall time in milliseconds.
pub static REBALANCE_DURATION_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dexmm_rebalance_duration_ms",
        "Rebalance duration in milliseconds",
        &["market"],
        vec![1.0, 5.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0]
    )
    .unwrap()
});

/// Pre-order problems by kind.
pub static PRE_ORDER_PROBLEMS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexmm_pre_order_problems_total",
        "Epochs with no placements attempted, by problem kind",
        &["market", "kind"]
    )
    .unwrap()
});

/// Placement rungs submitted to the trading engine.
pub static PLACEMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexmm_placements_total",
        "Placement rungs with nonzero lots submitted",
        &["market", "side"]
    )
    .unwrap()
});

/// Latest basis price (message rate).
pub static BASIS_PRICE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "dexmm_basis_price",
        "Latest basis price as a message rate",
        &["market"]
    )
    .unwrap()
});

/// Latest fee gap (message rate).
pub static FEE_GAP: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "dexmm_fee_gap",
        "Latest fee gap as a message rate",
        &["market"]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a completed rebalance.
    pub fn rebalance(market: &str, outcome: &str, duration_ms: f64) {
        REBALANCE_TOTAL
            .with_label_values(&[market, outcome])
            .inc();
        REBALANCE_DURATION_MS
            .with_label_values(&[market])
            .observe(duration_ms);
    }

    /// Record a rebalance skipped by the single-flight guard.
    pub fn rebalance_skipped(market: &str) {
        REBALANCE_SKIPPED_TOTAL.with_label_values(&[market]).inc();
    }

    pub fn pre_order_problem(market: &str, kind: &str) {
        PRE_ORDER_PROBLEMS_TOTAL
            .with_label_values(&[market, kind])
            .inc();
    }

    /// Record `count` placements submitted on `side` ("buy"/"sell").
    pub fn placements(market: &str, side: &str, count: usize) {
        PLACEMENTS_TOTAL
            .with_label_values(&[market, side])
            .inc_by(count as f64);
    }

    pub fn basis_price(market: &str, rate: u64) {
        BASIS_PRICE.with_label_values(&[market]).set(rate as f64);
    }

    pub fn fee_gap(market: &str, gap: u64) {
        FEE_GAP.with_label_values(&[market]).set(gap as f64);
    }
}
