//! Prometheus metrics for the quoter.
//!
//! The strategy core is metric-free; the host records these from the
//! outcomes the controller returns.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means a duplicate metric
//! name, which is a programming error and only surfaces on first access.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge_vec, CounterVec,
    Encoder, HistogramVec, IntGaugeVec, TextEncoder,
};

use crate::error::TelemetryResult;

/// Top-of-book updates by whether the book moved.
/// Labels: instrument, outcome (changed/unchanged)
pub static BOOK_UPDATES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoter_book_updates_total",
        "Total top-of-book updates received",
        &["instrument", "outcome"]
    )
    .unwrap()
});

/// Order nacks by kind.
/// Labels: instrument, kind (NewOrderNack/AmendNack)
pub static NACKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoter_nacks_total",
        "Total order nacks received",
        &["instrument", "kind"]
    )
    .unwrap()
});

/// Ledger rejections of order-lifecycle updates.
pub static ROUTING_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoter_routing_errors_total",
        "Total order-lifecycle updates the ledger rejected",
        &["instrument", "variant"]
    )
    .unwrap()
});

/// Amend batches submitted.
pub static AMEND_BATCHES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoter_amend_batches_total",
        "Total amend batches submitted",
        &["instrument"]
    )
    .unwrap()
});

/// Orders carried by submitted amend batches.
pub static AMEND_ORDERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoter_amend_orders_total",
        "Total orders sent in amend batches",
        &["instrument"]
    )
    .unwrap()
});

/// Ticks deferred because the previous batch had not settled.
pub static AMEND_DEFERRED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoter_amend_deferred_total",
        "Total amend cycles deferred on an unsettled batch",
        &["instrument"]
    )
    .unwrap()
});

/// Stale amend batches escalated to recovery.
pub static STALE_ESCALATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoter_stale_escalations_total",
        "Total amend batches escalated as stale",
        &["instrument"]
    )
    .unwrap()
});

/// Recoveries by outcome.
/// Labels: instrument, outcome (reconnected/stopped/exhausted/stop_cancel_failed)
pub static RECOVERY_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoter_recovery_total",
        "Total recoveries by outcome",
        &["instrument", "outcome"]
    )
    .unwrap()
});

/// Attempts needed by successful recoveries.
pub static RECOVERY_ATTEMPTS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "quoter_recovery_attempts",
        "Attempts used by successful recoveries",
        &["instrument"],
        vec![1.0, 2.0, 3.0, 4.0, 5.0]
    )
    .unwrap()
});

/// Strategy active state (1 = quoting, 0 = stopped).
pub static STRATEGY_ACTIVE: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "quoter_strategy_active",
        "Strategy active state (1=active)",
        &["instrument"]
    )
    .unwrap()
});

/// Orders the ledger tracks as live.
pub static LIVE_ORDERS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "quoter_live_orders",
        "Orders currently tracked as live",
        &["instrument"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a top-of-book update.
    pub fn book_update(instrument: &str, changed: bool) {
        let outcome = if changed { "changed" } else { "unchanged" };
        BOOK_UPDATES_TOTAL
            .with_label_values(&[instrument, outcome])
            .inc();
    }

    /// Record an order nack.
    pub fn nack(instrument: &str, kind: &str) {
        NACKS_TOTAL.with_label_values(&[instrument, kind]).inc();
    }

    pub fn routing_error(instrument: &str, variant: &str) {
        ROUTING_ERRORS_TOTAL
            .with_label_values(&[instrument, variant])
            .inc();
    }

    /// Record a submitted amend batch of `orders` orders.
    pub fn amend_sent(instrument: &str, orders: usize) {
        AMEND_BATCHES_TOTAL.with_label_values(&[instrument]).inc();
        AMEND_ORDERS_TOTAL
            .with_label_values(&[instrument])
            .inc_by(orders as f64);
    }

    pub fn amend_deferred(instrument: &str) {
        AMEND_DEFERRED_TOTAL.with_label_values(&[instrument]).inc();
    }

    pub fn stale_escalation(instrument: &str) {
        STALE_ESCALATIONS_TOTAL
            .with_label_values(&[instrument])
            .inc();
    }

    /// Record a successful reconnect after `attempts` attempts.
    pub fn recovery_reconnected(instrument: &str, attempts: u32) {
        RECOVERY_TOTAL
            .with_label_values(&[instrument, "reconnected"])
            .inc();
        RECOVERY_ATTEMPTS
            .with_label_values(&[instrument])
            .observe(f64::from(attempts));
    }

    /// Record a recovery that ended without reconnecting.
    /// `outcome` is one of stopped, exhausted, stop_cancel_failed.
    pub fn recovery_ended(instrument: &str, outcome: &str) {
        RECOVERY_TOTAL
            .with_label_values(&[instrument, outcome])
            .inc();
    }

    pub fn strategy_active(instrument: &str, active: bool) {
        STRATEGY_ACTIVE
            .with_label_values(&[instrument])
            .set(i64::from(active));
    }

    pub fn live_orders(instrument: &str, count: usize) {
        LIVE_ORDERS
            .with_label_values(&[instrument])
            .set(count as i64);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
