//! Prometheus metrics for the sync pipeline.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};

/// Markets written by upsert transactions.
pub static MARKETS_UPSERTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "mms_markets_upserted_total",
        "Markets included in upsert transactions"
    )
    .unwrap()
});

/// Disabled on-chain markets reported for removal.
pub static MARKETS_REMOVED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "mms_markets_removed_total",
        "Disabled on-chain markets absent from the generated map"
    )
    .unwrap()
});

pub static MESSAGES_BUILT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("mms_messages_built_total", "Upsert messages built").unwrap()
});

pub static TXS_SIGNED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("mms_txs_signed_total", "Transactions signed").unwrap()
});

/// Submission outcomes.
/// Labels: outcome (included/check_tx_failed/deliver_tx_failed/timed_out/broadcast_failed/cancelled)
pub static TXS_SUBMITTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mms_txs_submitted_total",
        "Transaction submissions by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Broadcast-to-inclusion latency.
pub static INCLUSION_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "mms_inclusion_latency_ms",
        "Time from broadcast to inclusion in milliseconds",
        vec![500.0, 1_000.0, 2_000.0, 5_000.0, 10_000.0, 20_000.0, 30_000.0, 60_000.0]
    )
    .unwrap()
});

/// Submission outcome label for an included transaction.
pub const OUTCOME_INCLUDED: &str = "included";

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    pub fn record_markets_upserted(count: usize) {
        MARKETS_UPSERTED_TOTAL.inc_by(count as u64);
    }

    pub fn record_markets_removed(count: usize) {
        MARKETS_REMOVED_TOTAL.inc_by(count as u64);
    }

    pub fn record_messages_built(count: usize) {
        MESSAGES_BUILT_TOTAL.inc_by(count as u64);
    }

    pub fn record_txs_signed(count: usize) {
        TXS_SIGNED_TOTAL.inc_by(count as u64);
    }

    /// Record an included transaction and its latency.
    pub fn record_tx_included(latency_ms: f64) {
        TXS_SUBMITTED_TOTAL
            .with_label_values(&[OUTCOME_INCLUDED])
            .inc();
        INCLUSION_LATENCY_MS.observe(latency_ms);
    }

    /// Record a failed submission.
    pub fn record_tx_failed(outcome: &str) {
        TXS_SUBMITTED_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Render the default registry in text exposition format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increase() {
        let before = MARKETS_UPSERTED_TOTAL.get();
        Metrics::record_markets_upserted(3);
        assert_eq!(MARKETS_UPSERTED_TOTAL.get(), before + 3);
    }

    #[test]
    fn test_submission_outcomes() {
        let before = TXS_SUBMITTED_TOTAL.with_label_values(&["timed_out"]).get();
        Metrics::record_tx_failed("timed_out");
        assert_eq!(
            TXS_SUBMITTED_TOTAL.with_label_values(&["timed_out"]).get(),
            before + 1
        );

        let observed = INCLUSION_LATENCY_MS.get_sample_count();
        Metrics::record_tx_included(1_500.0);
        assert_eq!(INCLUSION_LATENCY_MS.get_sample_count(), observed + 1);
    }

    #[test]
    fn test_render_contains_metric_names() {
        Metrics::record_messages_built(1);
        let text = Metrics::render().unwrap();
        assert!(text.contains("mms_messages_built_total"));
    }
}
