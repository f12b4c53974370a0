//! Prometheus metrics for the engine.
//!
//! This module provides metrics for:
//! - Scratch scopes (created, released, cleanup failures)
//! - Copies into scratch space
//! - Unit operation executions by outcome

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Scratch scopes
// =============================================================================

/// Scratch scope lifecycle events.
pub static SCRATCH_SCOPES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "rasterchain_scratch_scopes_total",
            "Scratch scope lifecycle events",
        ),
        &["event"], // "created", "released"
    )
    .unwrap()
});

/// Scratch directories that could not be removed.
pub static SCRATCH_CLEANUP_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "rasterchain_scratch_cleanup_failures_total",
        "Scratch directories that could not be removed",
    )
    .unwrap()
});

// =============================================================================
// Copies
// =============================================================================

/// Completed copies into scratch space by result.
pub static COPIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("rasterchain_copies_total", "Copies into scratch space"),
        &["result"], // "success", "error"
    )
    .unwrap()
});

/// Bytes written into scratch space by the copier.
pub static COPY_BYTES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "rasterchain_copy_bytes_total",
        "Bytes copied into scratch space",
    )
    .unwrap()
});

// =============================================================================
// Unit operations
// =============================================================================

/// Unit operation executions by outcome.
pub static OPERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "rasterchain_operations_total",
            "Unit operation executions by outcome",
        ),
        &["program", "outcome"], // outcome: "succeeded", "failed", "skipped"
    )
    .unwrap()
});

/// Wall time of external command invocations.
pub static OPERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "rasterchain_operation_duration_seconds",
            "Duration of external command invocations",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
        &["program"],
    )
    .unwrap()
});

/// Get all engine metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(SCRATCH_SCOPES.clone()),
        Box::new(SCRATCH_CLEANUP_FAILURES.clone()),
        Box::new(COPIES_TOTAL.clone()),
        Box::new(COPY_BYTES.clone()),
        Box::new(OPERATIONS_TOTAL.clone()),
        Box::new(OPERATION_DURATION.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        SCRATCH_SCOPES.with_label_values(&["created"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "rasterchain_scratch_scopes_total"));
    }
}
