//! Prometheus metrics for accounting-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Journal entry counter by entry type.
pub static JOURNAL_ENTRIES_POSTED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "accounting_journal_entries_posted_total",
        "Total number of journal entries posted",
        &["entry_type"]
    )
    .expect("Failed to register journal_entries_posted")
});

/// Ledger row counter by ledger side and direction.
pub static LEDGER_ENTRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "accounting_ledger_entries_total",
        "Total number of running-balance ledger rows appended",
        &["ledger", "direction"]  // receivable/supplier, debit/credit
    )
    .expect("Failed to register ledger_entries_total")
});

/// Reconciliation passes that found and corrected drift.
pub static BALANCE_DRIFT_CORRECTED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "accounting_balance_drift_corrected_total",
        "Cached outstanding balances rewritten from the ledger",
        &["ledger"]
    )
    .expect("Failed to register balance_drift_corrected")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "accounting_errors_total",
        "Total number of errors by type",
        &["error_type"]  // db_error, validation_error, etc.
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "accounting_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&JOURNAL_ENTRIES_POSTED);
    Lazy::force(&LEDGER_ENTRIES_TOTAL);
    Lazy::force(&BALANCE_DRIFT_CORRECTED);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
