//! Prometheus metrics for lineitem-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};
use service_core::middleware::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION};

/// Line item edits by owning table and outcome.
pub static LINE_ITEM_EDITS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "lineitem_edits_total",
        "Total number of line item edits",
        &["entity_table", "outcome"] // success, invalid, error
    )
    .expect("Failed to register lineitem_edits_total")
});

/// Rejected submissions by field.
pub static VALIDATION_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "lineitem_validation_failures_total",
        "Total number of rejected line item submissions by field",
        &["field"]
    )
    .expect("Failed to register lineitem_validation_failures_total")
});

/// Absolute contribution adjustment amounts by currency.
pub static LEDGER_ADJUSTMENT_AMOUNT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "lineitem_ledger_adjustment_amount_total",
        "Absolute contribution adjustment amount by currency",
        &["currency"]
    )
    .expect("Failed to register lineitem_ledger_adjustment_amount_total")
});

/// Dependent record updates by kind.
pub static DEPENDENT_UPDATES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "lineitem_dependent_updates_total",
        "Total number of membership and participant updates",
        &["kind"] // membership, participant
    )
    .expect("Failed to register lineitem_dependent_updates_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "lineitem_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&HTTP_REQUEST_DURATION);
    Lazy::force(&LINE_ITEM_EDITS_TOTAL);
    Lazy::force(&VALIDATION_FAILURES_TOTAL);
    Lazy::force(&LEDGER_ADJUSTMENT_AMOUNT_TOTAL);
    Lazy::force(&DEPENDENT_UPDATES_TOTAL);
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
