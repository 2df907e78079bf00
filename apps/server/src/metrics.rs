//! Prometheus metrics for search and container rendering.

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, Encoder, Histogram,
    HistogramVec, IntCounterVec, TextEncoder,
};

lazy_static! {
    /// Searches by outcome (`ok` or the error kind)
    pub static ref SEARCH_TOTAL: IntCounterVec = register_int_counter_vec!(
        "explicates_search_total",
        "Total number of annotation searches",
        &["status"]
    )
    .expect("Failed to register SEARCH_TOTAL");

    /// Search duration including count and fetch
    pub static ref SEARCH_DURATION_SECONDS: Histogram = register_histogram!(
        "explicates_search_duration_seconds",
        "Annotation search duration in seconds",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register SEARCH_DURATION_SECONDS");

    /// Rows returned per search (after offset/limit)
    pub static ref SEARCH_RESULTS: Histogram = register_histogram!(
        "explicates_search_results",
        "Number of annotations returned by search",
        vec![0.0, 1.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0]
    )
    .expect("Failed to register SEARCH_RESULTS");

    /// Number of clauses in the combined predicate
    pub static ref SEARCH_CLAUSES: HistogramVec = register_histogram_vec!(
        "explicates_search_clauses",
        "Number of clauses per search predicate by clause kind",
        &["kind"],
        vec![0.0, 1.0, 2.0, 4.0, 8.0, 16.0]
    )
    .expect("Failed to register SEARCH_CLAUSES");

    /// Container and page renders by kind (`container`, `page`) and outcome
    pub static ref CONTAINER_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "explicates_container_requests_total",
        "Total number of container and page renders",
        &["kind", "status"]
    )
    .expect("Failed to register CONTAINER_REQUESTS_TOTAL");
}

/// Outcome label for a result.
pub fn status_label<T>(result: &crate::Result<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    }
}

/// Encode all registered metrics in the Prometheus text format.
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
