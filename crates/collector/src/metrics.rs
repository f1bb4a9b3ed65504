use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

pub static FETCH_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "devpulse_fetch_requests_total",
        "Calls to the hosting API grouped by endpoint (repo/pulls/issues) and outcome",
        &["endpoint", "outcome"]
    )
    .expect("devpulse fetch requests total")
});

pub static FETCH_LATENCY_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "devpulse_fetch_latency_seconds",
        "Latency of complete (all pages) hosting API listings grouped by endpoint",
        &["endpoint"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("devpulse fetch latency seconds")
});

pub static CACHE_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "devpulse_fetch_cache_lookups_total",
        "Fetch cache lookups grouped by result (hit/miss)",
        &["result"]
    )
    .expect("devpulse fetch cache lookups total")
});

pub static RECORDS_FETCHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "devpulse_records_fetched_total",
        "Records normalized successfully grouped by kind",
        &["kind"]
    )
    .expect("devpulse records fetched total")
});

pub static RECORDS_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "devpulse_records_rejected_total",
        "Malformed records dropped during normalization grouped by kind",
        &["kind"]
    )
    .expect("devpulse records rejected total")
});
