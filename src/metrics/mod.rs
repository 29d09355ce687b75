//! Metrics module
//!
//! Prometheus counters and histograms for the intake pipeline.

pub mod server;

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    HistogramVec,
};

use crate::upload::FailureKind;

lazy_static! {
    // Per-part metrics
    pub static ref PARTS_TOTAL: CounterVec = register_counter_vec!(
        "upload_intake_parts_total",
        "File parts processed by outcome",
        &["status"]
    ).unwrap();

    pub static ref PART_FAILURES_TOTAL: CounterVec = register_counter_vec!(
        "upload_intake_part_failures_total",
        "Failed file parts by failure kind",
        &["kind"]
    ).unwrap();

    pub static ref STORED_BYTES_TOTAL: Counter = register_counter!(
        "upload_intake_stored_bytes_total",
        "Total bytes written to the destination directory"
    ).unwrap();

    // Per-request metrics
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "upload_intake_requests_total",
        "Upload requests by route and result",
        &["route", "result"]
    ).unwrap();

    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "upload_intake_request_duration_seconds",
        "Upload request handling duration in seconds",
        &["route"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    ).unwrap();

    pub static ref REJECTED_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "upload_intake_rejected_requests_total",
        "Requests rejected before intake (malformed body, size limit, method)",
        &["reason"]
    ).unwrap();
}

/// Record a stored part
pub fn record_part_stored(bytes: u64) {
    PARTS_TOTAL.with_label_values(&["stored"]).inc();
    STORED_BYTES_TOTAL.inc_by(bytes as f64);
}

/// Record a failed part
pub fn record_part_failure(kind: FailureKind) {
    PARTS_TOTAL.with_label_values(&["failed"]).inc();
    PART_FAILURES_TOTAL.with_label_values(&[kind.as_str()]).inc();
}

/// Record a processed request and its duration
pub fn record_request(route: &str, has_failure: bool, duration_secs: f64) {
    let result = if has_failure { "failure" } else { "success" };
    REQUESTS_TOTAL.with_label_values(&[route, result]).inc();
    REQUEST_DURATION
        .with_label_values(&[route])
        .observe(duration_secs);
}

/// Record a request rejected at the transport boundary
pub fn record_rejected_request(reason: &str) {
    REJECTED_REQUESTS_TOTAL.with_label_values(&[reason]).inc();
}
