//! Metrics instrumentation
//!
//! Counters go through the `metrics` facade; the embedding application
//! chooses the recorder. Without one installed these are no-ops.

/// Record one issued API request
pub fn record_request(endpoint: &str) {
    metrics::counter!("ollamactl_requests_total",
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}

/// Record one streamed record consumed
pub fn record_stream_record(operation: &'static str) {
    metrics::counter!("ollamactl_stream_records_total",
        "operation" => operation
    )
    .increment(1);
}

/// Record a line that failed JSON parsing and was skipped
pub fn record_malformed_line() {
    metrics::counter!("ollamactl_malformed_lines_total").increment(1);
}

/// Record a blob upload attempt
pub fn record_blob_upload(outcome: &'static str) {
    metrics::counter!("ollamactl_blob_uploads_total",
        "outcome" => outcome
    )
    .increment(1);
}
