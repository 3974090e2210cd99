//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming. Recording is a no-op until
//! the gateway installs an exporter.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all DeedLens metrics
pub const METRICS_PREFIX: &str = "deedlens";

/// Histogram buckets for HTTP request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00, 30.00, 60.00,
];

/// Buckets for generation backend latency. Backends time out at 10s by default.
pub const BACKEND_BUCKETS: &[f64] = &[
    0.100, 0.250, 0.500, 1.000, 2.000, 4.000, 6.000, 8.000, 10.00, 15.00, 30.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Generation backend metrics
    describe_counter!(
        format!("{}_backend_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Generation backend calls by backend and outcome"
    );

    describe_histogram!(
        format!("{}_backend_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Generation backend latency in seconds"
    );

    describe_counter!(
        format!("{}_chain_exhausted_total", METRICS_PREFIX),
        Unit::Count,
        "Prompts for which every backend failed"
    );

    // Pipeline metrics
    describe_counter!(
        format!("{}_answers_total", METRICS_PREFIX),
        Unit::Count,
        "Answers produced, by source"
    );

    describe_counter!(
        format!("{}_fallback_extractions_total", METRICS_PREFIX),
        Unit::Count,
        "Regex fallback extractions, by strategy"
    );

    describe_counter!(
        format!("{}_documents_matched_total", METRICS_PREFIX),
        Unit::Count,
        "Documents selected for a query, by selection method"
    );

    // Audit metrics
    describe_counter!(
        format!("{}_audit_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Audit deliveries that failed"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record one backend call. `outcome` is "success" or a `ProviderError::kind`.
pub fn record_backend(backend: &str, outcome: &str, duration_secs: f64) {
    counter!(
        format!("{}_backend_requests_total", METRICS_PREFIX),
        "backend" => backend.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_backend_duration_seconds", METRICS_PREFIX),
        "backend" => backend.to_string()
    )
    .record(duration_secs);
}

pub fn record_chain_exhausted() {
    counter!(format!("{}_chain_exhausted_total", METRICS_PREFIX)).increment(1);
}

/// Record a final answer by source ("generated", "extracted", "none")
pub fn record_answer(source: &str, mode: &str) {
    counter!(
        format!("{}_answers_total", METRICS_PREFIX),
        "source" => source.to_string(),
        "mode" => mode.to_string()
    )
    .increment(1);
}

pub fn record_extraction(strategy: &str) {
    counter!(
        format!("{}_fallback_extractions_total", METRICS_PREFIX),
        "strategy" => strategy.to_string()
    )
    .increment(1);
}

/// Record how many documents a selection method produced
pub fn record_documents_matched(method: &str, count: usize) {
    counter!(
        format!("{}_documents_matched_total", METRICS_PREFIX),
        "method" => method.to_string()
    )
    .increment(count as u64);
}

pub fn record_audit_failure(sink: &str) {
    counter!(
        format!("{}_audit_failures_total", METRICS_PREFIX),
        "sink" => sink.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_sorted() {
        for buckets in [LATENCY_BUCKETS, BACKEND_BUCKETS] {
            let mut prev = 0.0;
            for &bucket in buckets {
                assert!(bucket > prev);
                prev = bucket;
            }
        }
        // Default backend timeout should be a bucket edge
        assert!(BACKEND_BUCKETS.contains(&10.00));
    }

    #[test]
    fn test_recording_without_exporter() {
        let metrics = RequestMetrics::start("POST", "/v1/ask");
        metrics.finish(200);
        record_backend("ollama", "timeout", 10.0);
        record_answer("extracted", "grounded");
        // Just verify it runs without panic
    }
}
