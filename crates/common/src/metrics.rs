//! Prometheus metrics for outbound Engine API calls.
//!
//! Every engine call records its latency and, when it fails, bumps an error counter. Both series
//! are labelled by chain identity and logical endpoint name (e.g. `new_payload_v3`).

use std::time::Instant;

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramOpts, HistogramVec, IntCounterVec,
    Registry,
};

lazy_static! {
    /// Registry exposed to the scrape endpoint of the embedding process.
    pub static ref REGISTRY: Registry = Registry::new();

    /// Latency of engine calls, labels: chain, endpoint.
    pub static ref ENGINE_CALL_DURATION: HistogramVec = register_histogram_vec!(
        HistogramOpts::new(
            "interop_engine_call_duration_seconds",
            "Time spent on Engine API calls"
        )
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["chain", "endpoint"]
    )
    .unwrap();

    /// Failed engine calls, labels: chain, endpoint.
    pub static ref ENGINE_CALL_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "interop_engine_call_errors_total",
        "Total number of failed Engine API calls",
        &["chain", "endpoint"]
    )
    .unwrap();
}

/// Registers the engine metrics with [`REGISTRY`].
pub fn register_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(ENGINE_CALL_DURATION.clone()))?;
    REGISTRY.register(Box::new(ENGINE_CALL_ERRORS_TOTAL.clone()))?;
    Ok(())
}

/// Increments the error counter for `(chain, endpoint)`.
pub fn inc_engine_error(chain: &str, endpoint: &str) {
    ENGINE_CALL_ERRORS_TOTAL
        .with_label_values(&[chain, endpoint])
        .inc();
}

/// Starts a latency measurement for `(chain, endpoint)`, observed when the guard drops.
pub fn engine_call_timer(chain: &str, endpoint: &str) -> TimingGuard {
    TimingGuard::new(
        ENGINE_CALL_DURATION.clone(),
        vec![chain.to_owned(), endpoint.to_owned()],
    )
}

/// RAII guard recording the elapsed time into a histogram on drop.
#[derive(Debug)]
pub struct TimingGuard {
    start: Instant,
    histogram: HistogramVec,
    labels: Vec<String>,
}

impl TimingGuard {
    pub fn new(histogram: HistogramVec, labels: Vec<String>) -> Self {
        Self {
            start: Instant::now(),
            histogram,
            labels,
        }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        let label_refs: Vec<&str> = self.labels.iter().map(String::as_str).collect();
        self.histogram
            .with_label_values(&label_refs)
            .observe(duration);
    }
}
