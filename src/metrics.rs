// Performance metrics module
//
// Lightweight counters for observing the capture loop without locks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Loop metrics, tracked with atomics so the worker thread never blocks on
/// bookkeeping. Logged as a summary on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Completed loop iterations, successful or not.
    pub iterations: AtomicU64,

    /// Iterations skipped because the extracted text was unchanged, empty,
    /// or recognizer noise.
    pub unchanged_skips: AtomicU64,

    /// Successful translations published to the sink.
    pub translations_published: AtomicU64,

    /// Invalid-payload rejections from the translation service.
    pub invalid_payloads: AtomicU64,

    /// Transient failures recovered with a backoff.
    pub recovered_errors: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            iterations: AtomicU64::new(0),
            unchanged_skips: AtomicU64::new(0),
            translations_published: AtomicU64::new(0),
            invalid_payloads: AtomicU64::new(0),
            recovered_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unchanged_skip(&self) {
        self.unchanged_skips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_translation_published(&self) {
        self.translations_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_payload(&self) {
        self.invalid_payloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_recovered_error(&self) {
        self.recovered_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log a one-line summary of the counters.
    pub fn log_summary(&self) {
        tracing::info!(
            iterations = self.iterations.load(Ordering::Relaxed),
            unchanged_skips = self.unchanged_skips.load(Ordering::Relaxed),
            translations = self.translations_published.load(Ordering::Relaxed),
            invalid_payloads = self.invalid_payloads.load(Ordering::Relaxed),
            recovered_errors = self.recovered_errors.load(Ordering::Relaxed),
            uptime_secs = self.uptime().as_secs(),
            "Loop metrics summary"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
