// Performance metrics module
//
// Lightweight counters for monitoring the coordinator across a process
// lifetime. Requests are short-lived, so consumers hold the instance in an
// Arc and the counters are plain atomics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process-wide activity counters.
#[derive(Debug)]
pub struct Metrics {
    /// Pages run through the content processor
    pub pages_processed: AtomicU64,

    /// Form directives found by the scanner
    pub directives_matched: AtomicU64,

    /// Submissions accepted and appended to the log
    pub submissions_sent: AtomicU64,

    /// Submissions turned away by the anti-spam gate or validation
    pub submissions_rejected: AtomicU64,

    /// Successful settings saves from the panel
    pub config_saves: AtomicU64,

    /// Failed settings saves (permissions, disk)
    pub config_save_failures: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            pages_processed: AtomicU64::new(0),
            directives_matched: AtomicU64::new(0),
            submissions_sent: AtomicU64::new(0),
            submissions_rejected: AtomicU64::new(0),
            config_saves: AtomicU64::new(0),
            config_save_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_page_processed(&self, directives: u64) {
        self.pages_processed.fetch_add(1, Ordering::Relaxed);
        self.directives_matched.fetch_add(directives, Ordering::Relaxed);
    }

    pub fn record_submission_sent(&self) {
        self.submissions_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submission_rejected(&self) {
        self.submissions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_config_save(&self) {
        self.config_saves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_config_save_failure(&self) {
        self.config_save_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log a metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Pages: {} processed, {} directives matched",
            self.pages_processed.load(Ordering::Relaxed),
            self.directives_matched.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Submissions: {} sent, {} rejected",
            self.submissions_sent.load(Ordering::Relaxed),
            self.submissions_rejected.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Settings saves: {} ok, {} failed",
            self.config_saves.load(Ordering::Relaxed),
            self.config_save_failures.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
