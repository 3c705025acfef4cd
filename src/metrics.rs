// Preview metrics module
//
// Lightweight counters over preview outcomes, shared by the controller and
// the binary for an end-of-run summary.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Preview workflow metrics
///
/// Uses atomic operations for thread-safe metric tracking without locks.
#[derive(Debug)]
pub struct Metrics {
    /// Preview requests accepted by the controller
    pub previews_started: AtomicUsize,

    /// Previews that produced an image
    pub previews_succeeded: AtomicUsize,

    /// Previews that ended in an error status
    pub previews_failed: AtomicUsize,

    /// Previews cancelled explicitly or replaced by a newer request
    pub previews_cancelled: AtomicUsize,

    /// Start requests refused before a preview was created
    pub starts_rejected: AtomicUsize,

    /// Scan calls timed, whatever their outcome
    pub scans_timed: AtomicUsize,

    /// Time spent inside the external scan call, in milliseconds
    pub total_scan_time_ms: AtomicU64,

    /// Status events handed to the listener
    pub status_events: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            previews_started: AtomicUsize::new(0),
            previews_succeeded: AtomicUsize::new(0),
            previews_failed: AtomicUsize::new(0),
            previews_cancelled: AtomicUsize::new(0),
            starts_rejected: AtomicUsize::new(0),
            scans_timed: AtomicUsize::new(0),
            total_scan_time_ms: AtomicU64::new(0),
            status_events: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_started(&self) {
        self.previews_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_succeeded(&self) {
        self.previews_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.previews_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.previews_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.starts_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan_time(&self, duration: Duration) {
        self.scans_timed.fetch_add(1, Ordering::Relaxed);
        self.total_scan_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_status_event(&self) {
        self.status_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average time per scan call in milliseconds, failed scans included
    pub fn avg_scan_time_ms(&self) -> f64 {
        let total = self.total_scan_time_ms.load(Ordering::Relaxed);
        let count = self.scans_timed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Preview Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Previews: {} started, {} succeeded, {} failed, {} cancelled, {} rejected",
            self.previews_started.load(Ordering::Relaxed),
            self.previews_succeeded.load(Ordering::Relaxed),
            self.previews_failed.load(Ordering::Relaxed),
            self.previews_cancelled.load(Ordering::Relaxed),
            self.starts_rejected.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Scan time: {:.2}s over {} scans (avg: {:.2}ms), status events: {}",
            self.total_scan_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.scans_timed.load(Ordering::Relaxed),
            self.avg_scan_time_ms(),
            self.status_events.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
