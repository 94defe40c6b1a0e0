//! Scan progress reporting.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Progress information for an in-flight scan.
///
/// Counts are eventually consistent: crawlers bump them as they go and
/// readers poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProgress {
    /// Records emitted by crawlers so far.
    pub records_crawled: u64,
    /// Warnings encountered so far.
    pub warnings: u64,
    /// Roots whose crawl has finished.
    pub roots_done: usize,
    /// Roots being crawled.
    pub roots_total: usize,
    /// Time elapsed since the scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Calculate crawl rate in records per second.
    pub fn records_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.records_crawled as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Check if every root has finished crawling.
    pub fn crawl_finished(&self) -> bool {
        self.roots_done >= self.roots_total
    }
}

/// Shared counters updated by crawl tasks.
#[derive(Debug)]
pub struct ProgressTracker {
    start_time: Instant,
    records: AtomicU64,
    warnings: AtomicU64,
    roots_done: AtomicUsize,
    roots_total: usize,
}

impl ProgressTracker {
    pub fn new(roots_total: usize) -> Self {
        Self {
            start_time: Instant::now(),
            records: AtomicU64::new(0),
            warnings: AtomicU64::new(0),
            roots_done: AtomicUsize::new(0),
            roots_total,
        }
    }

    pub fn record_entry(&self) {
        self.records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_warning(&self) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn root_finished(&self) {
        self.roots_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            records_crawled: self.records.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            roots_done: self.roots_done.load(Ordering::Relaxed),
            roots_total: self.roots_total,
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(0)
    }
}
