//! Crawl counters and periodic telemetry
//!
//! Counters are plain atomics shared between the dispatcher and the explorer
//! workers. The reporter task logs a snapshot at a fixed interval until the
//! crawl's cancellation token fires.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Crawl statistics (thread-safe)
#[derive(Debug, Default)]
pub struct CrawlMetrics {
    accepted: AtomicU64,
    duplicates: AtomicU64,
    links_discovered: AtomicU64,
    pages_explored: AtomicU64,
    fetch_failures: AtomicU64,
    explorers_in_flight: AtomicU64,
    records_written: AtomicU64,
    records_dropped: AtomicU64,
    pages_without_widget: AtomicU64,
    extractions_skipped: AtomicU64,
}

impl CrawlMetrics {
    /// Create new shared counters
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_links(&self, count: u64) {
        self.links_discovered.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn explorer_started(&self) {
        self.explorers_in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn explorer_finished(&self) {
        self.explorers_in_flight.fetch_sub(1, Ordering::Relaxed);
        self.pages_explored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_widget(&self) {
        self.pages_without_widget.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.extractions_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            links_discovered: self.links_discovered.load(Ordering::Relaxed),
            pages_explored: self.pages_explored.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            explorers_in_flight: self.explorers_in_flight.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            pages_without_widget: self.pages_without_widget.load(Ordering::Relaxed),
            extractions_skipped: self.extractions_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of crawl statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub accepted: u64,
    pub duplicates: u64,
    pub links_discovered: u64,
    pub pages_explored: u64,
    pub fetch_failures: u64,
    pub explorers_in_flight: u64,
    pub records_written: u64,
    pub records_dropped: u64,
    pub pages_without_widget: u64,
    pub extractions_skipped: u64,
}

impl MetricsSnapshot {
    /// Emit the snapshot as one structured log line
    pub fn log(&self, label: &str) {
        tracing::info!(
            accepted = self.accepted,
            duplicates = self.duplicates,
            links_discovered = self.links_discovered,
            pages_explored = self.pages_explored,
            fetch_failures = self.fetch_failures,
            explorers_in_flight = self.explorers_in_flight,
            records_written = self.records_written,
            records_dropped = self.records_dropped,
            pages_without_widget = self.pages_without_widget,
            extractions_skipped = self.extractions_skipped,
            "{label}"
        );
    }
}

/// Spawn the periodic reporter
pub fn spawn_reporter(
    metrics: Arc<CrawlMetrics>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately; the start snapshot is logged by the caller.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => metrics.snapshot().log("Crawl statistics"),
            }
        }
    })
}
