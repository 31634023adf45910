//! Crawl dispatcher
//!
//! The dispatcher is the only owner of the visited set. It pulls URLs from an
//! unbounded inbox, drops the ones it has already seen, queues each new one for
//! discovery and then extracts it, one URL at a time. The loop ends when the
//! [`CompletionMonitor`] says so, or with an error on a fatal render fault.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::CrawlerConfig;
use crate::crawler::explorer::{Explore, ExplorerPool};
use crate::crawler::monitor::{Completion, CompletionMonitor, StopReason, UrlVerdict};
use crate::error::Result;
use crate::extract::Extract;
use crate::metrics::CrawlMetrics;
use crate::models::ExtractionOutcome;
use crate::storage::RecordSink;

/// Discovery pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    pub explorer_workers: usize,
    pub queue_capacity: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from(&CrawlerConfig::default())
    }
}

impl From<&CrawlerConfig> for DispatchSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            explorer_workers: config.explorer_workers,
            queue_capacity: config.explore_queue_capacity,
        }
    }
}

/// What a finished dispatch loop hands back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub stop_reason: StopReason,
    /// Size of the visited set when the crawl ended
    pub visited: usize,
    /// Accepted URLs in acceptance order
    pub processed: Vec<String>,
}

/// Dedup actor driving discovery and extraction
pub struct Dispatcher<X, R, S> {
    explorer: Arc<X>,
    extractor: R,
    sink: S,
    monitor: CompletionMonitor,
    settings: DispatchSettings,
    metrics: Arc<CrawlMetrics>,
    visited: HashSet<String>,
    processed: Vec<String>,
}

impl<X, R, S> Dispatcher<X, R, S>
where
    X: Explore,
    R: Extract,
    S: RecordSink,
{
    pub fn new(
        explorer: Arc<X>,
        extractor: R,
        sink: S,
        monitor: CompletionMonitor,
        settings: DispatchSettings,
        metrics: Arc<CrawlMetrics>,
    ) -> Self {
        Self {
            explorer,
            extractor,
            sink,
            monitor,
            settings,
            metrics,
            visited: HashSet::new(),
            processed: Vec::new(),
        }
    }

    /// Crawl from `seed` until the monitor ends the crawl
    ///
    /// `shutdown` is the external interrupt. The explorer pool and any
    /// in-flight extraction are cancelled before this returns, on success and
    /// on error alike.
    ///
    /// # Errors
    ///
    /// Returns the first render fault that is neither an absent element in
    /// the presence check nor scoped to a single page.
    pub async fn run(mut self, seed: &str, shutdown: &CancellationToken) -> Result<DispatchResult> {
        let cancel = shutdown.child_token();
        let (inbox_tx, mut inbox) = mpsc::unbounded_channel();
        let _ = inbox_tx.send(seed.to_string());

        let pool = ExplorerPool::spawn(
            Arc::clone(&self.explorer),
            self.settings.explorer_workers,
            self.settings.queue_capacity,
            inbox_tx,
            Arc::clone(&self.metrics),
            cancel.clone(),
        );

        tracing::info!(
            seed = %seed,
            workers = self.settings.explorer_workers,
            idle_secs = self.monitor.idle_window().as_secs(),
            "Dispatcher started"
        );

        let outcome = self.dispatch(&mut inbox, &pool, shutdown, &cancel).await;

        cancel.cancel();
        drop(inbox);
        pool.shutdown().await;

        let completion = outcome?;
        Ok(DispatchResult {
            stop_reason: completion.reason,
            visited: completion.visited,
            processed: self.processed,
        })
    }

    async fn dispatch(
        &mut self,
        inbox: &mut mpsc::UnboundedReceiver<String>,
        pool: &ExplorerPool,
        shutdown: &CancellationToken,
        cancel: &CancellationToken,
    ) -> Result<Completion> {
        loop {
            let now = Instant::now();
            if let Some(reason) = self.monitor.deadline_reached(now) {
                return Ok(self.finish(reason));
            }
            let wait = self.monitor.next_wait(now);

            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(self.finish(StopReason::Interrupted)),
                received = tokio::time::timeout(wait, inbox.recv()) => received,
            };

            let url = match received {
                Ok(Some(url)) => url,
                Ok(None) => return Ok(self.finish(StopReason::InboxClosed)),
                Err(_) => {
                    // The wait may have been cut short by a deadline; the loop head handles it.
                    if self.monitor.deadline_reached(Instant::now()).is_some() {
                        continue;
                    }
                    return Ok(self.finish(StopReason::Idle));
                }
            };

            if self.visited.contains(&url) {
                self.metrics.record_duplicate();
                continue;
            }

            let verdict = self.monitor.check_url(&url);
            if verdict == UrlVerdict::CancelBefore {
                tracing::info!(url = %url, "Cancel-at URL reached");
                return Ok(self.finish(StopReason::CancelAtUrl));
            }

            // A full queue blocks here; the time triggers still apply.
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(self.finish(StopReason::Interrupted)),
                submitted = pool.submit(url.clone()) => {
                    if !submitted {
                        tracing::debug!(url = %url, "Explorer pool closed; skipping discovery");
                    }
                }
                reason = fire_at(self.monitor.next_deadline()) => {
                    tracing::info!(url = %url, reason = %reason, "Deadline passed waiting for the explore queue");
                    return Ok(self.finish(reason));
                }
            }

            self.visited.insert(url.clone());
            self.processed.push(url.clone());
            self.metrics.record_accepted();

            if let Some(reason) = self.extract(&url, shutdown, cancel).await? {
                return Ok(self.finish(reason));
            }

            if verdict == UrlVerdict::StopAfterProcessing {
                tracing::info!(url = %url, "Stop-at URL processed");
                return Ok(self.finish(StopReason::StopAtUrl));
            }
        }
    }

    /// Extract one URL; `Some` when a cancel trigger fired while it ran
    async fn extract(
        &mut self,
        url: &str,
        shutdown: &CancellationToken,
        cancel: &CancellationToken,
    ) -> Result<Option<StopReason>> {
        let deadline = self
            .monitor
            .cancel_deadline()
            .map(|at| (at, StopReason::CancelAfter));

        let (outcome, aborted) = {
            let extraction = self.extractor.extract(url, cancel);
            let cancel_timer = fire_at(deadline);
            tokio::pin!(extraction, cancel_timer);

            tokio::select! {
                biased;
                outcome = &mut extraction => (outcome, None),
                reason = &mut cancel_timer => {
                    cancel.cancel();
                    (extraction.await, Some(reason))
                }
                // `cancel` is a child of `shutdown`, so the extraction sees this too.
                _ = shutdown.cancelled() => (extraction.await, Some(StopReason::Interrupted)),
            }
        };

        match outcome {
            Ok(ExtractionOutcome::Record(record)) => match self.sink.write_record(&record) {
                Ok(()) => {
                    self.metrics.record_written();
                    tracing::info!(
                        url = %url,
                        product_id = record.product_id(),
                        videos = record.video_links().len(),
                        "Product record written"
                    );
                }
                Err(e) => {
                    self.metrics.record_dropped();
                    tracing::warn!(url = %url, error = %e, "Record dropped");
                }
            },
            Ok(ExtractionOutcome::NoWidget) => self.metrics.record_no_widget(),
            Ok(ExtractionOutcome::Skipped { reason }) => {
                self.metrics.record_skipped();
                tracing::debug!(url = %url, reason = %reason, "Extraction skipped");
            }
            Ok(ExtractionOutcome::Cancelled) => {
                tracing::debug!(url = %url, "Extraction cancelled");
            }
            Err(e) if aborted.is_some() => {
                tracing::debug!(url = %url, error = %e, "Render fault while cancelling");
            }
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Fatal render fault");
                return Err(e.into());
            }
        }

        Ok(aborted.or_else(|| shutdown.is_cancelled().then_some(StopReason::Interrupted)))
    }

    fn finish(&mut self, reason: StopReason) -> Completion {
        self.monitor.finish(reason, self.visited.len())
    }
}

/// Resolve with the trigger's reason once its instant passes, or never
async fn fire_at(deadline: Option<(Instant, StopReason)>) -> StopReason {
    match deadline {
        Some((at, reason)) => {
            tokio::time::sleep_until(at).await;
            reason
        }
        None => std::future::pending().await,
    }
}
