//! Crawl completion detection
//!
//! The dispatcher consults a [`CompletionMonitor`] on its control path. The
//! monitor owns the idle window and the stop/cancel triggers, and it records
//! the reason the crawl ended exactly once.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::LimitsConfig;

/// Why a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No URL arrived within the idle window
    Idle,
    /// `stop_after` elapsed; the in-flight extraction was allowed to finish
    StopAfter,
    /// `cancel_after` elapsed; the in-flight extraction was aborted
    CancelAfter,
    /// The `stop_at` URL was processed
    StopAtUrl,
    /// The `cancel_at` URL arrived and was not processed
    CancelAtUrl,
    /// Interrupted from outside (Ctrl-C)
    Interrupted,
    /// Every inbox sender went away
    InboxClosed,
}

impl StopReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::StopAfter => "stop_after",
            Self::CancelAfter => "cancel_after",
            Self::StopAtUrl => "stop_at_url",
            Self::CancelAtUrl => "cancel_at_url",
            Self::Interrupted => "interrupted",
            Self::InboxClosed => "inbox_closed",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse limits on a crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlLimits {
    pub stop_after: Option<Duration>,
    pub cancel_after: Option<Duration>,
    pub stop_at: Option<String>,
    pub cancel_at: Option<String>,
}

impl From<&LimitsConfig> for CrawlLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            stop_after: config.stop_after_secs.map(Duration::from_secs),
            cancel_after: config.cancel_after_secs.map(Duration::from_secs),
            stop_at: config.stop_at.clone(),
            cancel_at: config.cancel_at.clone(),
        }
    }
}

/// What to do with a newly accepted URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlVerdict {
    /// Process it and carry on
    Continue,
    /// Process it, then end the crawl
    StopAfterProcessing,
    /// End the crawl without processing it
    CancelBefore,
}

/// How a crawl ended and how many URLs it had accepted by then
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub reason: StopReason,
    pub visited: usize,
}

/// Idle window and trigger bookkeeping for one crawl
#[derive(Debug)]
pub struct CompletionMonitor {
    idle: Duration,
    stop_deadline: Option<Instant>,
    cancel_deadline: Option<Instant>,
    stop_at: Option<String>,
    cancel_at: Option<String>,
    finished: Option<Completion>,
}

impl CompletionMonitor {
    /// Start the clock now
    pub fn new(idle: Duration, limits: CrawlLimits) -> Self {
        let started = Instant::now();
        Self {
            idle,
            stop_deadline: limits.stop_after.map(|d| started + d),
            cancel_deadline: limits.cancel_after.map(|d| started + d),
            stop_at: limits.stop_at,
            cancel_at: limits.cancel_at,
            finished: None,
        }
    }

    pub fn idle_window(&self) -> Duration {
        self.idle
    }

    pub fn cancel_deadline(&self) -> Option<Instant> {
        self.cancel_deadline
    }

    /// A time trigger that has already fired, cancel taking precedence
    pub fn deadline_reached(&self, now: Instant) -> Option<StopReason> {
        if self.cancel_deadline.is_some_and(|d| now >= d) {
            return Some(StopReason::CancelAfter);
        }
        if self.stop_deadline.is_some_and(|d| now >= d) {
            return Some(StopReason::StopAfter);
        }
        None
    }

    /// The nearest pending time trigger, cancel winning a tie
    pub fn next_deadline(&self) -> Option<(Instant, StopReason)> {
        let cancel = self.cancel_deadline.map(|d| (d, StopReason::CancelAfter));
        let stop = self.stop_deadline.map(|d| (d, StopReason::StopAfter));
        match (cancel, stop) {
            (Some(c), Some(s)) => Some(if s.0 < c.0 { s } else { c }),
            (c, s) => c.or(s),
        }
    }

    /// How long to wait for the next URL before re-checking
    ///
    /// The idle window, cut short by the nearest pending deadline.
    pub fn next_wait(&self, now: Instant) -> Duration {
        [self.stop_deadline, self.cancel_deadline]
            .into_iter()
            .flatten()
            .map(|deadline| deadline.saturating_duration_since(now))
            .fold(self.idle, Duration::min)
    }

    /// Check a newly accepted URL against the URL triggers
    pub fn check_url(&self, url: &str) -> UrlVerdict {
        if self.cancel_at.as_deref() == Some(url) {
            UrlVerdict::CancelBefore
        } else if self.stop_at.as_deref() == Some(url) {
            UrlVerdict::StopAfterProcessing
        } else {
            UrlVerdict::Continue
        }
    }

    /// Record the end of the crawl
    ///
    /// Only the first call counts; later calls return the first completion.
    pub fn finish(&mut self, reason: StopReason, visited: usize) -> Completion {
        if let Some(done) = self.finished {
            return done;
        }
        let done = Completion { reason, visited };
        self.finished = Some(done);

        match reason {
            StopReason::Idle => tracing::info!(
                visited,
                idle_secs = self.idle.as_secs(),
                "No new URLs within idle window; explored {visited} pages"
            ),
            other => tracing::info!(visited, reason = %other, "Crawl ending"),
        }
        done
    }
}
