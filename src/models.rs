// Core data structures for the clipscout crawler

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::crawler::monitor::StopReason;

/// Product extracted from a page carrying the video widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    product_id: String,
    product_url: String,
    video_links: Vec<String>,
}

impl ProductRecord {
    /// Build a record from the extracted fields
    pub fn new(
        product_id: impl Into<String>,
        product_url: impl Into<String>,
        video_links: Vec<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_url: product_url.into(),
            video_links,
        }
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn product_url(&self) -> &str {
        &self.product_url
    }

    /// Video links in first-seen order
    pub fn video_links(&self) -> &[String] {
        &self.video_links
    }
}

/// Result of one extraction attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Widget present and fields extracted
    Record(ProductRecord),
    /// Presence probe found nothing
    NoWidget,
    /// Widget reported present but the field phase could not complete
    Skipped { reason: String },
    /// Aborted by the crawl's cancellation token
    Cancelled,
}

/// End-of-crawl summary
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Seed the crawl started from
    pub seed: String,

    /// When the crawl started
    pub started_at: DateTime<Utc>,

    /// Why the crawl ended
    pub stop_reason: StopReason,

    /// Wall-clock duration of the crawl
    pub elapsed: Duration,

    /// Distinct URLs accepted by the dispatcher
    pub visited: usize,

    /// Records appended to the product file
    pub records_written: u64,

    /// Pages whose presence probe came back empty
    pub pages_without_widget: u64,

    /// Discovery fetches that failed
    pub fetch_failures: u64,

    /// Product file, when at least one record has ever been written to it
    pub product_file: Option<PathBuf>,

    /// Listing of processed URLs
    pub processed_file: PathBuf,
}

impl CrawlReport {
    /// Whether any product data exists on disk for this domain
    #[must_use]
    pub fn has_records(&self) -> bool {
        self.product_file.is_some()
    }
}
