//! clipscout - single-domain product video crawler
//!
//! Crawls one web domain, discovers candidate pages from their raw markup, and
//! drives a browser renderer over each page to pull out a product record
//! (identifier, canonical URL and any embedded video links).
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`crawler`] - Discovery, dedup dispatch and completion detection
//! - [`extract`] - Two-phase extraction over a render engine, video link parsing
//! - [`storage`] - TSV product records and the processed-URL listing
//! - [`metrics`] - Crawl counters and periodic telemetry
//! - [`models`] - Core data structures and types
//! - [`utils`] - Domain error types
//!
//! # Example
//!
//! ```no_run
//! use clipscout::config::Config;
//! use clipscout::crawler::run_crawl;
//! use clipscout::extract::chromium::ChromiumEngine;
//! use clipscout::extract::{ExtractionOrchestrator, ExtractionSettings};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let engine = ChromiumEngine::launch(&config.browser).await?;
//!     let orchestrator = ExtractionOrchestrator::new(
//!         engine,
//!         ExtractionSettings::from_config(&config.browser, &config.widget),
//!     );
//!     let report = run_crawl(&config, orchestrator, CancellationToken::new()).await?;
//!     println!("visited {} pages", report.visited);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod models;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crawler::{run_crawl, Dispatcher, StopReason};
    pub use crate::error::{ClipscoutErrorTrait, Error, ErrorCategory, Result};
    pub use crate::extract::{Extract, ExtractionOrchestrator, RenderEngine, RenderSession};
    pub use crate::models::{CrawlReport, ExtractionOutcome, ProductRecord};
    pub use crate::storage::{RecordSink, TsvProductWriter};
}

// Direct re-exports for convenience
pub use models::{CrawlReport, ExtractionOutcome, ProductRecord};
