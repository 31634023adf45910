//! Crawl loop: link discovery, dedup dispatch and completion detection
//!
//! [`run_crawl`] wires the production collaborators together: a
//! [`PageExplorer`] pool for discovery, an extraction capability, the TSV
//! product file and the processed-URL listing.

pub mod dispatcher;
pub mod explorer;
pub mod fetcher;
pub mod monitor;
pub mod url;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{ClipscoutErrorTrait, Result};
use crate::extract::Extract;
use crate::metrics::{spawn_reporter, CrawlMetrics};
use crate::models::CrawlReport;
use crate::storage::{OutputPaths, ProcessedUrlWriter, TsvProductWriter};

pub use dispatcher::{DispatchResult, DispatchSettings, Dispatcher};
pub use explorer::{Explore, ExplorerPool, LinkTokenizer, PageExplorer};
pub use fetcher::PageFetcher;
pub use monitor::{Completion, CompletionMonitor, CrawlLimits, StopReason};
pub use url::{domain_label, normalize_url, LinkScope};

/// Run one crawl from the configured seed
///
/// The crawl ends on idle, on a configured limit, or when `shutdown` is
/// cancelled. The processed-URL listing is written and a summary logged
/// before the report is returned.
///
/// # Errors
///
/// Fails on a fatal render fault or when the processed-URL listing cannot be
/// written.
pub async fn run_crawl<R: Extract>(
    config: &Config,
    extractor: R,
    shutdown: CancellationToken,
) -> Result<CrawlReport> {
    let seed = config.crawler.seed.clone();
    let paths = OutputPaths::for_seed(&config.output.dir, &seed)?;

    let fetcher = PageFetcher::from_config(&config.crawler)?;
    let explorer = Arc::new(PageExplorer::new(fetcher, LinkScope::new(seed.clone())));
    let mut product_writer = TsvProductWriter::new(&paths.products);
    let metrics = CrawlMetrics::new();

    let reporter_cancel = shutdown.child_token();
    let reporter = config
        .telemetry_interval()
        .map(|every| spawn_reporter(Arc::clone(&metrics), every, reporter_cancel.clone()));
    metrics.snapshot().log("Crawl starting");

    let monitor = CompletionMonitor::new(
        config.idle_timeout(),
        CrawlLimits::from(&config.limits),
    );
    let dispatcher = Dispatcher::new(
        explorer,
        extractor,
        &mut product_writer,
        monitor,
        DispatchSettings::from(&config.crawler),
        Arc::clone(&metrics),
    );

    let started_at = chrono::Utc::now();
    let started = std::time::Instant::now();
    let dispatched = dispatcher.run(&seed, &shutdown).await;

    reporter_cancel.cancel();
    if let Some(reporter) = reporter {
        let _ = reporter.await;
    }

    let DispatchResult {
        stop_reason,
        visited,
        processed,
    } = dispatched.inspect_err(|e| {
        tracing::error!(
            category = e.category().as_str(),
            recoverable = e.is_recoverable(),
            error = %e,
            "Crawl aborted"
        );
    })?;

    ProcessedUrlWriter::new(&paths.processed).write_all(&processed)?;

    let snapshot = metrics.snapshot();
    let report = CrawlReport {
        seed,
        started_at,
        stop_reason,
        elapsed: started.elapsed(),
        visited,
        records_written: snapshot.records_written,
        pages_without_widget: snapshot.pages_without_widget,
        fetch_failures: snapshot.fetch_failures,
        product_file: product_writer
            .exists()
            .then(|| product_writer.path().to_path_buf()),
        processed_file: paths.processed,
    };

    log_summary(&report);
    snapshot.log("Final crawl statistics");

    Ok(report)
}

/// Log the end-of-crawl summary
pub fn log_summary(report: &CrawlReport) {
    tracing::info!(
        seed = %report.seed,
        started_at = %report.started_at.to_rfc3339(),
        reason = %report.stop_reason,
        elapsed_secs = report.elapsed.as_secs_f64(),
        visited = report.visited,
        records = report.records_written,
        "Crawl finished"
    );

    match &report.product_file {
        Some(path) => tracing::info!(path = %path.display(), "Product details saved"),
        None => tracing::info!("No product records found for this domain"),
    }
    tracing::info!(path = %report.processed_file.display(), "Processed URLs saved");
}
