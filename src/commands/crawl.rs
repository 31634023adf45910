use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use clipscout::config::Config;

/// Per-run overrides on top of the loaded configuration
#[derive(Args, Debug, Default)]
pub struct CrawlArgs {
    /// Seed URL; also the prefix every followed link must start with
    #[arg(short, long)]
    pub seed: Option<String>,

    /// Stop after this many seconds, letting the current extraction finish
    #[arg(long)]
    pub stop_after_secs: Option<u64>,

    /// Cancel after this many seconds, aborting the current extraction
    #[arg(long)]
    pub cancel_after_secs: Option<u64>,

    /// Stop once this normalized URL has been processed
    #[arg(long)]
    pub stop_at: Option<String>,

    /// Cancel as soon as this normalized URL arrives
    #[arg(long)]
    pub cancel_at: Option<String>,

    /// Seconds between telemetry snapshots (0 disables)
    #[arg(long)]
    pub telemetry_interval: Option<u64>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Directory for the output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

impl CrawlArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(seed) = &self.seed {
            config.crawler.seed = seed.clone();
        }
        if let Some(secs) = self.stop_after_secs {
            config.limits.stop_after_secs = Some(secs);
        }
        if let Some(secs) = self.cancel_after_secs {
            config.limits.cancel_after_secs = Some(secs);
        }
        if let Some(url) = &self.stop_at {
            config.limits.stop_at = Some(url.clone());
        }
        if let Some(url) = &self.cancel_at {
            config.limits.cancel_at = Some(url.clone());
        }
        if let Some(secs) = self.telemetry_interval {
            config.telemetry.interval_secs = secs;
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
    }
}

/// Load configuration from a file when given, else from the environment
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::from_env(),
    }
}

#[cfg(feature = "browser")]
fn spawn_interrupt_handler() -> tokio_util::sync::CancellationToken {
    let shutdown = tokio_util::sync::CancellationToken::new();
    let token = shutdown.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; cancelling crawl");
            token.cancel();
        }
    });

    shutdown
}

#[cfg(feature = "browser")]
pub async fn crawl(config: Config) -> Result<()> {
    use clipscout::crawler::run_crawl;
    use clipscout::extract::chromium::ChromiumEngine;
    use clipscout::extract::{ExtractionOrchestrator, ExtractionSettings};
    use std::sync::Arc;

    config.validate().context("Invalid configuration")?;

    let engine = Arc::new(
        ChromiumEngine::launch(&config.browser)
            .await
            .context("Failed to start the render engine")?,
    );
    let orchestrator = ExtractionOrchestrator::new(
        Arc::clone(&engine),
        ExtractionSettings::from_config(&config.browser, &config.widget),
    );

    let shutdown = spawn_interrupt_handler();
    let result = run_crawl(&config, orchestrator, shutdown).await;

    match Arc::try_unwrap(engine) {
        Ok(engine) => engine.shutdown().await,
        Err(_) => tracing::debug!("Render engine still shared; leaving it to drop"),
    }

    let report = result.context("Crawl aborted")?;
    tracing::info!(
        reason = %report.stop_reason,
        visited = report.visited,
        records = report.records_written,
        "Crawl complete"
    );

    Ok(())
}

#[cfg(not(feature = "browser"))]
pub async fn crawl(config: Config) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    anyhow::bail!("clipscout was built without the `browser` feature; no render engine available")
}
