use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CrawlArgs;

#[derive(Parser)]
#[command(
    name = "clipscout",
    version,
    about = "Single-domain crawler that collects product pages carrying embedded video widgets",
    long_about = None
)]
struct Cli {
    /// TOML configuration file (defaults and CLIPSCOUT_* variables otherwise)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    crawl: CrawlArgs,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = commands::load_config(cli.config.as_deref())?;
    cli.crawl.apply(&mut config);
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    tracing::info!(seed = %config.crawler.seed, "clipscout starting");

    if let Err(e) = commands::crawl(config).await {
        tracing::error!(error = %e, "Crawl failed");
        return Err(e);
    }

    tracing::info!("clipscout completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("clipscout=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("clipscout={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
