//! Configuration management for clipscout
//!
//! This module handles loading and validating configuration from environment variables,
//! files, and command-line arguments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Crawler configuration
    pub crawler: CrawlerConfig,

    /// Render engine configuration
    pub browser: BrowserConfig,

    /// Element ids of the target widget
    pub widget: WidgetConfig,

    /// Coarse stop/cancel triggers
    pub limits: LimitsConfig,

    /// Output locations
    pub output: OutputConfig,

    /// Periodic telemetry
    pub telemetry: TelemetryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Crawler-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Seed URL; discovered links must start with it
    pub seed: String,

    /// Quiet period with no inbound URL after which the crawl completes
    pub idle_timeout_secs: u64,

    /// Number of link-discovery workers
    pub explorer_workers: usize,

    /// Capacity of the queue feeding the discovery workers
    pub explore_queue_capacity: usize,

    /// Rate limit (requests per second) for discovery fetches
    pub rate_limit: f64,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// User agent string
    pub user_agent: String,
}

/// Browser render engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a visible window
    pub headless: bool,

    /// Explicit Chrome/Chromium executable
    pub chrome_path: Option<PathBuf>,

    /// Fixed wait after navigation before the presence probe
    pub settle_secs: u64,

    /// Upper bound on waiting for the widget container to become visible
    pub visible_timeout_secs: u64,

    /// Extra command-line arguments for the browser
    pub chrome_args: Vec<String>,
}

/// DOM ids used by the extraction scripts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Iframe hosting the video widget
    pub container_id: String,

    /// Thumbnail list probed by the presence check
    pub thumbnails_id: String,

    /// Input carrying the product identifier
    pub product_id_field: String,

    /// Input carrying the canonical product URL
    pub product_url_field: String,
}

/// Whole-crawl stop and cancel triggers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Stop gracefully after this many seconds
    pub stop_after_secs: Option<u64>,

    /// Cancel in-flight work after this many seconds
    pub cancel_after_secs: Option<u64>,

    /// Stop gracefully once this URL has been processed
    pub stop_at: Option<String>,

    /// Cancel as soon as this URL is seen
    pub cancel_at: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the product and processed-URL files
    pub dir: PathBuf,
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Interval between crawl statistics reports (0 disables)
    pub interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seed: String::from("https://www.tokopedia.com/"),
            idle_timeout_secs: 15,
            explorer_workers: 8,
            explore_queue_capacity: 256,
            rate_limit: 5.0,
            request_timeout_secs: 30,
            user_agent: format!("clipscout/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            settle_secs: 20,
            visible_timeout_secs: 60,
            chrome_args: Vec::new(),
        }
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            container_id: String::from("webyclip-widget-3"),
            thumbnails_id: String::from("webyclip-thumbnails"),
            product_id_field: String::from("product-id"),
            product_url_field: String::from("product-url"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            browser: BrowserConfig::default(),
            widget: WidgetConfig::default(),
            limits: LimitsConfig::default(),
            output: OutputConfig::default(),
            telemetry: TelemetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(seed) = std::env::var("CLIPSCOUT_SEED") {
            config.crawler.seed = seed;
        }
        if let Some(v) = env_parse("CLIPSCOUT_IDLE_TIMEOUT") {
            config.crawler.idle_timeout_secs = v;
        }
        if let Some(v) = env_parse("CLIPSCOUT_EXPLORER_WORKERS") {
            config.crawler.explorer_workers = v;
        }
        if let Some(v) = env_parse("CLIPSCOUT_RATE_LIMIT") {
            config.crawler.rate_limit = v;
        }
        if let Some(v) = env_parse("CLIPSCOUT_REQUEST_TIMEOUT") {
            config.crawler.request_timeout_secs = v;
        }
        if let Ok(ua) = std::env::var("CLIPSCOUT_USER_AGENT") {
            config.crawler.user_agent = ua;
        }
        if let Some(v) = env_parse("CLIPSCOUT_HEADLESS") {
            config.browser.headless = v;
        }
        if let Ok(path) = std::env::var("CLIPSCOUT_CHROME_PATH") {
            config.browser.chrome_path = Some(PathBuf::from(path));
        }
        if let Some(v) = env_parse("CLIPSCOUT_SETTLE_SECS") {
            config.browser.settle_secs = v;
        }
        if let Ok(dir) = std::env::var("CLIPSCOUT_OUTPUT_DIR") {
            config.output.dir = PathBuf::from(dir);
        }
        if let Some(v) = env_parse("CLIPSCOUT_TELEMETRY_INTERVAL") {
            config.telemetry.interval_secs = v;
        }
        if let Ok(level) = std::env::var("CLIPSCOUT_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("CLIPSCOUT_LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let seed = Url::parse(&self.crawler.seed)
            .with_context(|| format!("seed is not an absolute URL: {}", self.crawler.seed))?;
        if seed.scheme() != "http" && seed.scheme() != "https" {
            anyhow::bail!("seed must use http or https: {}", self.crawler.seed);
        }
        if seed.host_str().is_none() {
            anyhow::bail!("seed has no host: {}", self.crawler.seed);
        }

        if self.crawler.idle_timeout_secs == 0 {
            anyhow::bail!("idle_timeout_secs must be greater than 0");
        }

        if self.crawler.explorer_workers == 0 {
            anyhow::bail!("explorer_workers must be greater than 0");
        }

        if self.crawler.explore_queue_capacity == 0 {
            anyhow::bail!("explore_queue_capacity must be greater than 0");
        }

        if self.crawler.rate_limit <= 0.0 {
            anyhow::bail!("rate_limit must be positive");
        }

        if self.browser.visible_timeout_secs == 0 {
            anyhow::bail!("visible_timeout_secs must be greater than 0");
        }

        Ok(())
    }

    /// Get idle window as Duration
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.crawler.idle_timeout_secs)
    }

    /// Get telemetry interval, `None` when disabled
    #[must_use]
    pub fn telemetry_interval(&self) -> Option<Duration> {
        (self.telemetry.interval_secs > 0).then(|| Duration::from_secs(self.telemetry.interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_explorer_workers() {
        let mut config = Config::default();
        config.crawler.explorer_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relative_seed_rejected() {
        let mut config = Config::default();
        config.crawler.seed = String::from("/products/shoes");
        assert!(config.validate().is_err());

        config.crawler.seed = String::from("ftp://example.com/");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_idle_window_rejected() {
        let mut config = Config::default();
        config.crawler.idle_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_conversions() {
        let config = Config::default();
        assert_eq!(config.idle_timeout(), Duration::from_secs(15));
        assert_eq!(config.telemetry_interval(), Some(Duration::from_secs(300)));

        let mut config = Config::default();
        config.telemetry.interval_secs = 0;
        assert_eq!(config.telemetry_interval(), None);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            seed = "https://shop.example.com/"
            idle_timeout_secs = 5

            [limits]
            stop_at = "https://shop.example.com/a/b"
            "#,
        )
        .unwrap();

        assert_eq!(config.crawler.seed, "https://shop.example.com/");
        assert_eq!(config.crawler.idle_timeout_secs, 5);
        assert_eq!(config.crawler.explorer_workers, 8);
        assert_eq!(config.widget, WidgetConfig::default());
        assert_eq!(
            config.limits.stop_at.as_deref(),
            Some("https://shop.example.com/a/b")
        );
        assert!(config.browser.headless);
    }
}
