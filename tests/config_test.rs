//! Integration tests for configuration loading

use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio_test::{assert_err, assert_ok};

use clipscout::config::Config;

#[test]
fn test_load_from_toml_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[crawler]
seed = "https://www.tokopedia.com/"
idle_timeout_secs = 30
explorer_workers = 4

[browser]
headless = false
settle_secs = 10
chrome_args = ["--lang=id-ID"]

[widget]
container_id = "video-widget"

[limits]
cancel_after_secs = 3600

[output]
dir = "/var/lib/clipscout"

[telemetry]
interval_secs = 0
"#
    )
    .unwrap();

    let config = assert_ok!(Config::from_file(file.path()));
    assert_ok!(config.validate());

    assert_eq!(config.idle_timeout(), Duration::from_secs(30));
    assert_eq!(config.crawler.explorer_workers, 4);
    assert!(!config.browser.headless);
    assert_eq!(config.browser.settle_secs, 10);
    assert_eq!(config.browser.chrome_args, vec!["--lang=id-ID".to_string()]);
    assert_eq!(config.widget.container_id, "video-widget");
    assert_eq!(config.widget.thumbnails_id, "webyclip-thumbnails");
    assert_eq!(config.limits.cancel_after_secs, Some(3600));
    assert_eq!(config.telemetry_interval(), None);
}

#[test]
fn test_malformed_file_is_an_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[crawler\nseed = ").unwrap();

    assert_err!(Config::from_file(file.path()));
}

#[test]
fn test_missing_file_is_an_error() {
    assert_err!(Config::from_file(std::path::Path::new(
        "/nonexistent/clipscout.toml"
    )));
}

#[test]
fn test_invalid_values_rejected() {
    let mut config = Config::default();
    config.crawler.rate_limit = 0.0;
    assert_err!(config.validate());

    let mut config = Config::default();
    config.crawler.explore_queue_capacity = 0;
    assert_err!(config.validate());

    let mut config = Config::default();
    config.browser.visible_timeout_secs = 0;
    assert_err!(config.validate());
}
