//! Integration tests for the two-phase extraction against a scripted engine

mod common;

use common::{FakeEngine, Step, NESTED_WIDGET};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use clipscout::extract::{Extract, ExtractionOrchestrator, ExtractionSettings};
use clipscout::models::ExtractionOutcome;
use clipscout::utils::error::RenderError;

const PAGE: &str = "https://www.tokopedia.com/shop/item";

fn orchestrator(engine: FakeEngine) -> ExtractionOrchestrator<FakeEngine> {
    ExtractionOrchestrator::new(engine, ExtractionSettings::default())
}

fn uncaught() -> RenderError {
    RenderError::ElementAbsent(
        "Uncaught TypeError: Cannot read properties of null (reading 'innerHTML')".to_string(),
    )
}

fn crashed() -> RenderError {
    RenderError::Evaluation("Target closed".to_string())
}

fn visible_timeout() -> RenderError {
    RenderError::VisibleTimeout {
        selector: "#webyclip-widget-3".to_string(),
        secs: 60,
    }
}

#[tokio::test(start_paused = true)]
async fn test_widget_present_yields_record() {
    let engine = FakeEngine::with_product("12345", PAGE, NESTED_WIDGET);
    let log = engine.log.clone();

    let outcome = orchestrator(engine)
        .extract(PAGE, &CancellationToken::new())
        .await
        .unwrap();

    let ExtractionOutcome::Record(record) = outcome else {
        panic!("expected a record, got {outcome:?}");
    };
    assert_eq!(record.product_id(), "12345");
    assert_eq!(record.product_url(), PAGE);
    assert_eq!(
        record.video_links(),
        &[
            "https://www.youtube.com/watch?v=abc123".to_string(),
            "https://www.youtube.com/watch?v=xyz789".to_string(),
        ]
    );

    let log = log.lock().unwrap();
    assert_eq!(log.sessions_opened, 2, "each phase gets a fresh session");
    assert_eq!(log.sessions_closed, 2);
    assert_eq!(log.navigations, vec![PAGE.to_string(), PAGE.to_string()]);
    assert_eq!(log.waits, vec!["#webyclip-widget-3".to_string()]);
    assert_eq!(
        log.evaluations[0],
        "document.getElementById('webyclip-thumbnails').innerHTML"
    );
    assert_eq!(log.evaluations.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_presence_waits_settle_time() {
    let engine = FakeEngine::new(vec![vec![Step::Value("")]]);

    let started = tokio::time::Instant::now();
    orchestrator(engine)
        .extract(PAGE, &CancellationToken::new())
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn test_empty_capture_is_no_widget() {
    let engine = FakeEngine::new(vec![vec![Step::Value("")]]);
    let log = engine.log.clone();

    let outcome = orchestrator(engine)
        .extract(PAGE, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, ExtractionOutcome::NoWidget);
    let log = log.lock().unwrap();
    assert_eq!(log.sessions_opened, 1, "no field phase without a widget");
    assert_eq!(log.sessions_closed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_capture_is_no_widget() {
    let engine = FakeEngine::new(vec![vec![Step::Value("0")]]);

    let outcome = orchestrator(engine)
        .extract(PAGE, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, ExtractionOutcome::NoWidget);
}

#[tokio::test(start_paused = true)]
async fn test_uncaught_probe_is_no_widget() {
    let engine = FakeEngine::new(vec![vec![Step::Fail(uncaught)]]);
    let log = engine.log.clone();

    let outcome = orchestrator(engine)
        .extract(PAGE, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, ExtractionOutcome::NoWidget);
    assert_eq!(log.lock().unwrap().sessions_closed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_other_probe_fault_is_fatal() {
    let engine = FakeEngine::new(vec![vec![Step::Fail(crashed)]]);
    let log = engine.log.clone();

    let err = orchestrator(engine)
        .extract(PAGE, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RenderError::Evaluation(_)));
    assert_eq!(log.lock().unwrap().sessions_closed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_field_phase_timeout_skips_page() {
    let engine = FakeEngine::new(vec![
        vec![Step::Value("<li>thumb</li>")],
        vec![Step::Fail(visible_timeout)],
    ]);

    let outcome = orchestrator(engine)
        .extract(PAGE, &CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(outcome, ExtractionOutcome::Skipped { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_field_phase_crash_is_fatal() {
    let engine = FakeEngine::new(vec![
        vec![Step::Value("<li>thumb</li>")],
        vec![Step::Value(""), Step::Fail(crashed)],
    ]);

    let result = orchestrator(engine)
        .extract(PAGE, &CancellationToken::new())
        .await;

    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_widget_without_videos_yields_empty_links() {
    let engine = FakeEngine::with_product("777", PAGE, "<body><p>no thumbnails</p></body>");

    let outcome = orchestrator(engine)
        .extract(PAGE, &CancellationToken::new())
        .await
        .unwrap();

    let ExtractionOutcome::Record(record) = outcome else {
        panic!("expected a record, got {outcome:?}");
    };
    assert!(record.video_links().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_settle() {
    let engine = FakeEngine::new(vec![vec![Step::Value("<li>thumb</li>")]]);
    let log = engine.log.clone();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let started = tokio::time::Instant::now();
    let outcome = orchestrator(engine).extract(PAGE, &cancel).await.unwrap();

    assert_eq!(outcome, ExtractionOutcome::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(20));
    let log = log.lock().unwrap();
    assert_eq!(log.sessions_opened, 1);
    assert_eq!(log.sessions_closed, 1);
    assert!(log.evaluations.is_empty());
}
