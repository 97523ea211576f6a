//! Render-retry protocol against scripted fetch responses

mod common;

use common::*;
use liquidfn_common::{Event, EventBus, EventKind};
use liquidfn_harness::{HarnessError, RenderConfig, RenderStatus, Renderer, TargetLedger, UNEXPECTED_HTML};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    renderer: Renderer,
    bus: Arc<EventBus>,
    ledger: TargetLedger,
    deployer: Arc<RecordingDeployer>,
    fetcher: Arc<ScriptedFetcher>,
}

fn fixture(deployer: Arc<RecordingDeployer>, replies: Vec<Reply>) -> Fixture {
    let bus = Arc::new(EventBus::new());
    let ledger = TargetLedger::new();
    let fetcher = ScriptedFetcher::new(replies);
    let renderer = Renderer::new(
        Arc::new(config()),
        deployer.clone(),
        fetcher.clone(),
        bus.clone(),
        ledger.clone(),
    );
    Fixture {
        renderer,
        bus,
        ledger,
        deployer,
        fetcher,
    }
}

#[tokio::test]
async fn clean_first_fetch_resolves_without_retry() {
    let f = fixture(RecordingDeployer::new(), vec![Reply::text(CLEAN)]);
    let events = event_log(&f.bus);

    let render = f.renderer.render("{{ 1.3 }}").await.unwrap().unwrap();

    assert_eq!(render.text, CLEAN);
    assert_eq!(render.attempts, 1);
    assert_eq!(render.status, RenderStatus::Clean);
    assert_eq!(f.fetcher.calls(), 1);
    assert_eq!(count(&events, EventKind::RenderRetry), 0);
    assert_eq!(
        *events.lock(),
        vec![
            EventKind::RenderStart,
            EventKind::RenderSuffix,
            EventKind::RenderEnd
        ]
    );
}

#[tokio::test]
async fn html_then_clean_retries_once() {
    let f = fixture(
        RecordingDeployer::new(),
        vec![Reply::text(SHELL), Reply::text(CLEAN)],
    );
    let events = event_log(&f.bus);

    let render = f.renderer.render("{{ 1.3 }}").await.unwrap().unwrap();

    assert_eq!(render.text, CLEAN);
    assert_eq!(render.attempts, 2);
    assert_eq!(f.fetcher.calls(), 2);
    assert_eq!(count(&events, EventKind::RenderRetry), 1);
    assert_eq!(count(&events, EventKind::RenderRetryFailure), 0);
}

#[tokio::test]
async fn html_twice_resolves_to_sentinel() {
    let f = fixture(
        RecordingDeployer::new(),
        vec![Reply::text(SHELL), Reply::text(SHELL), Reply::text(CLEAN)],
    );
    let ends = Arc::new(Mutex::new(Vec::new()));
    let sink = ends.clone();
    f.bus
        .subscribe(&[EventKind::RenderEnd], move |event| {
            if let Event::RenderEnd { text, .. } = event {
                sink.lock().push(text.clone());
            }
            Ok(())
        })
        .unwrap();
    let events = event_log(&f.bus);

    let render = f.renderer.render("{{ 1.3 }}").await.unwrap().unwrap();

    assert_eq!(render.text, "Response returned unexpected HTML.");
    assert_eq!(render.text, UNEXPECTED_HTML);
    assert_eq!(render.status, RenderStatus::UnexpectedHtml);
    // At most one retry, the third scripted reply is never requested
    assert_eq!(f.fetcher.calls(), 2);
    assert_eq!(count(&events, EventKind::RenderRetry), 1);
    assert_eq!(count(&events, EventKind::RenderRetryFailure), 1);
    assert_eq!(*ends.lock(), vec![String::new()]);
}

#[tokio::test]
async fn failed_deployment_yields_no_result() {
    let deployer = Arc::new(RecordingDeployer {
        fail_render_target: true,
        ..Default::default()
    });
    let f = fixture(deployer, vec![Reply::text(CLEAN)]);
    let events = event_log(&f.bus);

    let render = f.renderer.render("{{ 1.3 }}").await.unwrap();

    assert!(render.is_none());
    assert_eq!(f.fetcher.calls(), 0);
    assert!(f.ledger.is_empty());
    assert_eq!(
        *events.lock(),
        vec![EventKind::RenderStart, EventKind::RenderFailure]
    );
}

#[tokio::test]
async fn fetch_url_addresses_the_render_target() {
    let f = fixture(RecordingDeployer::new(), vec![Reply::text(CLEAN)]);

    f.renderer.render("{{ 1.3 }}").await.unwrap();

    assert_eq!(
        *f.fetcher.urls.lock(),
        vec!["https://demo.myshopify.com/pages/liquid-fn-test?view=liquid-fn-test-t1"]
    );
    assert_eq!(f.deployer.log.lock().templates, vec!["{{ 1.3 }}"]);
}

#[tokio::test]
async fn fetch_error_propagates_but_target_is_recorded() {
    let f = fixture(
        RecordingDeployer::new(),
        vec![Reply::Fail("connection reset".into())],
    );

    let err = f.renderer.render("{{ 1.3 }}").await.unwrap_err();

    assert!(matches!(err, HarnessError::Fetch { .. }));
    assert!(err.to_string().contains("connection reset"));
    assert_eq!(f.ledger.snapshot(), vec!["t1"]);
}

#[tokio::test(start_paused = true)]
async fn waits_before_first_fetch() {
    let f = fixture(RecordingDeployer::new(), vec![Reply::text(CLEAN)]);
    let options = RenderConfig {
        delay_ms: 1000,
        timeout_ms: None,
    };

    let start = tokio::time::Instant::now();
    f.renderer.render_with("{{ 1.3 }}", &options).await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn hung_fetch_hits_deadline() {
    let f = fixture(RecordingDeployer::new(), vec![Reply::Hang]);
    let options = RenderConfig {
        delay_ms: 0,
        timeout_ms: Some(250),
    };

    let err = f
        .renderer
        .render_with("{{ 1.3 }}", &options)
        .await
        .unwrap_err();

    match err {
        HarnessError::FetchTimeout { timeout, url } => {
            assert_eq!(timeout, Duration::from_millis(250));
            assert!(url.ends_with("liquid-fn-test-t1"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
