use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use pagemark::models::{Annotation, PageContext, Viewport};
use pagemark::sync::{
    SyncConfig, SyncDispatcher, SyncEventType, SyncMode, SyncPayload, SyncTransport,
};

/// Transport that replays a scripted list of responses. `0` simulates a
/// transport-level failure; anything else is an HTTP status.
struct ScriptedTransport {
    calls: Mutex<Vec<SyncPayload>>,
    script: Mutex<VecDeque<u16>>,
}

impl ScriptedTransport {
    fn new(script: &[u16]) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            script: Mutex::new(script.iter().copied().collect()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SyncTransport for ScriptedTransport {
    async fn post(
        &self,
        _url: &str,
        _headers: &HashMap<String, String>,
        payload: &SyncPayload,
    ) -> Result<u16> {
        self.calls.lock().unwrap().push(payload.clone());
        let status = self.script.lock().unwrap().pop_front().unwrap_or(200);
        if status == 0 {
            bail!("connection refused");
        }
        Ok(status)
    }
}

fn page_provider() -> Arc<dyn Fn() -> PageContext + Send + Sync> {
    Arc::new(|| PageContext {
        url: "https://app.test/checkout".into(),
        pathname: "/checkout".into(),
        viewport: Viewport {
            width: 1280,
            height: 720,
        },
        user_agent: "test-agent".into(),
        device_pixel_ratio: 2.0,
    })
}

fn sample_annotation(content: &str) -> Annotation {
    Annotation {
        id: format!("id-{content}"),
        step_number: 1,
        content: content.to_string(),
        selector: "#hero".into(),
        offset_x: 4.0,
        offset_y: 6.0,
        page_x: 40.0,
        page_y: 60.0,
        target: None,
        element: None,
        elements: Vec::new(),
        area_data: None,
        is_area_only: false,
        created_at: 1_700_000_000_000,
        orphan: false,
    }
}

fn each_config(endpoint: &str) -> SyncConfig {
    SyncConfig {
        endpoint: Some(endpoint.to_string()),
        ..SyncConfig::default()
    }
}

type ErrorLog = Arc<Mutex<Vec<(String, SyncPayload)>>>;

fn capture_errors(dispatcher: &SyncDispatcher) -> ErrorLog {
    let log: ErrorLog = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    dispatcher.set_on_error(Arc::new(move |err, payload| {
        sink.lock().unwrap().push((err.to_string(), payload.clone()));
    }));
    log
}

#[tokio::test(start_paused = true)]
async fn test_disabled_without_endpoint() {
    let transport = ScriptedTransport::new(&[]);
    let dispatcher = SyncDispatcher::new(SyncConfig::default(), transport.clone(), page_provider());

    dispatcher.annotation_created(&sample_annotation("a"));
    dispatcher.flush();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(transport.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_three_failures_report_error_once_with_original_payload() {
    let transport = ScriptedTransport::new(&[500, 500, 500]);
    let dispatcher = SyncDispatcher::new(each_config("https://sync.test"), transport.clone(), page_provider());
    let errors = capture_errors(&dispatcher);
    let successes = Arc::new(Mutex::new(0usize));
    let counter = successes.clone();
    dispatcher.set_on_success(Arc::new(move |_| {
        *counter.lock().unwrap() += 1;
    }));

    dispatcher.annotation_created(&sample_annotation("broken"));
    tokio::time::sleep(Duration::from_secs(30)).await;

    // Initial attempt plus exactly two retries.
    assert_eq!(transport.call_count(), 3);
    assert_eq!(*successes.lock().unwrap(), 0);

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    let (message, payload) = &errors[0];
    assert!(message.contains("500"), "got {message}");
    assert_eq!(payload.event, SyncEventType::Created);
    assert_eq!(payload.feedback.as_ref().unwrap().id, "id-broken");
    assert_eq!(payload.page.pathname, "/checkout");
}

#[tokio::test(start_paused = true)]
async fn test_recovery_on_retry_reports_success() {
    let transport = ScriptedTransport::new(&[0, 200]);
    let dispatcher = SyncDispatcher::new(each_config("https://sync.test"), transport.clone(), page_provider());
    let errors = capture_errors(&dispatcher);
    let successes = Arc::new(Mutex::new(0usize));
    let counter = successes.clone();
    dispatcher.set_on_success(Arc::new(move |_| {
        *counter.lock().unwrap() += 1;
    }));

    dispatcher.annotation_created(&sample_annotation("flaky"));
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(transport.call_count(), 2);
    assert_eq!(*successes.lock().unwrap(), 1);
    assert!(errors.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_each_mode_debounce_collapses_bursts() {
    let transport = ScriptedTransport::new(&[]);
    let dispatcher = SyncDispatcher::new(each_config("https://sync.test"), transport.clone(), page_provider());

    dispatcher.annotation_created(&sample_annotation("a"));
    dispatcher.annotation_created(&sample_annotation("b"));
    dispatcher.annotation_created(&sample_annotation("c"));
    tokio::time::sleep(Duration::from_secs(10)).await;

    // The burst collapses into one delivery carrying the last event.
    assert_eq!(transport.call_count(), 1);
    let calls = transport.calls.lock().unwrap();
    assert_eq!(calls[0].feedback.as_ref().unwrap().id, "id-c");
}

#[tokio::test(start_paused = true)]
async fn test_update_and_delete_require_opt_in() {
    let transport = ScriptedTransport::new(&[]);
    let dispatcher = SyncDispatcher::new(each_config("https://sync.test"), transport.clone(), page_provider());

    dispatcher.annotation_updated("id-a", "new words");
    dispatcher.annotation_deleted("id-a");
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.call_count(), 0);

    let opted_in = SyncConfig {
        sync_update: true,
        sync_delete: true,
        ..each_config("https://sync.test")
    };
    let transport = ScriptedTransport::new(&[]);
    let dispatcher = SyncDispatcher::new(opted_in, transport.clone(), page_provider());

    dispatcher.annotation_deleted("id-gone");
    tokio::time::sleep(Duration::from_secs(10)).await;

    let calls = transport.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].event, SyncEventType::Deleted);
    assert_eq!(calls[0].feedback_id.as_deref(), Some("id-gone"));
    assert!(calls[0].feedback.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_batch_mode_sends_one_request_per_flush_window() {
    let transport = ScriptedTransport::new(&[]);
    let config = SyncConfig {
        mode: SyncMode::Batch,
        ..each_config("https://sync.test")
    };
    let dispatcher = SyncDispatcher::new(config, transport.clone(), page_provider());

    for name in ["a", "b", "c", "d", "e"] {
        dispatcher.annotation_created(&sample_annotation(name));
    }
    // The idle window elapses once, however many items queued.
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(transport.call_count(), 1);
    let calls = transport.calls.lock().unwrap();
    assert_eq!(calls[0].event, SyncEventType::Batch);
    assert_eq!(calls[0].feedbacks.as_ref().unwrap().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_explicit_flush_drains_immediately_and_empty_flush_is_noop() {
    let transport = ScriptedTransport::new(&[]);
    let config = SyncConfig {
        mode: SyncMode::Batch,
        ..each_config("https://sync.test")
    };
    let dispatcher = SyncDispatcher::new(config, transport.clone(), page_provider());

    dispatcher.annotation_created(&sample_annotation("a"));
    dispatcher.annotation_created(&sample_annotation("b"));
    dispatcher.flush();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(transport.call_count(), 1);

    // Queue is drained; neither a second flush nor the idle timer resend.
    dispatcher.flush();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_aborts_pending_delivery() {
    let transport = ScriptedTransport::new(&[]);
    let dispatcher = SyncDispatcher::new(each_config("https://sync.test"), transport.clone(), page_provider());

    dispatcher.annotation_created(&sample_annotation("doomed"));
    dispatcher.teardown();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(transport.call_count(), 0);
}
