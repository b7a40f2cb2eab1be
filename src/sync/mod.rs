//! Outbound delivery of annotation lifecycle events.
//!
//! Two modes: `Each` debounces and POSTs every eligible event on its own;
//! `Batch` accumulates annotations and flushes after an idle window or on
//! an explicit trigger. Delivery is fire-and-forget relative to the store:
//! a mutation never waits on, or rolls back for, the network.

pub mod payload;
pub mod transport;

pub use payload::{
    build_batch_payload, build_payload, PagePayload, SyncAnnotationData, SyncEventType,
    SyncPayload,
};
pub use transport::{HttpTransport, SyncTransport};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::annotation::Annotation;
use crate::models::page::PageContext;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = false;

use crate::{log_info, log_warn};

pub const MAX_RETRIES: u32 = 2;
pub const BASE_DELAY_MS: u64 = 1000;
pub const JITTER_FACTOR: f64 = 0.2;
pub const DEBOUNCE_MS: u64 = 300;
pub const BATCH_FLUSH_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    #[default]
    Each,
    Batch,
}

#[derive(Clone, Default)]
pub struct SyncConfig {
    /// No endpoint means sync is disabled entirely.
    pub endpoint: Option<String>,
    pub headers: HashMap<String, String>,
    pub mode: SyncMode,
    /// Update events must be opted into.
    pub sync_update: bool,
    /// Delete events must be opted into.
    pub sync_delete: bool,
}

pub type PageContextProvider = Arc<dyn Fn() -> PageContext + Send + Sync>;
pub type SyncSuccessHandler = Arc<dyn Fn(&SyncPayload) + Send + Sync>;
pub type SyncErrorHandler = Arc<dyn Fn(&anyhow::Error, &SyncPayload) + Send + Sync>;

struct DispatcherInner {
    config: SyncConfig,
    transport: Arc<dyn SyncTransport>,
    page_context: PageContextProvider,
    on_success: Mutex<Option<SyncSuccessHandler>>,
    on_error: Mutex<Option<SyncErrorHandler>>,
    queue: Mutex<Vec<SyncAnnotationData>>,
    debounce_task: Mutex<Option<JoinHandle<()>>>,
    batch_task: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

#[derive(Clone)]
pub struct SyncDispatcher {
    inner: Arc<DispatcherInner>,
}

impl SyncDispatcher {
    pub fn new(
        config: SyncConfig,
        transport: Arc<dyn SyncTransport>,
        page_context: PageContextProvider,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                config,
                transport,
                page_context,
                on_success: Mutex::new(None),
                on_error: Mutex::new(None),
                queue: Mutex::new(Vec::new()),
                debounce_task: Mutex::new(None),
                batch_task: Mutex::new(None),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn set_on_success(&self, handler: SyncSuccessHandler) {
        *self.inner.on_success.lock().unwrap() = Some(handler);
    }

    pub fn set_on_error(&self, handler: SyncErrorHandler) {
        *self.inner.on_error.lock().unwrap() = Some(handler);
    }

    fn enabled(&self) -> bool {
        self.inner.config.endpoint.is_some()
    }

    fn page(&self) -> PageContext {
        (self.inner.page_context)()
    }

    /// Creation is always eligible once an endpoint is configured.
    pub fn annotation_created(&self, item: &Annotation) {
        if !self.enabled() {
            return;
        }
        match self.inner.config.mode {
            SyncMode::Each => self.debounced_post(build_payload(
                SyncEventType::Created,
                &self.page(),
                Some(item),
                None,
                None,
            )),
            SyncMode::Batch => self.enqueue(SyncAnnotationData::from_annotation(item)),
        }
    }

    pub fn annotation_updated(&self, id: &str, content: &str) {
        if !self.enabled()
            || !self.inner.config.sync_update
            || self.inner.config.mode != SyncMode::Each
        {
            return;
        }
        self.debounced_post(build_payload(
            SyncEventType::Updated,
            &self.page(),
            None,
            Some(id.to_string()),
            Some(content.to_string()),
        ));
    }

    pub fn annotation_deleted(&self, id: &str) {
        if !self.enabled()
            || !self.inner.config.sync_delete
            || self.inner.config.mode != SyncMode::Each
        {
            return;
        }
        self.debounced_post(build_payload(
            SyncEventType::Deleted,
            &self.page(),
            None,
            Some(id.to_string()),
            None,
        ));
    }

    fn enqueue(&self, item: SyncAnnotationData) {
        self.inner.queue.lock().unwrap().push(item);

        // Restart the idle window. One request per flush, however many
        // items queue up meanwhile.
        let mut guard = self.inner.batch_task.lock().unwrap();
        if let Some(handle) = guard.take() {
            handle.abort();
        }
        let dispatcher = self.clone();
        *guard = Some(tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(BATCH_FLUSH_MS)) => {
                    dispatcher.flush();
                }
                _ = dispatcher.inner.cancel.cancelled() => {}
            }
        }));
    }

    /// Deliver everything queued in batch mode as a single request.
    pub fn flush(&self) {
        if !self.enabled() {
            return;
        }
        let items: Vec<SyncAnnotationData> = {
            let mut queue = self.inner.queue.lock().unwrap();
            std::mem::take(&mut *queue)
        };
        if items.is_empty() {
            return;
        }
        if let Some(handle) = self.inner.batch_task.lock().unwrap().take() {
            handle.abort();
        }
        let payload = build_batch_payload(&self.page(), &items);
        let inner = self.inner.clone();
        tokio::spawn(deliver(inner, payload));
    }

    fn debounced_post(&self, payload: SyncPayload) {
        let mut guard = self.inner.debounce_task.lock().unwrap();
        if let Some(handle) = guard.take() {
            handle.abort();
        }
        let inner = self.inner.clone();
        *guard = Some(tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(DEBOUNCE_MS)) => {
                    // Delivery runs detached so a later debounce cannot
                    // abort retries already in flight.
                    tokio::spawn(deliver(inner, payload));
                }
                _ = inner.cancel.cancelled() => {}
            }
        }));
    }

    /// Cancel pending debounce/batch timers and abort in-flight requests.
    pub fn teardown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.debounce_task.lock().unwrap().take() {
            handle.abort();
        }
        if let Some(handle) = self.inner.batch_task.lock().unwrap().take() {
            handle.abort();
        }
    }
}

fn jittered_delay(base_ms: u64, attempt: u32) -> Duration {
    let delay = base_ms as f64 * 2f64.powi(attempt as i32);
    let jitter = delay * JITTER_FACTOR * (rand::thread_rng().gen::<f64>() * 2.0 - 1.0);
    Duration::from_millis((delay + jitter).max(0.0) as u64)
}

async fn deliver(inner: Arc<DispatcherInner>, payload: SyncPayload) {
    let Some(url) = inner.config.endpoint.clone() else {
        return;
    };

    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let delay = jittered_delay(BASE_DELAY_MS, attempt - 1);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = inner.cancel.cancelled() => return,
            }
        }

        let result = tokio::select! {
            result = inner.transport.post(&url, &inner.config.headers, &payload) => result,
            _ = inner.cancel.cancelled() => return,
        };

        match result {
            Ok(status) if (200..300).contains(&status) => {
                log_info!("sync delivered ({:?}) on attempt {}", payload.event, attempt + 1);
                if let Some(handler) = inner.on_success.lock().unwrap().clone() {
                    handler(&payload);
                }
                return;
            }
            Ok(status) => {
                log_warn!("sync attempt {} got status {}", attempt + 1, status);
                if attempt == MAX_RETRIES {
                    report_error(&inner, anyhow!("sync failed with status {status}"), &payload);
                }
            }
            Err(err) => {
                log_warn!("sync attempt {} failed: {err}", attempt + 1);
                if attempt == MAX_RETRIES {
                    report_error(&inner, err, &payload);
                }
            }
        }
    }
}

fn report_error(inner: &DispatcherInner, err: anyhow::Error, payload: &SyncPayload) {
    if let Some(handler) = inner.on_error.lock().unwrap().clone() {
        handler(&err, payload);
    }
}
