//! The engine façade the surrounding chrome talks to.
//!
//! Owns the store, wires every mutation into debounced persistence and the
//! sync dispatcher, parks pointer intents as pending drafts until the
//! chrome submits text for them, and drives two-phase rehydration on load
//! and navigation. The chrome itself (toolbar, popovers, markers) lives
//! outside; it consumes the events emitted here and calls the imperative
//! operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::Duration;

use log::info;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dom::{Document, NodeId};
use crate::introspect;
use crate::models::annotation::Annotation;
use crate::models::component::FrameworkDetection;
use crate::models::geometry::Rect;
use crate::models::target::InspectedTarget;
use crate::persist::{self, PersistMode, StorageBackend};
use crate::session::{PointerInput, PointerIntent, PointerSession};
use crate::store::AnnotationStore;
use crate::sync::{
    PageContextProvider, SyncConfig, SyncDispatcher, SyncErrorHandler, SyncSuccessHandler,
    SyncTransport,
};
use crate::export;

#[derive(Clone, Default)]
pub struct EngineConfig {
    pub persist: PersistMode,
    pub sync: SyncConfig,
}

/// Lifecycle notifications for the chrome.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    HoverChanged(Option<InspectedTarget>),
    Intent(PointerIntent),
    AnnotationCreated(Annotation),
    AnnotationUpdated { id: String, content: String },
    AnnotationDeleted { id: String },
    AnnotationsCleared,
    HydrationComplete { orphans: usize },
}

pub type EngineEventHandler = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

type SharedEventHandler = Arc<StdMutex<Option<EngineEventHandler>>>;

/// A resolved intent waiting for the user to type content.
enum PendingDraft {
    Single {
        click_x: f64,
        click_y: f64,
        target: InspectedTarget,
    },
    Area {
        area: Rect,
        elements: Vec<InspectedTarget>,
    },
}

pub struct AnnotationEngine {
    doc: Arc<RwLock<Document>>,
    store: Arc<Mutex<AnnotationStore>>,
    session: Mutex<PointerSession>,
    pending: Mutex<Option<PendingDraft>>,
    sync: SyncDispatcher,
    storage: Arc<dyn StorageBackend>,
    persist_mode: PersistMode,
    persist_key: StdMutex<Option<String>>,
    hydrated: Arc<AtomicBool>,
    write_task: StdMutex<Option<JoinHandle<()>>>,
    hydration_task: StdMutex<Option<JoinHandle<()>>>,
    page_context: PageContextProvider,
    events: SharedEventHandler,
    cancel: CancellationToken,
}

impl AnnotationEngine {
    pub fn new(
        doc: Arc<RwLock<Document>>,
        storage: Arc<dyn StorageBackend>,
        transport: Arc<dyn SyncTransport>,
        page_context: PageContextProvider,
        config: EngineConfig,
    ) -> Self {
        let pathname = page_context().pathname;
        let persist_key = persist::build_persist_key(&config.persist, &pathname);
        // With persistence off there is nothing to hydrate, so writes (a
        // no-op anyway) are unblocked from the start.
        let hydrated = Arc::new(AtomicBool::new(persist_key.is_none()));

        Self {
            doc,
            store: Arc::new(Mutex::new(AnnotationStore::new())),
            session: Mutex::new(PointerSession::new()),
            pending: Mutex::new(None),
            sync: SyncDispatcher::new(config.sync, transport, page_context.clone()),
            storage,
            persist_mode: config.persist,
            persist_key: StdMutex::new(persist_key),
            hydrated,
            write_task: StdMutex::new(None),
            hydration_task: StdMutex::new(None),
            page_context,
            events: Arc::new(StdMutex::new(None)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn set_event_handler(&self, handler: EngineEventHandler) {
        *self.events.lock().unwrap() = Some(handler);
    }

    pub fn set_sync_success_handler(&self, handler: SyncSuccessHandler) {
        self.sync.set_on_success(handler);
    }

    pub fn set_sync_error_handler(&self, handler: SyncErrorHandler) {
        self.sync.set_on_error(handler);
    }

    fn emit(&self, event: EngineEvent) {
        emit_event(&self.events, event);
    }

    // --- inspection session ----------------------------------------------

    pub async fn activate(&self) {
        self.session.lock().await.set_active(true);
    }

    pub async fn deactivate(&self) {
        self.session.lock().await.set_active(false);
        *self.pending.lock().await = None;
    }

    pub async fn is_active(&self) -> bool {
        self.session.lock().await.is_active()
    }

    /// Register a chrome root excluded from targeting (e.g. the toolbar).
    pub async fn add_exclusion(&self, root: NodeId) {
        self.session.lock().await.add_exclusion(root);
    }

    /// Forward one raw pointer event. A completed interaction is parked as
    /// the pending draft and also returned/emitted for the chrome.
    pub async fn pointer_input(&self, input: PointerInput) -> Option<PointerIntent> {
        let mut session = self.session.lock().await;
        let intent = {
            let doc = self.doc.read().unwrap();
            session.handle_input(&doc, input)
        };
        drop(session);

        if let Some(intent) = &intent {
            let draft = match intent {
                PointerIntent::Click {
                    element,
                    click_x,
                    click_y,
                } => PendingDraft::Single {
                    click_x: *click_x,
                    click_y: *click_y,
                    target: element.clone(),
                },
                PointerIntent::Area { area, elements } => PendingDraft::Area {
                    area: *area,
                    elements: elements.clone(),
                },
            };
            *self.pending.lock().await = Some(draft);
            self.emit(EngineEvent::Intent(intent.clone()));
        }
        intent
    }

    /// Animation-frame tick from the host. Emits a hover update when the
    /// highlighted target changed.
    pub async fn on_frame(&self) -> bool {
        let mut session = self.session.lock().await;
        let changed = {
            let doc = self.doc.read().unwrap();
            session.on_frame(&doc)
        };
        if changed {
            let hovered = session.hovered().cloned();
            drop(session);
            self.emit(EngineEvent::HoverChanged(hovered));
        }
        changed
    }

    pub async fn hovered(&self) -> Option<InspectedTarget> {
        self.session.lock().await.hovered().cloned()
    }

    // --- pending draft ---------------------------------------------------

    pub async fn has_pending(&self) -> bool {
        self.pending.lock().await.is_some()
    }

    pub async fn clear_pending(&self) {
        *self.pending.lock().await = None;
    }

    /// Turn the pending draft into an annotation. Whitespace-only content
    /// is rejected (the draft stays parked) and no record is created.
    pub async fn submit_pending(&self, content: &str) -> Option<Annotation> {
        if content.trim().is_empty() {
            return None;
        }
        let draft = self.pending.lock().await.take()?;
        match draft {
            PendingDraft::Single {
                click_x,
                click_y,
                target,
            } => self.add_single(content, click_x, click_y, target).await,
            PendingDraft::Area { area, elements } => {
                self.add_group(content, area, elements).await
            }
        }
    }

    // --- imperative operations -------------------------------------------

    pub async fn add_single(
        &self,
        content: &str,
        click_x: f64,
        click_y: f64,
        target: InspectedTarget,
    ) -> Option<Annotation> {
        if content.trim().is_empty() {
            return None;
        }
        let scroll = self.scroll_offset();
        let item = self
            .store
            .lock()
            .await
            .add_single(content, click_x, click_y, scroll, target);
        self.after_mutation().await;
        self.sync.annotation_created(&item);
        self.emit(EngineEvent::AnnotationCreated(item.clone()));
        Some(item)
    }

    pub async fn add_group(
        &self,
        content: &str,
        area: Rect,
        elements: Vec<InspectedTarget>,
    ) -> Option<Annotation> {
        if content.trim().is_empty() {
            return None;
        }
        let scroll = self.scroll_offset();
        let item = self
            .store
            .lock()
            .await
            .add_group(content, area, scroll, elements);
        self.after_mutation().await;
        self.sync.annotation_created(&item);
        self.emit(EngineEvent::AnnotationCreated(item.clone()));
        Some(item)
    }

    pub async fn update(&self, id: &str, content: &str) -> bool {
        if content.trim().is_empty() {
            return false;
        }
        let updated = self.store.lock().await.update(id, content);
        if updated {
            self.after_mutation().await;
            self.sync.annotation_updated(id, content);
            self.emit(EngineEvent::AnnotationUpdated {
                id: id.to_string(),
                content: content.to_string(),
            });
        }
        updated
    }

    pub async fn delete(&self, id: &str) -> bool {
        let deleted = self.store.lock().await.delete(id);
        if deleted {
            self.after_mutation().await;
            self.sync.annotation_deleted(id);
            self.emit(EngineEvent::AnnotationDeleted { id: id.to_string() });
        }
        deleted
    }

    pub async fn clear_all(&self) -> bool {
        let cleared = self.store.lock().await.clear_all();
        if cleared {
            self.after_mutation().await;
            self.emit(EngineEvent::AnnotationsCleared);
        }
        cleared
    }

    pub async fn undo(&self) -> bool {
        let restored = self.store.lock().await.undo();
        if restored {
            self.after_mutation().await;
        }
        restored
    }

    pub async fn can_undo(&self) -> bool {
        self.store.lock().await.can_undo()
    }

    pub async fn annotations(&self) -> Vec<Annotation> {
        self.store.lock().await.items().to_vec()
    }

    pub fn detect_framework(&self) -> FrameworkDetection {
        let doc = self.doc.read().unwrap();
        introspect::detect_framework(&doc)
    }

    // --- export / sync ---------------------------------------------------

    pub async fn export_detailed(&self) -> String {
        let items = self.annotations().await;
        export::format_detailed(&items, &(self.page_context)())
    }

    pub async fn export_debug(&self) -> String {
        let items = self.annotations().await;
        export::format_debug(&items, &(self.page_context)())
    }

    /// Explicit batch flush, e.g. behind the chrome's copy-all action.
    pub fn flush_sync(&self) {
        self.sync.flush();
    }

    // --- persistence -----------------------------------------------------

    /// Two-phase load of the persisted collection. Placeholders land in the
    /// store immediately; selector resolution runs on a retry timer and
    /// orphans whatever never resolves.
    pub async fn hydrate(&self) {
        let key = self.persist_key.lock().unwrap().clone();
        let Some(key) = key else {
            self.hydrated.store(true, Ordering::SeqCst);
            self.emit(EngineEvent::HydrationComplete { orphans: 0 });
            return;
        };

        let records = persist::load_serialized(&*self.storage, &key);
        self.store
            .lock()
            .await
            .replace_all(persist::placeholders(&records));

        if records.is_empty() {
            self.hydrated.store(true, Ordering::SeqCst);
            self.emit(EngineEvent::HydrationComplete { orphans: 0 });
            return;
        }

        let mut guard = self.hydration_task.lock().unwrap();
        if let Some(handle) = guard.take() {
            handle.abort();
        }
        *guard = Some(tokio::spawn(resolve_loop(
            self.doc.clone(),
            self.store.clone(),
            records,
            self.hydrated.clone(),
            self.events.clone(),
            self.cancel.clone(),
        )));
    }

    /// The host's router navigated. The inspection session and pending
    /// draft are dropped, the framework-detection cache is invalidated and
    /// the collection for the new pathname is hydrated.
    pub async fn navigated(&self, pathname: &str) {
        info!("navigated to {pathname}, rehydrating");
        self.deactivate().await;
        introspect::reset_detection_cache();

        let key = persist::build_persist_key(&self.persist_mode, pathname);
        self.hydrated.store(key.is_none(), Ordering::SeqCst);
        *self.persist_key.lock().unwrap() = key;

        self.store.lock().await.replace_all(Vec::new());
        self.hydrate().await;
    }

    fn scroll_offset(&self) -> (f64, f64) {
        let doc = self.doc.read().unwrap();
        (doc.scroll_x, doc.scroll_y)
    }

    /// Debounced full-collection write, suppressed until hydration is done
    /// so an in-flight empty collection can never clobber durable state.
    async fn after_mutation(&self) {
        if !self.hydrated.load(Ordering::SeqCst) {
            return;
        }
        let key = self.persist_key.lock().unwrap().clone();
        let Some(key) = key else {
            return;
        };
        let items = self.store.lock().await.items().to_vec();
        let storage = self.storage.clone();
        let cancel = self.cancel.clone();

        let mut guard = self.write_task.lock().unwrap();
        if let Some(handle) = guard.take() {
            handle.abort();
        }
        *guard = Some(tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(persist::WRITE_DEBOUNCE_MS)) => {
                    persist::save_annotations(&*storage, &key, &items);
                }
                _ = cancel.cancelled() => {}
            }
        }));
    }

    /// Cancel every pending timer and in-flight request this engine owns.
    pub async fn teardown(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.write_task.lock().unwrap().take() {
            handle.abort();
        }
        if let Some(handle) = self.hydration_task.lock().unwrap().take() {
            handle.abort();
        }
        self.sync.teardown();
        self.deactivate().await;
    }
}

fn emit_event(events: &SharedEventHandler, event: EngineEvent) {
    let handler = events.lock().unwrap().clone();
    if let Some(handler) = handler {
        handler(&event);
    }
}

async fn resolve_loop(
    doc: Arc<RwLock<Document>>,
    store: Arc<Mutex<AnnotationStore>>,
    records: Vec<crate::models::annotation::SerializedAnnotation>,
    hydrated: Arc<AtomicBool>,
    events: SharedEventHandler,
    cancel: CancellationToken,
) {
    let mut orphans = 0;

    for attempt in 1..=persist::MAX_RESOLVE_ATTEMPTS {
        let final_attempt = attempt == persist::MAX_RESOLVE_ATTEMPTS;
        let outcome = {
            let doc = doc.read().unwrap();
            persist::resolve_against(&doc, &records, final_attempt)
        };
        let unresolved = outcome.unresolved;
        orphans = outcome.annotations.iter().filter(|a| a.orphan).count();
        store.lock().await.replace_all(outcome.annotations);

        if unresolved == 0 || final_attempt {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(persist::RESOLVE_RETRY_DELAY_MS)) => {}
            _ = cancel.cancelled() => return,
        }
    }

    hydrated.store(true, Ordering::SeqCst);
    emit_event(&events, EngineEvent::HydrationComplete { orphans });
}
