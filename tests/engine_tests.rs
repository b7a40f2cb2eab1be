use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use pagemark::dom::{Document, ElementSpec, NodeId};
use pagemark::engine::{AnnotationEngine, EngineConfig, EngineEvent};
use pagemark::models::{PageContext, Rect, Viewport};
use pagemark::persist::{MemoryStorage, PersistMode, StorageBackend};
use pagemark::session::{PointerAction, PointerInput};
use pagemark::sync::{SyncConfig, SyncPayload, SyncTransport};

struct NullTransport;

#[async_trait]
impl SyncTransport for NullTransport {
    async fn post(
        &self,
        _url: &str,
        _headers: &HashMap<String, String>,
        _payload: &SyncPayload,
    ) -> Result<u16> {
        Ok(200)
    }
}

fn page_provider(pathname: Arc<Mutex<String>>) -> Arc<dyn Fn() -> PageContext + Send + Sync> {
    Arc::new(move || PageContext {
        url: format!("https://app.test{}", pathname.lock().unwrap()),
        pathname: pathname.lock().unwrap().clone(),
        viewport: Viewport {
            width: 1280,
            height: 720,
        },
        user_agent: "test-agent".into(),
        device_pixel_ratio: 2.0,
    })
}

fn checkout_page() -> (Arc<RwLock<Document>>, NodeId) {
    let mut doc = Document::new();
    let body = doc.body();
    let button = doc.append(
        body,
        ElementSpec::new("button")
            .id("purchase")
            .text("Buy now")
            .rect(Rect::new(10.0, 10.0, 100.0, 40.0)),
    );
    (Arc::new(RwLock::new(doc)), button)
}

fn engine_with(
    doc: Arc<RwLock<Document>>,
    storage: Arc<dyn StorageBackend>,
    persist: PersistMode,
) -> AnnotationEngine {
    AnnotationEngine::new(
        doc,
        storage,
        Arc::new(NullTransport),
        page_provider(Arc::new(Mutex::new("/checkout".to_string()))),
        EngineConfig {
            persist,
            sync: SyncConfig::default(),
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_click_to_annotation_flow() {
    let (doc, button) = checkout_page();
    let engine = engine_with(doc, Arc::new(MemoryStorage::new()), PersistMode::Disabled);

    engine.activate().await;
    engine
        .pointer_input(PointerInput::new(PointerAction::Down, 30.0, 25.0))
        .await;
    let intent = engine
        .pointer_input(PointerInput::new(PointerAction::Up, 30.0, 25.0))
        .await;
    assert!(intent.is_some());
    assert!(engine.has_pending().await);

    // Whitespace is rejected at the submission boundary; the draft stays.
    assert!(engine.submit_pending("   ").await.is_none());
    assert!(engine.has_pending().await);

    let item = engine.submit_pending("Button label is unclear").await.unwrap();
    assert!(!engine.has_pending().await);
    assert_eq!(item.step_number, 1);
    assert_eq!(item.selector, "#purchase");
    assert_eq!(item.offset_x, 20.0);
    assert_eq!(item.offset_y, 15.0);
    assert_eq!(item.target, Some(button));

    let items = engine.annotations().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content, "Button label is unclear");
}

#[tokio::test(start_paused = true)]
async fn test_update_delete_undo_surface() {
    let (doc, _) = checkout_page();
    let engine = engine_with(doc.clone(), Arc::new(MemoryStorage::new()), PersistMode::Disabled);

    let target = {
        let doc = doc.read().unwrap();
        pagemark::inspect::build_target(&doc, doc.query_selector("#purchase").unwrap())
    };
    let item = engine.add_single("draft", 30.0, 25.0, target).await.unwrap();

    assert!(engine.update(&item.id, "final").await);
    assert!(!engine.update(&item.id, "  ").await);
    assert!(!engine.update("missing", "x").await);

    assert!(engine.delete(&item.id).await);
    assert!(engine.annotations().await.is_empty());
    assert!(engine.can_undo().await);
    assert!(engine.undo().await);
    let restored = engine.annotations().await;
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].content, "final");
}

#[tokio::test(start_paused = true)]
async fn test_persisted_collection_rehydrates() {
    let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    let (doc, button) = checkout_page();

    {
        let engine = engine_with(doc.clone(), storage.clone(), PersistMode::Custom("t".into()));
        engine.hydrate().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let target = {
            let doc = doc.read().unwrap();
            pagemark::inspect::build_target(&doc, button)
        };
        engine.add_single("persisted note", 30.0, 25.0, target).await;
        // The debounced write needs its quiet period.
        tokio::time::sleep(Duration::from_secs(1)).await;
        engine.teardown().await;
    }

    // A fresh engine over the same storage and a regenerated document.
    let (doc2, button2) = checkout_page();
    let engine = engine_with(doc2, storage, PersistMode::Custom("t".into()));
    let events: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine.set_event_handler(Arc::new(move |event| {
        if let EngineEvent::HydrationComplete { orphans } = event {
            sink.lock().unwrap().push(*orphans);
        }
    }));

    engine.hydrate().await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    let items = engine.annotations().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content, "persisted note");
    assert!(!items[0].orphan);
    assert_eq!(items[0].target, Some(button2));
    assert_eq!(*events.lock().unwrap(), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn test_missing_target_orphans_after_rehydration() {
    let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    let (doc, button) = checkout_page();

    {
        let engine = engine_with(doc.clone(), storage.clone(), PersistMode::Custom("t".into()));
        engine.hydrate().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        let target = {
            let doc = doc.read().unwrap();
            pagemark::inspect::build_target(&doc, button)
        };
        engine.add_single("goes stale", 30.0, 25.0, target).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        engine.teardown().await;
    }

    // Reload landed on a page without the target element.
    let empty = Arc::new(RwLock::new(Document::new()));
    let engine = engine_with(empty, storage, PersistMode::Custom("t".into()));
    engine.hydrate().await;
    // Placeholder phase is immediate and not yet judged.
    let pending = engine.annotations().await;
    assert_eq!(pending.len(), 1);
    assert!(!pending[0].orphan);

    // Let all resolution retries elapse.
    tokio::time::sleep(Duration::from_secs(5)).await;
    let items = engine.annotations().await;
    assert!(items[0].orphan);
    assert!(items[0].target.is_none());
    assert!(items[0].element.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_writes_are_suppressed_until_hydration_completes() {
    let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    storage
        .set(
            "pagemark:t",
            r##"[{"id":"a1","stepNumber":1,"content":"from storage","selector":"#purchase","createdAt":1}]"##,
        )
        .unwrap();

    let (doc, button) = checkout_page();
    let engine = engine_with(doc.clone(), storage.clone(), PersistMode::Custom("t".into()));

    // A mutation before hydration must not clobber durable state.
    let target = {
        let doc = doc.read().unwrap();
        pagemark::inspect::build_target(&doc, button)
    };
    engine.add_single("too early", 30.0, 25.0, target).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(storage
        .get("pagemark:t")
        .unwrap()
        .unwrap()
        .contains("from storage"));

    engine.hydrate().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    let items = engine.annotations().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content, "from storage");

    // After hydration, mutations flow through to storage again.
    assert!(engine.update(&items[0].id, "edited later").await);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(storage
        .get("pagemark:t")
        .unwrap()
        .unwrap()
        .contains("edited later"));
}

#[tokio::test(start_paused = true)]
async fn test_navigation_switches_collections() {
    let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    let (doc, button) = checkout_page();
    let pathname = Arc::new(Mutex::new("/a".to_string()));
    let engine = AnnotationEngine::new(
        doc.clone(),
        storage.clone(),
        Arc::new(NullTransport),
        page_provider(pathname.clone()),
        EngineConfig {
            persist: PersistMode::PageScoped,
            sync: SyncConfig::default(),
        },
    );

    engine.hydrate().await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    let target = {
        let doc = doc.read().unwrap();
        pagemark::inspect::build_target(&doc, button)
    };
    engine.add_single("note on /a", 30.0, 25.0, target).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(storage.get("pagemark:/a").unwrap().is_some());

    *pathname.lock().unwrap() = "/b".to_string();
    engine.navigated("/b").await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(engine.annotations().await.is_empty());

    // Coming back re-hydrates the original page's collection.
    *pathname.lock().unwrap() = "/a".to_string();
    engine.navigated("/a").await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    let items = engine.annotations().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content, "note on /a");
}

#[tokio::test(start_paused = true)]
async fn test_export_renders_the_collection() {
    let (doc, button) = checkout_page();
    let engine = engine_with(doc.clone(), Arc::new(MemoryStorage::new()), PersistMode::Disabled);

    let target = {
        let doc = doc.read().unwrap();
        pagemark::inspect::build_target(&doc, button)
    };
    engine.add_single("Make this primary", 30.0, 25.0, target).await;

    let detailed = engine.export_detailed().await;
    assert!(detailed.contains("## Page Feedback: /checkout"));
    assert!(detailed.contains("**Viewport:** 1280×720"));
    assert!(detailed.contains("### 1. button: \"Buy now\""));
    assert!(detailed.contains("**Feedback:** Make this primary"));

    let debug = engine.export_debug().await;
    assert!(debug.contains("**Environment:**"));
    assert!(debug.contains("- User Agent: test-agent"));
    assert!(debug.contains("**Full DOM Path:** body > button#purchase"));
    assert!(debug.contains("**Annotation at:** 20.0% from left"));
}

#[tokio::test(start_paused = true)]
async fn test_area_intent_to_group_annotation() {
    let (doc, _) = checkout_page();
    {
        let mut doc = doc.write().unwrap();
        let body = doc.body();
        doc.append(
            body,
            ElementSpec::new("div")
                .id("sidebar")
                .rect(Rect::new(200.0, 10.0, 120.0, 200.0)),
        );
    }
    let engine = engine_with(doc, Arc::new(MemoryStorage::new()), PersistMode::Disabled);

    engine.activate().await;
    engine
        .pointer_input(PointerInput::new(PointerAction::Down, 5.0, 5.0))
        .await;
    engine
        .pointer_input(PointerInput::new(PointerAction::Move, 330.0, 220.0))
        .await;
    let intent = engine
        .pointer_input(PointerInput::new(PointerAction::Up, 330.0, 220.0))
        .await;
    assert!(intent.is_some());

    let item = engine.submit_pending("Align this cluster").await.unwrap();
    assert!(!item.is_area_only);
    assert_eq!(item.elements.len(), 2);
    assert_eq!(item.area_data.unwrap().element_count, 2);

    // A drag over empty space still annotates, as area-only.
    engine
        .pointer_input(PointerInput::new(PointerAction::Down, 500.0, 500.0))
        .await;
    engine
        .pointer_input(PointerInput::new(PointerAction::Move, 600.0, 580.0))
        .await;
    engine
        .pointer_input(PointerInput::new(PointerAction::Up, 600.0, 580.0))
        .await;
    let empty = engine.submit_pending("What goes here?").await.unwrap();
    assert!(empty.is_area_only);
    assert!(empty.elements.is_empty());
    assert_eq!(empty.step_number, 2);
}
