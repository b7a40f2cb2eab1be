//! pagemark: an embeddable inspection & annotation engine for live web
//! pages.
//!
//! The host mirrors its page into a [`dom::Document`], forwards pointer
//! events and animation-frame ticks, and gets back resolved intents,
//! annotation lifecycle events, durable persistence with rehydration, and
//! outbound sync. The visual chrome (toolbar, popovers, markers) is the
//! host's problem; this crate owns everything underneath it.

pub mod dom;
pub mod engine;
pub mod export;
pub mod inspect;
pub mod introspect;
pub mod models;
pub mod navigation;
pub mod persist;
pub mod session;
pub mod store;
pub mod sync;
pub mod utils;

pub use engine::{AnnotationEngine, EngineConfig, EngineEvent, EngineEventHandler};
pub use models::{
    Annotation, AreaData, ComponentInfo, Dimensions, ElementAccessibility, ElementMetadata,
    FrameworkDetection, InspectedTarget, PageContext, Rect, SerializedAnnotation,
    SerializedElement, Viewport,
};
pub use persist::{MemoryStorage, PersistMode, SqliteStorage, StorageBackend};
pub use session::{PointerAction, PointerInput, PointerIntent, PointerSession};
pub use store::AnnotationStore;
pub use sync::{HttpTransport, SyncConfig, SyncDispatcher, SyncMode, SyncTransport};
