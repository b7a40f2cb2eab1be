//! Durable persistence and the two-phase rehydration of stored annotations
//! against a live, possibly-not-yet-ready document.
//!
//! Phase one turns stored records into placeholder annotations with no
//! document queries at all, so callers have a presentable collection
//! immediately. Phase two re-locates each record's selector against the
//! live document, retried on a short timer because single-page apps swap
//! content in well after the initial mount; whatever is still unresolved
//! after the final pass is marked orphaned.

pub mod storage;

pub use storage::{MemoryStorage, SqliteStorage, StorageBackend};

use log::warn;
use serde_json::Value;

use crate::dom::Document;
use crate::inspect;
use crate::models::annotation::{Annotation, SerializedAnnotation};

/// Prefix for every storage key this engine owns.
pub const STORAGE_PREFIX: &str = "pagemark:";
/// Quiet period before a store mutation is flushed to storage.
pub const WRITE_DEBOUNCE_MS: u64 = 300;
/// Delay between rehydration resolution passes.
pub const RESOLVE_RETRY_DELAY_MS: u64 = 500;
/// Resolution passes before unresolved records are orphaned.
pub const MAX_RESOLVE_ATTEMPTS: u32 = 5;

/// How the engine scopes its storage key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PersistMode {
    #[default]
    Disabled,
    /// One collection per page, keyed by pathname.
    PageScoped,
    /// One collection under a caller-chosen suffix.
    Custom(String),
}

pub fn build_persist_key(mode: &PersistMode, pathname: &str) -> Option<String> {
    match mode {
        PersistMode::Disabled => None,
        PersistMode::PageScoped => Some(format!("{STORAGE_PREFIX}{pathname}")),
        PersistMode::Custom(suffix) if !suffix.is_empty() => {
            Some(format!("{STORAGE_PREFIX}{suffix}"))
        }
        PersistMode::Custom(_) => None,
    }
}

/// Serialize the collection and write it under `key`. Write failures are
/// swallowed: the in-memory store stays authoritative for the session.
pub fn save_annotations(storage: &dyn StorageBackend, key: &str, items: &[Annotation]) {
    let serialized: Vec<SerializedAnnotation> = items.iter().map(|a| a.to_serialized()).collect();
    let json = match serde_json::to_string(&serialized) {
        Ok(json) => json,
        Err(err) => {
            warn!("failed to serialize annotations for {key}: {err}");
            return;
        }
    };
    if let Err(err) = storage.set(key, &json) {
        warn!("annotation write failed for {key}: {err}");
    }
}

/// Load stored records under `key`. Corrupt JSON purges the entry and
/// yields an empty set; a well-formed non-array payload is treated as
/// empty; records with unknown or missing optional fields still load.
pub fn load_serialized(storage: &dyn StorageBackend, key: &str) -> Vec<SerializedAnnotation> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!("annotation read failed for {key}: {err}");
            return Vec::new();
        }
    };

    let parsed: Value = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(_) => {
            // Corrupted payload: purge it so it cannot poison later loads.
            let _ = storage.remove(key);
            return Vec::new();
        }
    };

    let Value::Array(entries) = parsed else {
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect()
}

pub fn clear_persisted(storage: &dyn StorageBackend, key: &str) {
    let _ = storage.remove(key);
}

/// Phase one: placeholder annotations with no live references. `orphan`
/// stays false: the records are pending, not yet judged.
pub fn placeholders(records: &[SerializedAnnotation]) -> Vec<Annotation> {
    records.iter().map(placeholder_of).collect()
}

fn placeholder_of(record: &SerializedAnnotation) -> Annotation {
    Annotation {
        id: record.id.clone(),
        step_number: record.step_number,
        content: record.content.clone(),
        selector: record.selector.clone(),
        offset_x: record.offset_x,
        offset_y: record.offset_y,
        page_x: record.page_x,
        page_y: record.page_y,
        target: None,
        element: None,
        elements: Vec::new(),
        area_data: record.area_data,
        is_area_only: record.is_area_only,
        created_at: record.created_at,
        orphan: false,
    }
}

/// One resolution pass over the stored records.
pub struct ResolveOutcome {
    pub annotations: Vec<Annotation>,
    /// Records that still have at least one unlocated selector.
    pub unresolved: usize,
}

/// Phase two: re-locate every record against the live document. On the
/// final attempt unresolved single-target records are orphaned; a group
/// record is orphaned only when every member failed (partial resolution
/// keeps it live with the reduced element list).
pub fn resolve_against(
    doc: &Document,
    records: &[SerializedAnnotation],
    final_attempt: bool,
) -> ResolveOutcome {
    let mut unresolved = 0;
    let annotations = records
        .iter()
        .map(|record| {
            let mut item = placeholder_of(record);

            if record.is_area_only {
                // Nothing to re-locate; the region stands on its own.
                return item;
            }

            if !record.elements.is_empty() {
                let mut resolved = Vec::new();
                for member in &record.elements {
                    if let Some(node) = safe_query(doc, &member.selector) {
                        resolved.push(inspect::build_target(doc, node));
                    }
                }
                if resolved.len() < record.elements.len() {
                    unresolved += 1;
                }
                if resolved.is_empty() {
                    if final_attempt {
                        item.orphan = true;
                    }
                } else {
                    item.elements = resolved;
                }
                return item;
            }

            match safe_query(doc, &record.selector) {
                Some(node) => {
                    // Identity comes from the record; geometry-bearing
                    // metadata is rebuilt from the node as it stands now.
                    item.target = Some(node);
                    item.element = Some(inspect::build_target(doc, node));
                }
                None => {
                    unresolved += 1;
                    if final_attempt {
                        item.orphan = true;
                    }
                }
            }
            item
        })
        .collect();

    ResolveOutcome {
        annotations,
        unresolved,
    }
}

fn safe_query(doc: &Document, selector: &str) -> Option<crate::dom::NodeId> {
    if selector.is_empty() {
        return None;
    }
    doc.query_selector(selector)
}
