//! Owner of the ordered annotation collection.
//!
//! Step numbers stay a dense `1..N` sequence matching array order after
//! every operation; deletes and bulk clears snapshot the collection onto a
//! bounded undo stack first.

use chrono::Utc;
use uuid::Uuid;

use crate::models::annotation::{Annotation, AreaData};
use crate::models::geometry::Rect;
use crate::models::target::InspectedTarget;

/// Snapshots kept for undo; pushing past this evicts the oldest.
pub const MAX_UNDO_DEPTH: usize = 10;

#[derive(Default)]
pub struct AnnotationStore {
    items: Vec<Annotation>,
    undo_stack: Vec<Vec<Annotation>>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Annotation] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Annotation> {
        self.items.iter().find(|a| a.id == id)
    }

    /// Annotate a single element. The click offset is computed against the
    /// target's top-left corner; page coordinates are the click plus the
    /// current scroll offset.
    pub fn add_single(
        &mut self,
        content: &str,
        click_x: f64,
        click_y: f64,
        scroll: (f64, f64),
        target: InspectedTarget,
    ) -> Annotation {
        let item = Annotation {
            id: Uuid::new_v4().to_string(),
            step_number: self.items.len() + 1,
            content: content.to_string(),
            selector: target.selector.clone(),
            offset_x: click_x - target.rect.left(),
            offset_y: click_y - target.rect.top(),
            page_x: click_x + scroll.0,
            page_y: click_y + scroll.1,
            target: target.node,
            element: Some(target),
            elements: Vec::new(),
            area_data: None,
            is_area_only: false,
            created_at: Utc::now().timestamp_millis(),
            orphan: false,
        };
        self.items.push(item.clone());
        item
    }

    /// Annotate a drag selection. With no captured elements the record is
    /// area-only; otherwise the member set is stored and the first member's
    /// selector kept as a display hint.
    pub fn add_group(
        &mut self,
        content: &str,
        area: Rect,
        scroll: (f64, f64),
        elements: Vec<InspectedTarget>,
    ) -> Annotation {
        let center_x = area.x + scroll.0 + area.width / 2.0;
        let center_y = area.y + scroll.1 + area.height / 2.0;
        let item = Annotation {
            id: Uuid::new_v4().to_string(),
            step_number: self.items.len() + 1,
            content: content.to_string(),
            selector: elements
                .first()
                .map(|e| e.selector.clone())
                .unwrap_or_default(),
            offset_x: 0.0,
            offset_y: 0.0,
            page_x: center_x,
            page_y: center_y,
            target: None,
            element: None,
            is_area_only: elements.is_empty(),
            area_data: Some(AreaData {
                center_x,
                center_y,
                width: area.width,
                height: area.height,
                element_count: elements.len(),
            }),
            elements,
            created_at: Utc::now().timestamp_millis(),
            orphan: false,
        };
        self.items.push(item.clone());
        item
    }

    /// Replace the content of an annotation. Nothing else changes.
    pub fn update(&mut self, id: &str, content: &str) -> bool {
        match self.items.iter_mut().find(|a| a.id == id) {
            Some(item) => {
                item.content = content.to_string();
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: &str) -> bool {
        if !self.items.iter().any(|a| a.id == id) {
            return false;
        }
        self.push_snapshot();
        self.items.retain(|a| a.id != id);
        self.renumber();
        true
    }

    /// Snapshot-then-empty, only when there is something to clear.
    pub fn clear_all(&mut self) -> bool {
        if self.items.is_empty() {
            return false;
        }
        self.push_snapshot();
        self.items.clear();
        true
    }

    /// Restore the most recent snapshot verbatim, step numbers included.
    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(snapshot) => {
                self.items = snapshot;
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Swap in a full replacement collection (rehydration). The undo stack
    /// is left alone.
    pub fn replace_all(&mut self, items: Vec<Annotation>) {
        self.items = items;
    }

    fn push_snapshot(&mut self) {
        if self.undo_stack.len() == MAX_UNDO_DEPTH {
            self.undo_stack.remove(0);
        }
        self.undo_stack.push(self.items.clone());
    }

    fn renumber(&mut self) {
        for (index, item) in self.items.iter_mut().enumerate() {
            item.step_number = index + 1;
        }
    }
}
