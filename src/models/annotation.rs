use serde::{Deserialize, Serialize};

use crate::dom::NodeId;
use crate::models::target::{ElementAccessibility, ElementMetadata, InspectedTarget};
use crate::models::geometry::Rect;

/// Shape of a completed drag selection, kept for group annotations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaData {
    /// Center of the drag rectangle in absolute page coordinates.
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
    /// Number of elements captured when the drag completed.
    pub element_count: usize,
}

/// A single annotation pinned to a DOM target (or a drag-selected group,
/// or an empty region). The persistent unit of the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: String,
    /// 1-based, dense across the collection; renumbered on delete.
    pub step_number: usize,
    pub content: String,
    /// Selector of the primary target. For groups this is only a display
    /// hint taken from the first member.
    pub selector: String,
    /// Click offset relative to the target's top-left corner.
    pub offset_x: f64,
    pub offset_y: f64,
    /// Absolute page coordinates of the interaction.
    pub page_x: f64,
    pub page_y: f64,
    /// Weak reference to the live target node; null when orphaned.
    pub target: Option<NodeId>,
    /// Captured target snapshot; null when orphaned.
    pub element: Option<InspectedTarget>,
    /// Group members (empty for single-target annotations).
    pub elements: Vec<InspectedTarget>,
    pub area_data: Option<AreaData>,
    /// Drag selection over empty space, with no elements at all.
    pub is_area_only: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Target could not be re-located after rehydration.
    pub orphan: bool,
}

impl Annotation {
    pub fn is_group(&self) -> bool {
        !self.elements.is_empty() || self.area_data.is_some()
    }

    /// Storage-safe projection: live references dropped, targets reduced to
    /// their serializable shapes.
    pub fn to_serialized(&self) -> SerializedAnnotation {
        SerializedAnnotation {
            id: self.id.clone(),
            step_number: self.step_number,
            content: self.content.clone(),
            selector: self.selector.clone(),
            offset_x: self.offset_x,
            offset_y: self.offset_y,
            page_x: self.page_x,
            page_y: self.page_y,
            created_at: self.created_at,
            tag_name: self
                .element
                .as_ref()
                .map(|e| e.tag_name.clone())
                .unwrap_or_default(),
            class_name: self
                .element
                .as_ref()
                .map(|e| e.class_name.clone())
                .unwrap_or_default(),
            element_id: self
                .element
                .as_ref()
                .map(|e| e.id.clone())
                .unwrap_or_default(),
            metadata: self.element.as_ref().map(|e| e.metadata.clone()),
            area_data: self.area_data,
            is_area_only: self.is_area_only,
            elements: self.elements.iter().map(SerializedElement::from_target).collect(),
        }
    }
}

/// JSON projection of one group member or sync-payload element. No live
/// document references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedElement {
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub element_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<Rect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<ElementAccessibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_tree: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_props: Option<std::collections::BTreeMap<String, String>>,
}

impl SerializedElement {
    pub fn from_target(target: &InspectedTarget) -> Self {
        let m = &target.metadata;
        Self {
            selector: target.selector.clone(),
            tag_name: target.tag_name.clone(),
            class_name: target.class_name.clone(),
            element_id: target.id.clone(),
            element_path: Some(m.element_path.clone()),
            full_path: Some(m.full_path.clone()),
            element_description: Some(m.element_description.clone()),
            bounding_box: Some(m.bounding_box),
            accessibility: Some(ElementAccessibility {
                role: m.accessibility.role.clone(),
                label: m.accessibility.label.clone(),
                description: None,
            }),
            component_name: target.component.as_ref().map(|c| c.name.clone()),
            component_tree: target.component.as_ref().map(|c| c.tree_path.clone()),
            component_props: target.component.as_ref().map(|c| c.props.clone()),
        }
    }
}

/// Stored record shape: one of these per annotation, one JSON array per
/// storage key. Loaders must tolerate missing optional fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedAnnotation {
    pub id: String,
    #[serde(default)]
    pub step_number: usize,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
    #[serde(default)]
    pub page_x: f64,
    #[serde(default)]
    pub page_y: f64,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub element_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ElementMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_data: Option<AreaData>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_area_only: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<SerializedElement>,
}
