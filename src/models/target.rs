use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dom::NodeId;
use crate::models::component::ComponentInfo;
use crate::models::geometry::{Dimensions, Rect};

/// Accessibility info extracted from the element or its nearest carrier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementAccessibility {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Descriptive snapshot captured at interaction time. Immutable once built;
/// only rehydration against a fresh document produces a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementMetadata {
    pub accessibility: ElementAccessibility,
    /// Bounding box in viewport coordinates, rounded.
    pub bounding_box: Rect,
    /// Snapshot of the fixed allow-list of computed styles.
    pub computed_styles: BTreeMap<String, String>,
    pub css_classes: Vec<String>,
    /// Human-readable description, e.g. `paragraph: "Some text..."`.
    pub element_description: String,
    /// Short class-based path, e.g. `.main-content > .article > p`.
    pub element_path: String,
    /// Full tag+class path, e.g. `body > main.main-content > p`.
    pub full_path: String,
    pub is_fixed: bool,
    /// Tag names of the immediate sibling elements.
    pub nearby_elements: String,
    /// Text excerpts of the immediate sibling elements.
    pub nearby_text: String,
}

/// Everything known about one inspected element. Produced per pointer
/// interaction and discarded once consumed into an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectedTarget {
    /// Weak back-reference into the live document; never persisted.
    #[serde(skip)]
    pub node: Option<NodeId>,
    pub tag_name: String,
    pub class_name: String,
    pub id: String,
    /// Generated selector usable to re-locate the same logical position.
    pub selector: String,
    pub rect: Rect,
    pub dimensions: Dimensions,
    pub metadata: ElementMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentInfo>,
}
