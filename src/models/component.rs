use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::geometry::Rect;

/// Source location recorded by the framework in development builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSource {
    pub file_name: String,
    pub line_number: u32,
}

/// Optional enrichment recovered from the host framework's retained
/// component graph. Absent whenever the graph is unreachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInfo {
    /// Resolved component name; may be a minified token (see `is_minified`).
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<DebugSource>,
    /// Display-serialized props, capped and redacted.
    pub props: BTreeMap<String, String>,
    /// Breadcrumb from the component root down to this component.
    pub tree_path: Vec<String>,
    /// Union bounding box of every DOM node the component rendered.
    pub boundary: Rect,
    pub is_minified: bool,
}

/// Result of probing the page for the host framework.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkDetection {
    pub detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_dev: Option<bool>,
}
