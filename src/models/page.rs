use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Environment of the host page, supplied by the embedder. Used for sync
/// payloads and export headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub url: String,
    pub pathname: String,
    pub viewport: Viewport,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub device_pixel_ratio: f64,
}
