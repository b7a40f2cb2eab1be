use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::annotation::{Annotation, AreaData, SerializedElement};
use crate::models::page::{PageContext, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncEventType {
    #[serde(rename = "feedback.created")]
    Created,
    #[serde(rename = "feedback.updated")]
    Updated,
    #[serde(rename = "feedback.deleted")]
    Deleted,
    #[serde(rename = "feedback.batch")]
    Batch,
}

/// Page block of the wire payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePayload {
    pub url: String,
    pub pathname: String,
    pub viewport: Viewport,
}

impl PagePayload {
    pub fn from_context(page: &PageContext) -> Self {
        Self {
            url: page.url.clone(),
            pathname: page.pathname.clone(),
            viewport: page.viewport,
        }
    }
}

/// One annotation in its wire form, with live references stripped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAnnotationData {
    pub id: String,
    pub step_number: usize,
    pub content: String,
    pub selector: String,
    pub page_x: f64,
    pub page_y: f64,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<SerializedElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_data: Option<AreaData>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_area_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<Vec<SerializedElement>>,
}

impl SyncAnnotationData {
    pub fn from_annotation(item: &Annotation) -> Self {
        Self {
            id: item.id.clone(),
            step_number: item.step_number,
            content: item.content.clone(),
            selector: item.selector.clone(),
            page_x: item.page_x,
            page_y: item.page_y,
            created_at: item.created_at,
            element: item.element.as_ref().map(SerializedElement::from_target),
            area_data: item.area_data,
            is_area_only: item.is_area_only,
            elements: if item.elements.is_empty() {
                None
            } else {
                Some(
                    item.elements
                        .iter()
                        .map(SerializedElement::from_target)
                        .collect(),
                )
            },
        }
    }
}

/// The JSON document POSTed per lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    pub event: SyncEventType,
    /// Epoch milliseconds at payload build time.
    pub timestamp: i64,
    pub page: PagePayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<SyncAnnotationData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedbacks: Option<Vec<SyncAnnotationData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_content: Option<String>,
}

pub fn build_payload(
    event: SyncEventType,
    page: &PageContext,
    item: Option<&Annotation>,
    feedback_id: Option<String>,
    updated_content: Option<String>,
) -> SyncPayload {
    SyncPayload {
        event,
        timestamp: Utc::now().timestamp_millis(),
        page: PagePayload::from_context(page),
        feedback: item.map(SyncAnnotationData::from_annotation),
        feedbacks: None,
        feedback_id,
        updated_content,
    }
}

pub fn build_batch_payload(page: &PageContext, items: &[SyncAnnotationData]) -> SyncPayload {
    SyncPayload {
        event: SyncEventType::Batch,
        timestamp: Utc::now().timestamp_millis(),
        page: PagePayload::from_context(page),
        feedback: None,
        feedbacks: Some(items.to_vec()),
        feedback_id: None,
        updated_content: None,
    }
}
