use std::collections::BTreeMap;

use crate::dom::{Document, NodeId};
use crate::inspect::selector::{generate_element_path, generate_full_path};
use crate::models::target::{ElementAccessibility, ElementMetadata};

/// Computed style properties captured into every metadata snapshot. Keys are
/// emitted camelCase; values are read from the kebab-case computed style.
const CAPTURED_STYLES: [&str; 19] = [
    "color",
    "borderColor",
    "fontSize",
    "fontWeight",
    "fontFamily",
    "lineHeight",
    "letterSpacing",
    "textAlign",
    "width",
    "height",
    "margin",
    "border",
    "display",
    "flexDirection",
    "opacity",
    "position",
    "backgroundColor",
    "padding",
    "borderRadius",
];

const DESCRIPTION_PREVIEW_LEN: usize = 60;
const NEARBY_PREVIEW_LEN: usize = 40;

fn camel_to_kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn truncate_preview(text: &str, max: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() > max {
        let mut out: String = chars[..max - 3].iter().collect();
        out.push_str("...");
        out
    } else {
        text.to_string()
    }
}

/// Accessibility attributes, resolved on the element or its nearest
/// ancestor carrying them.
pub fn extract_accessibility(doc: &Document, node: NodeId) -> ElementAccessibility {
    let role = doc
        .closest_attribute(node, "role")
        .map(|(_, value)| value);
    let label = doc
        .closest_attribute(node, "aria-label")
        .map(|(_, value)| value);
    let description = doc
        .element(node)
        .attribute("aria-describedby")
        .and_then(|id| doc.element_by_id(id))
        .map(|describer| doc.text_content(describer))
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());

    ElementAccessibility {
        role,
        label,
        description,
    }
}

fn semantic_name(tag: &str) -> &str {
    match tag {
        "p" => "paragraph",
        "a" => "link",
        "img" => "image",
        "h1" => "heading 1",
        "h2" => "heading 2",
        "h3" => "heading 3",
        "h4" => "heading 4",
        "h5" => "heading 5",
        "h6" => "heading 6",
        "li" => "list item",
        other => other,
    }
}

/// Human-readable description, e.g. `paragraph: "Some text..."`.
pub fn build_element_description(doc: &Document, node: NodeId) -> String {
    let tag = &doc.element(node).tag;
    let name = semantic_name(tag);
    let text = doc.text_content(node);
    let text = text.trim();
    if text.is_empty() {
        name.to_string()
    } else {
        format!("{}: \"{}\"", name, truncate_preview(text, DESCRIPTION_PREVIEW_LEN))
    }
}

/// Tag names of the immediate sibling elements, e.g. `h2, p`.
pub fn nearby_elements(doc: &Document, node: NodeId) -> String {
    let mut nearby = Vec::new();
    if let Some(prev) = doc.prev_sibling(node) {
        nearby.push(doc.element(prev).tag.clone());
    }
    if let Some(next) = doc.next_sibling(node) {
        nearby.push(doc.element(next).tag.clone());
    }
    nearby.join(", ")
}

/// Text excerpts of the immediate siblings, e.g. `[before: "...", after: "..."]`.
pub fn nearby_text(doc: &Document, node: NodeId) -> String {
    let mut parts = Vec::new();
    if let Some(prev) = doc.prev_sibling(node) {
        let text = doc.text_content(prev);
        let text = text.trim();
        if !text.is_empty() {
            parts.push(format!("before: \"{}\"", truncate_preview(text, NEARBY_PREVIEW_LEN)));
        }
    }
    if let Some(next) = doc.next_sibling(node) {
        let text = doc.text_content(next);
        let text = text.trim();
        if !text.is_empty() {
            parts.push(format!("after: \"{}\"", truncate_preview(text, NEARBY_PREVIEW_LEN)));
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("[{}]", parts.join(", "))
    }
}

/// Snapshot everything descriptive about an element. Never fails: absent
/// attributes and styles resolve to empty fields.
pub fn collect_metadata(doc: &Document, node: NodeId) -> ElementMetadata {
    let el = doc.element(node);

    let mut computed_styles = BTreeMap::new();
    for prop in CAPTURED_STYLES {
        let value = el.style(&camel_to_kebab(prop)).unwrap_or_default();
        computed_styles.insert(prop.to_string(), value.to_string());
    }

    ElementMetadata {
        accessibility: extract_accessibility(doc, node),
        bounding_box: el.rect.rounded(),
        computed_styles,
        css_classes: el.classes.clone(),
        element_description: build_element_description(doc, node),
        element_path: generate_element_path(doc, node),
        full_path: generate_full_path(doc, node),
        is_fixed: el.position() == "fixed",
        nearby_elements: nearby_elements(doc, node),
        nearby_text: nearby_text(doc, node),
    }
}
