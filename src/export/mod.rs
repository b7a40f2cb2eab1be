//! Markdown renderings of the annotation collection, used by the chrome's
//! copy-all action. `detailed` is the light default; `debug` adds the
//! environment block, full DOM paths and computed styles.

use chrono::Utc;

use crate::models::annotation::Annotation;
use crate::models::page::PageContext;

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

fn format_styles(styles: &std::collections::BTreeMap<String, String>) -> String {
    styles
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}: {}", camel_to_kebab(k), v))
        .collect::<Vec<_>>()
        .join("; ")
}

fn heading_for(item: &Annotation) -> String {
    let description = item
        .element
        .as_ref()
        .map(|e| e.metadata.element_description.clone())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| item.selector.clone());
    format!("### {}. {}", item.step_number, description)
}

/// Lighter rendering: viewport, per-annotation location and position.
pub fn format_detailed(items: &[Annotation], page: &PageContext) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("## Page Feedback: {}", page.pathname));
    lines.push(format!(
        "**Viewport:** {}×{}",
        page.viewport.width, page.viewport.height
    ));

    for item in items {
        let metadata = item.element.as_ref().map(|e| &e.metadata);
        lines.push(String::new());
        lines.push(heading_for(item));

        if let Some(m) = metadata {
            if !m.element_path.is_empty() {
                lines.push(format!("**Location:** {}", m.element_path));
            }
            let bb = m.bounding_box;
            lines.push(format!(
                "**Position:** {}px, {}px ({}×{}px)",
                bb.x, bb.y, bb.width, bb.height
            ));
        }

        lines.push(format!("**Feedback:** {}", item.content));
    }

    lines.join("\n")
}

/// Rich rendering with the environment block and per-annotation detail.
pub fn format_debug(items: &[Annotation], page: &PageContext) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("## Page Feedback: {}", page.pathname));
    lines.push(String::new());
    lines.push("**Environment:**".to_string());
    lines.push(format!(
        "- Viewport: {}×{}",
        page.viewport.width, page.viewport.height
    ));
    lines.push(format!("- URL: {}", page.url));
    lines.push(format!("- User Agent: {}", page.user_agent));
    lines.push(format!("- Timestamp: {}", Utc::now().to_rfc3339()));
    lines.push(format!("- Device Pixel Ratio: {}", page.device_pixel_ratio));
    lines.push(String::new());
    lines.push("---".to_string());

    for item in items {
        let metadata = item.element.as_ref().map(|e| &e.metadata);
        lines.push(String::new());
        lines.push(heading_for(item));

        if let Some(m) = metadata {
            if !m.full_path.is_empty() {
                lines.push(format!("**Full DOM Path:** {}", m.full_path));
            }
            let bb = m.bounding_box;
            lines.push(format!(
                "**Position:** x:{}, y:{} ({}×{}px)",
                bb.x, bb.y, bb.width, bb.height
            ));
            if bb.width > 0.0 {
                let pct_left = (item.offset_x / bb.width) * 100.0;
                let px_from_top = (bb.y + item.offset_y).round();
                lines.push(format!(
                    "**Annotation at:** {pct_left:.1}% from left, {px_from_top}px from top"
                ));
            }
            let styles = format_styles(&m.computed_styles);
            if !styles.is_empty() {
                lines.push(format!("**Computed Styles:** {styles}"));
            }
            if !m.nearby_elements.is_empty() {
                lines.push(format!("**Nearby Elements:** {}", m.nearby_elements));
            }
        }

        lines.push(format!("**Feedback:** {}", item.content));
    }

    lines.join("\n")
}
