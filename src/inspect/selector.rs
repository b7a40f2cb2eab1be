use crate::dom::{Document, NodeId};

/// Escape a value for use inside a CSS selector (ids, classes).
pub fn css_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

/// Generate a unique selector for an element by walking up the tree.
///
/// An element with an id resolves to `#id` directly. Otherwise each level
/// contributes `tag[:nth-of-type(k)]`, with the disambiguator added only
/// when same-tag siblings exist; the walk stops early at the first
/// ancestor with an id.
pub fn generate_selector(doc: &Document, node: NodeId) -> String {
    let el = doc.element(node);
    if !el.id.is_empty() {
        return format!("#{}", css_escape(&el.id));
    }

    let body = doc.body();
    let root = doc.document_element();
    let mut parts: Vec<String> = Vec::new();
    let mut current = Some(node);

    while let Some(id) = current {
        if id == body || id == root {
            break;
        }
        let el = doc.element(id);
        let mut part = el.tag.clone();

        if !el.id.is_empty() {
            parts.insert(0, format!("#{}", css_escape(&el.id)));
            break;
        }

        if let Some(parent) = doc.parent(id) {
            let same_tag: Vec<NodeId> = doc
                .children(parent)
                .iter()
                .copied()
                .filter(|s| doc.element(*s).tag == el.tag)
                .collect();
            if same_tag.len() > 1 {
                let index = same_tag.iter().position(|s| *s == id).unwrap_or(0) + 1;
                part.push_str(&format!(":nth-of-type({index})"));
            }
        }

        parts.insert(0, part);
        current = doc.parent(id);
    }

    parts.join(" > ")
}

/// Short class-based path, e.g. `.main-content > .article > p`.
pub fn generate_element_path(doc: &Document, node: NodeId) -> String {
    let body = doc.body();
    let root = doc.document_element();
    let mut parts: Vec<String> = Vec::new();
    let mut current = Some(node);

    while let Some(id) = current {
        if id == body || id == root {
            break;
        }
        let el = doc.element(id);
        let part = if el.classes.is_empty() {
            el.tag.clone()
        } else {
            let escaped: Vec<String> = el.classes.iter().map(|c| css_escape(c)).collect();
            format!(".{}", escaped.join("."))
        };
        parts.insert(0, part);
        if !el.id.is_empty() {
            parts[0] = format!("#{}", css_escape(&el.id));
            break;
        }
        current = doc.parent(id);
    }

    parts.join(" > ")
}

/// Full tag+class path from below the document element down to the node,
/// e.g. `body > main.main-content > p`.
pub fn generate_full_path(doc: &Document, node: NodeId) -> String {
    let root = doc.document_element();
    let mut parts: Vec<String> = Vec::new();
    let mut current = Some(node);

    while let Some(id) = current {
        if id == root {
            break;
        }
        let el = doc.element(id);
        let id_suffix = if el.id.is_empty() {
            String::new()
        } else {
            format!("#{}", css_escape(&el.id))
        };
        let class_suffix = if el.classes.is_empty() {
            String::new()
        } else {
            let escaped: Vec<String> = el.classes.iter().map(|c| css_escape(c)).collect();
            format!(".{}", escaped.join("."))
        };
        parts.insert(0, format!("{}{}{}", el.tag, id_suffix, class_suffix));
        current = doc.parent(id);
    }

    parts.join(" > ")
}
