use crate::dom::{Document, NodeId};
use crate::inspect::CHROME_MARKER;
use crate::models::geometry::{rects_intersect, Rect};

/// Tags that never participate in area selection.
const EXCLUDED_TAGS: [&str; 7] = ["script", "style", "link", "meta", "noscript", "head", "html"];

/// Maximum elements an area resolution returns.
pub const MAX_AREA_ELEMENTS: usize = 50;

fn is_excluded(doc: &Document, node: NodeId, exclude_roots: &[NodeId]) -> bool {
    let el = doc.element(node);
    if EXCLUDED_TAGS.contains(&el.tag.as_str()) {
        return true;
    }
    if doc.closest_attribute(node, CHROME_MARKER).is_some() {
        return true;
    }
    if exclude_roots.iter().any(|root| doc.contains(*root, node)) {
        return true;
    }
    if el.is_hidden() {
        return true;
    }
    // Out-of-flow elements are hidden unless fixed or sticky positioned.
    if !el.in_layout_flow && el.position() != "fixed" && el.position() != "sticky" {
        return true;
    }
    false
}

/// All visible elements intersecting `area`, reduced to leaves: an element
/// is dropped when another result lives inside it. Capped at
/// [`MAX_AREA_ELEMENTS`], with the traversal itself cut off at twice the cap
/// to bound the cost on huge pages.
pub fn elements_in_area(doc: &Document, area: &Rect, exclude_roots: &[NodeId]) -> Vec<NodeId> {
    let mut hits: Vec<NodeId> = Vec::new();

    // Excluding a node prunes its whole subtree, matching rejection
    // semantics of a filtered tree walk.
    let mut stack: Vec<NodeId> = doc
        .children(doc.body())
        .iter()
        .rev()
        .copied()
        .collect();

    while let Some(node) = stack.pop() {
        if is_excluded(doc, node, exclude_roots) {
            continue;
        }

        let rect = doc.element(node).rect;
        if !rect.is_empty() && rects_intersect(&rect, area) {
            hits.push(node);
        }

        if hits.len() >= MAX_AREA_ELEMENTS * 2 {
            break;
        }

        for child in doc.children(node).iter().rev() {
            stack.push(*child);
        }
    }

    let mut leaves = filter_to_leaves(doc, hits);
    leaves.truncate(MAX_AREA_ELEMENTS);
    leaves
}

/// Drop every hit that is an ancestor of another hit.
fn filter_to_leaves(doc: &Document, hits: Vec<NodeId>) -> Vec<NodeId> {
    hits.iter()
        .copied()
        .filter(|el| {
            !hits
                .iter()
                .any(|other| other != el && doc.contains(*el, *other))
        })
        .collect()
}
