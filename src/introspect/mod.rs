//! Recovery of component names, props and boundaries from the host
//! framework's retained component graph.
//!
//! The graph shape is externally versioned and duck-typed, so every accessor
//! here degrades to `None`/empty instead of failing; component info is
//! optional enrichment and must never block annotation creation.

pub mod props;

use std::sync::Mutex;

use crate::dom::fiber::{
    FiberGraph, FiberId, FiberNode, FiberType, TAG_FORWARD_REF, TAG_HOST_COMPONENT,
    TAG_HOST_HOISTABLE, TAG_HOST_ROOT, TAG_HOST_TEXT, TAG_MEMO,
};
use crate::dom::{Document, NodeId};
use crate::models::component::{ComponentInfo, FrameworkDetection};
use crate::models::geometry::Rect;

pub use props::serialize_props;

/// Attachment key prefixes the host framework uses to tag rendered nodes.
const FIBER_KEY_PREFIXES: [&str; 3] = [
    "__reactFiber$",
    "__reactInternalInstance$",
    "__reactContainer$",
];

const MAX_WALK: usize = 50;
const MAX_TREE_DEPTH: usize = 20;
const MAX_BOUNDARY_NODES: usize = 100;
const MAX_DETECTION_SCAN: usize = 100;
const MAX_DEV_PROBE: usize = 10;

fn is_host_tag(tag: u32) -> bool {
    matches!(
        tag,
        TAG_HOST_ROOT | TAG_HOST_COMPONENT | TAG_HOST_TEXT | TAG_HOST_HOISTABLE
    )
}

/// The graph node attached to a DOM element, found by scanning the
/// element's attachment keys for the known prefixes.
pub fn fiber_for(doc: &Document, node: NodeId) -> Option<FiberId> {
    doc.attachments(node)
        .iter()
        .find(|(key, _)| FIBER_KEY_PREFIXES.iter().any(|p| key.starts_with(p)))
        .map(|(_, fiber)| *fiber)
}

fn is_component_fiber(fiber: &FiberNode) -> bool {
    matches!(fiber.fiber_type, FiberType::Component(_)) && !is_host_tag(fiber.tag)
}

/// Resolve a component fiber's display name, unwrapping the two common
/// wrapper shapes before falling back to the plain name.
fn resolve_component_name(fiber: &FiberNode) -> String {
    let FiberType::Component(component) = &fiber.fiber_type else {
        return "Anonymous".to_string();
    };

    // Forwarding wrappers name the wrapped render function.
    if fiber.tag == TAG_FORWARD_REF {
        if let Some(render) = &component.render {
            return render
                .display_name
                .clone()
                .or_else(|| render.name.clone())
                .unwrap_or_else(|| "ForwardRef".to_string());
        }
    }
    // Memoizing wrappers name the wrapped inner type.
    if fiber.tag == TAG_MEMO {
        if let Some(inner) = &component.inner {
            return inner
                .display_name
                .clone()
                .or_else(|| inner.name.clone())
                .unwrap_or_else(|| "Memo".to_string());
        }
    }

    component
        .display_name
        .clone()
        .or_else(|| component.name.clone())
        .unwrap_or_else(|| "Anonymous".to_string())
}

/// Nearest enclosing custom component, walking host fibers upward.
pub fn find_nearest_component(graph: &FiberGraph, fiber: FiberId) -> Option<(FiberId, String)> {
    let mut current = Some(fiber);
    let mut iterations = 0;

    while let Some(id) = current {
        if iterations >= MAX_WALK {
            break;
        }
        iterations += 1;
        let node = graph.get(id)?;
        if is_component_fiber(node) {
            return Some((id, resolve_component_name(node)));
        }
        current = node.parent;
    }
    None
}

/// Root-to-component breadcrumb, deduplicating consecutive repeats left by
/// wrapper fibers, capped at [`MAX_TREE_DEPTH`] entries.
pub fn component_tree_path(graph: &FiberGraph, fiber: FiberId) -> Vec<String> {
    let mut path: Vec<String> = Vec::new();
    let mut current = Some(fiber);
    let mut iterations = 0;

    while let Some(id) = current {
        if iterations >= MAX_WALK || path.len() >= MAX_TREE_DEPTH {
            break;
        }
        iterations += 1;
        let Some(node) = graph.get(id) else { break };
        if is_component_fiber(node) {
            let name = resolve_component_name(node);
            if path.last() != Some(&name) {
                path.push(name);
            }
        }
        current = node.parent;
    }

    path.reverse();
    path
}

/// Host DOM nodes rendered by a component, collected from its child/sibling
/// subtree without crossing into a nested component's subtree.
fn collect_host_nodes(graph: &FiberGraph, root: FiberId) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    let mut stack = vec![root];
    let mut visited = 0;

    while let Some(id) = stack.pop() {
        if visited >= MAX_BOUNDARY_NODES {
            break;
        }
        visited += 1;
        let Some(fiber) = graph.get(id) else { continue };

        if let (Some(state_node), FiberType::Host(_)) = (fiber.state_node, &fiber.fiber_type) {
            nodes.push(state_node);
        }

        if let Some(child) = fiber.child {
            let crosses_boundary = id != root && is_component_fiber(fiber);
            if !crosses_boundary {
                // Siblings first so the child pops first off the stack.
                let mut sibling = graph.get(child).and_then(|c| c.sibling);
                while let Some(s) = sibling {
                    stack.push(s);
                    sibling = graph.get(s).and_then(|n| n.sibling);
                }
                stack.push(child);
            }
        }
    }

    nodes
}

/// Union bounding box of everything the component rendered. Falls back to
/// the fiber's own state node, then to a zero rect.
pub fn component_boundary(doc: &Document, graph: &FiberGraph, fiber: FiberId) -> Rect {
    let nodes = collect_host_nodes(graph, fiber);
    if nodes.is_empty() {
        if let Some(state_node) = graph.get(fiber).and_then(|f| f.state_node) {
            return doc.element(state_node).rect;
        }
        return Rect::zero();
    }

    let mut boundary: Option<Rect> = None;
    for node in nodes {
        let rect = doc.element(node).rect;
        if rect.width == 0.0 && rect.height == 0.0 {
            continue;
        }
        boundary = Some(match boundary {
            Some(acc) => acc.union(&rect),
            None => rect,
        });
    }
    boundary.unwrap_or_else(Rect::zero)
}

/// A resolved name that looks mangled by a minifier.
pub fn is_minified_name(name: &str) -> bool {
    if name.is_empty() || name == "Anonymous" {
        return true;
    }
    if name.len() <= 2 && name.chars().all(|c| c.is_ascii_lowercase()) {
        return true;
    }
    name.len() == 1 && name.chars().all(|c| c.is_ascii_uppercase())
}

/// Full component info for the component nearest to a DOM node, or `None`
/// when the framework graph is unreachable from it.
pub fn introspect(doc: &Document, node: NodeId) -> Option<ComponentInfo> {
    let fiber = fiber_for(doc, node)?;
    let graph = doc.fibers();
    let (component_fiber, name) = find_nearest_component(graph, fiber)?;
    let component = graph.get(component_fiber)?;

    let display_name = match &component.fiber_type {
        FiberType::Component(c) => c.display_name.clone(),
        _ => None,
    };

    Some(ComponentInfo {
        is_minified: is_minified_name(&name),
        name,
        display_name,
        source: component.debug_source.clone(),
        props: serialize_props(&component.props),
        tree_path: component_tree_path(graph, component_fiber),
        boundary: component_boundary(doc, graph, component_fiber),
    })
}

// Detection is expensive and stable for the page's lifetime, so it is
// memoized process-wide; tests and SPA navigation reset it explicitly.
static DETECTION_CACHE: Mutex<Option<FrameworkDetection>> = Mutex::new(None);

fn detection_candidates(doc: &Document) -> Vec<NodeId> {
    let mut candidates: Vec<NodeId> = ["root", "__next"]
        .iter()
        .filter_map(|id| doc.element_by_id(id))
        .collect();
    if let Some(marked) = doc
        .descendants(doc.document_element())
        .find(|n| doc.element(*n).attribute("data-reactroot").is_some())
    {
        candidates.push(marked);
    }
    if candidates.is_empty() {
        // No well-known roots; probe the first elements carrying a fiber.
        for node in doc.descendants(doc.document_element()).take(MAX_DETECTION_SCAN) {
            if fiber_for(doc, node).is_some() {
                candidates.push(node);
                break;
            }
        }
    }
    candidates
}

fn probe_dev_mode(doc: &Document, candidates: &[NodeId]) -> bool {
    let graph = doc.fibers();
    for node in candidates {
        let Some(fiber) = fiber_for(doc, *node) else {
            continue;
        };
        let mut current = Some(fiber);
        for _ in 0..MAX_DEV_PROBE {
            let Some(id) = current else { break };
            let Some(f) = graph.get(id) else { break };
            if f.debug_source.is_some() {
                return true;
            }
            current = f.child.or(f.parent);
        }
    }
    false
}

/// Detect the host framework's presence, version and dev/prod mode.
/// Memoized for the page's lifetime; see [`reset_detection_cache`].
pub fn detect_framework(doc: &Document) -> FrameworkDetection {
    if let Some(cached) = DETECTION_CACHE.lock().unwrap().clone() {
        return cached;
    }

    let detection = compute_detection(doc);
    *DETECTION_CACHE.lock().unwrap() = Some(detection.clone());
    detection
}

fn compute_detection(doc: &Document) -> FrameworkDetection {
    // The devtools hook is the most reliable signal and carries a version.
    if let Some(hook) = doc.devtools_hook() {
        if !hook.renderer_versions.is_empty() {
            let version = hook.renderer_versions.first().cloned().flatten();
            let candidates = detection_candidates(doc);
            return FrameworkDetection {
                detected: true,
                version,
                is_dev: Some(probe_dev_mode(doc, &candidates)),
            };
        }
    }

    // Fallback: any reachable fiber attachment counts as detection.
    let candidates = detection_candidates(doc);
    if candidates.iter().any(|n| fiber_for(doc, *n).is_some()) {
        return FrameworkDetection {
            detected: true,
            version: None,
            is_dev: Some(probe_dev_mode(doc, &candidates)),
        };
    }

    FrameworkDetection::default()
}

/// Drop the memoized detection (test teardown, SPA navigation).
pub fn reset_detection_cache() {
    *DETECTION_CACHE.lock().unwrap() = None;
}
