//! Retained model of the host page.
//!
//! The engine never owns a browser: the embedding host mirrors the live DOM
//! into a `Document` (an element arena plus the framework's attached
//! component graph) and keeps it updated as the page mutates. Everything in
//! the engine reads this model through the same narrow operations a page
//! script would use: point hit-testing, selector resolution, tree walks and
//! connectivity checks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::geometry::Rect;

pub mod fiber;

pub use fiber::{ComponentType, FiberGraph, FiberId, FiberNode, FiberType, NamedFunction};

/// Stable handle into the document's element arena. A held id is a weak
/// back-reference: the element may have been disconnected since, so readers
/// re-validate with [`Document::is_connected`] before trusting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

/// One element mirrored from the page.
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub id: String,
    pub classes: Vec<String>,
    pub attributes: HashMap<String, String>,
    /// Direct text content of this element (not the subtree).
    pub text: String,
    /// Computed styles, kebab-case property names.
    pub styles: HashMap<String, String>,
    /// Bounding box in viewport coordinates.
    pub rect: Rect,
    /// Whether the element participates in layout (the `offsetParent`
    /// analogue). Fixed/sticky elements report `false` here but are still
    /// selectable.
    pub in_layout_flow: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    connected: bool,
}

impl Element {
    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles.get(property).map(String::as_str)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn class_name(&self) -> String {
        self.classes.join(" ")
    }

    pub fn is_hidden(&self) -> bool {
        self.style("display") == Some("none") || self.style("visibility") == Some("hidden")
    }

    pub fn position(&self) -> &str {
        self.style("position").unwrap_or("static")
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Declarative element description used when the host mirrors a node.
#[derive(Debug, Clone, Default)]
pub struct ElementSpec {
    tag: String,
    id: String,
    classes: Vec<String>,
    attributes: HashMap<String, String>,
    text: String,
    styles: HashMap<String, String>,
    rect: Rect,
    in_layout_flow: bool,
}

impl ElementSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            in_layout_flow: true,
            ..Default::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    /// Space-separated class list, like a `class` attribute value.
    pub fn classes(mut self, classes: &str) -> Self {
        self.classes = classes.split_whitespace().map(str::to_string).collect();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn style(mut self, property: &str, value: &str) -> Self {
        self.styles.insert(property.to_string(), value.to_string());
        self
    }

    pub fn rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn out_of_flow(mut self) -> Self {
        self.in_layout_flow = false;
        self
    }
}

/// Renderer registration exposed by the framework's devtools hook, when the
/// page carries one.
#[derive(Debug, Clone, Default)]
pub struct DevtoolsHook {
    pub renderer_versions: Vec<Option<String>>,
}

pub struct Document {
    nodes: Vec<Element>,
    root: NodeId,
    body: NodeId,
    fibers: FiberGraph,
    attachments: HashMap<NodeId, Vec<(String, FiberId)>>,
    devtools: Option<DevtoolsHook>,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            body: NodeId(0),
            fibers: FiberGraph::new(),
            attachments: HashMap::new(),
            devtools: None,
            scroll_x: 0.0,
            scroll_y: 0.0,
        };
        let root = doc.push(ElementSpec::new("html"), None);
        let body = doc.push(ElementSpec::new("body"), Some(root));
        doc.nodes[root.0 as usize].children.push(body);
        doc.root = root;
        doc.body = body;
        doc
    }

    pub fn document_element(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn push(&mut self, spec: ElementSpec, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Element {
            tag: spec.tag,
            id: spec.id,
            classes: spec.classes,
            attributes: spec.attributes,
            text: spec.text,
            styles: spec.styles,
            rect: spec.rect,
            in_layout_flow: spec.in_layout_flow,
            parent,
            children: Vec::new(),
            connected: true,
        });
        id
    }

    /// Mirror a new element as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, spec: ElementSpec) -> NodeId {
        let id = self.push(spec, Some(parent));
        self.nodes[parent.0 as usize].children.push(id);
        id
    }

    /// Detach an element (and its whole subtree) from the document. The
    /// arena slot survives so stale `NodeId`s stay resolvable as
    /// disconnected rather than dangling.
    pub fn remove(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0 as usize].parent {
            self.nodes[parent.0 as usize].children.retain(|c| *c != node);
        }
        self.nodes[node.0 as usize].parent = None;
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            self.nodes[current.0 as usize].connected = false;
            stack.extend(self.nodes[current.0 as usize].children.iter().copied());
        }
    }

    pub fn element(&self, id: NodeId) -> &Element {
        &self.nodes[id.0 as usize]
    }

    pub fn element_mut(&mut self, id: NodeId) -> &mut Element {
        &mut self.nodes[id.0 as usize]
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.nodes[id.0 as usize].connected
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0 as usize].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0 as usize].children
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|s| *s == id)?;
        if index == 0 {
            None
        } else {
            Some(siblings[index - 1])
        }
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|s| *s == id)?;
        siblings.get(index + 1).copied()
    }

    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Nearest ancestor-or-self carrying `attribute`, with its value.
    pub fn closest_attribute(&self, node: NodeId, attribute: &str) -> Option<(NodeId, String)> {
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(value) = self.element(id).attribute(attribute) {
                return Some((id, value.to_string()));
            }
            current = self.parent(id);
        }
        None
    }

    /// Concatenated text of the element and its subtree, in document order.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut parts = Vec::new();
        for id in self.descendants(node) {
            let text = self.element(id).text.trim();
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
        parts.join(" ")
    }

    /// Depth-first pre-order walk of `root` and its subtree, document order.
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: vec![root],
        }
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .find(|n| self.is_connected(*n) && self.element(*n).id == id)
    }

    /// Deepest visible element whose box contains the point. Later siblings
    /// win ties, matching paint order.
    pub fn element_from_point(&self, x: f64, y: f64) -> Option<NodeId> {
        let mut best: Option<(usize, NodeId)> = None;
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let el = self.element(id);
            if el.is_hidden() {
                continue;
            }
            if el.rect.contains_point(x, y) {
                match best {
                    Some((best_depth, _)) if depth < best_depth => {}
                    _ => best = Some((depth, id)),
                }
            }
            // Children may overflow the parent box, so always descend.
            for child in el.children.iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Resolve a selector of the grammar the engine generates (`#id` and
    /// `tag:nth-of-type(k)` joined by `>`). Unknown syntax resolves to
    /// `None`, never an error.
    pub fn query_selector(&self, selector: &str) -> Option<NodeId> {
        let segments = parse_selector(selector)?;
        if segments.is_empty() {
            return None;
        }
        self.descendants(self.root)
            .filter(|n| self.is_connected(*n))
            .find(|n| self.matches_chain(*n, &segments))
    }

    fn matches_chain(&self, node: NodeId, segments: &[Segment]) -> bool {
        let mut current = node;
        for (i, segment) in segments.iter().rev().enumerate() {
            if !self.matches_segment(current, segment) {
                return false;
            }
            if i + 1 < segments.len() {
                match self.parent(current) {
                    Some(parent) => current = parent,
                    None => return false,
                }
            }
        }
        true
    }

    fn matches_segment(&self, node: NodeId, segment: &Segment) -> bool {
        let el = self.element(node);
        if let Some(id) = &segment.id {
            if &el.id != id {
                return false;
            }
        }
        if let Some(tag) = &segment.tag {
            if &el.tag != tag {
                return false;
            }
        }
        if let Some(k) = segment.nth_of_type {
            let Some(parent) = self.parent(node) else {
                return k == 1;
            };
            let position = self
                .children(parent)
                .iter()
                .filter(|s| self.element(**s).tag == el.tag)
                .position(|s| *s == node);
            match position {
                Some(index) => index + 1 == k,
                None => false,
            }
        } else {
            true
        }
    }

    // --- framework attachments -------------------------------------------

    /// Attach a component-graph node under an implementation-specific key,
    /// the way the host framework tags its rendered DOM nodes.
    pub fn attach_fiber(&mut self, node: NodeId, key: &str, fiber: FiberId) {
        self.attachments
            .entry(node)
            .or_default()
            .push((key.to_string(), fiber));
    }

    pub fn attachments(&self, node: NodeId) -> &[(String, FiberId)] {
        self.attachments.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fibers(&self) -> &FiberGraph {
        &self.fibers
    }

    pub fn fibers_mut(&mut self) -> &mut FiberGraph {
        &mut self.fibers
    }

    pub fn set_devtools_hook(&mut self, hook: DevtoolsHook) {
        self.devtools = Some(hook);
    }

    pub fn devtools_hook(&self) -> Option<&DevtoolsHook> {
        self.devtools.as_ref()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        for child in self.doc.element(id).children.iter().rev() {
            self.stack.push(*child);
        }
        Some(id)
    }
}

#[derive(Debug, Default)]
struct Segment {
    id: Option<String>,
    tag: Option<String>,
    nth_of_type: Option<usize>,
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_selector(selector: &str) -> Option<Vec<Segment>> {
    let selector = selector.trim();
    if selector.is_empty() {
        return None;
    }
    let mut segments = Vec::new();
    for raw in selector.split('>') {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Some(id) = raw.strip_prefix('#') {
            if id.is_empty() {
                return None;
            }
            segments.push(Segment {
                id: Some(unescape(id)),
                ..Default::default()
            });
            continue;
        }
        let (tag_part, nth) = match raw.split_once(':') {
            Some((tag, pseudo)) => {
                let inner = pseudo
                    .strip_prefix("nth-of-type(")
                    .and_then(|rest| rest.strip_suffix(')'))?;
                let k: usize = inner.trim().parse().ok()?;
                (tag, Some(k))
            }
            None => (raw, None),
        };
        if tag_part.is_empty()
            || !tag_part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return None;
        }
        segments.push(Segment {
            tag: Some(tag_part.to_ascii_lowercase()),
            nth_of_type: nth,
            ..Default::default()
        });
    }
    Some(segments)
}
