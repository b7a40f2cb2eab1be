//! Mirror of the host framework's retained component graph.
//!
//! The shape is duck-typed against an externally-versioned internal
//! structure, so every field an accessor might want is optional. Walking
//! logic lives in the `introspect` module; this file only holds the arena.

use serde_json::Value;

use crate::dom::NodeId;
use crate::models::component::DebugSource;

// Work tags the introspector cares about. Values match the host
// framework's internal numbering.
pub const TAG_FUNCTION_COMPONENT: u32 = 0;
pub const TAG_HOST_ROOT: u32 = 3;
pub const TAG_HOST_COMPONENT: u32 = 5;
pub const TAG_HOST_TEXT: u32 = 6;
pub const TAG_FORWARD_REF: u32 = 11;
pub const TAG_MEMO: u32 = 15;
pub const TAG_HOST_HOISTABLE: u32 = 27;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FiberId(u32);

/// A function the framework can render: its `name`/`displayName` pair.
#[derive(Debug, Clone, Default)]
pub struct NamedFunction {
    pub name: Option<String>,
    pub display_name: Option<String>,
}

impl NamedFunction {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            display_name: None,
        }
    }
}

/// The `type` of a component fiber. Wrapper shapes keep a reference to what
/// they wrap: forwarding wrappers carry `render`, memoizing wrappers carry
/// `inner`.
#[derive(Debug, Clone, Default)]
pub struct ComponentType {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub render: Option<NamedFunction>,
    pub inner: Option<Box<ComponentType>>,
}

impl ComponentType {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = Some(display_name.to_string());
        self
    }
}

#[derive(Debug, Clone)]
pub enum FiberType {
    /// Literal DOM tag, e.g. `div`.
    Host(String),
    /// Custom component definition.
    Component(ComponentType),
    /// Anything whose shape we do not recognize.
    Opaque,
}

#[derive(Debug, Clone)]
pub struct FiberNode {
    pub tag: u32,
    pub fiber_type: FiberType,
    /// Rendered props as the framework holds them; `Value::Null` when absent.
    pub props: Value,
    pub debug_source: Option<DebugSource>,
    /// The `return` pointer, i.e. the parent in the retained tree.
    pub parent: Option<FiberId>,
    pub child: Option<FiberId>,
    pub sibling: Option<FiberId>,
    /// DOM node this fiber rendered, for host fibers.
    pub state_node: Option<NodeId>,
}

impl FiberNode {
    pub fn host(tag: &str, state_node: NodeId) -> Self {
        Self {
            tag: TAG_HOST_COMPONENT,
            fiber_type: FiberType::Host(tag.to_string()),
            props: Value::Null,
            debug_source: None,
            parent: None,
            child: None,
            sibling: None,
            state_node: Some(state_node),
        }
    }

    pub fn component(component_type: ComponentType) -> Self {
        Self {
            tag: TAG_FUNCTION_COMPONENT,
            fiber_type: FiberType::Component(component_type),
            props: Value::Null,
            debug_source: None,
            parent: None,
            child: None,
            sibling: None,
            state_node: None,
        }
    }

    pub fn with_tag(mut self, tag: u32) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_props(mut self, props: Value) -> Self {
        self.props = props;
        self
    }

    pub fn with_debug_source(mut self, file_name: &str, line_number: u32) -> Self {
        self.debug_source = Some(DebugSource {
            file_name: file_name.to_string(),
            line_number,
        });
        self
    }
}

#[derive(Debug, Default)]
pub struct FiberGraph {
    nodes: Vec<FiberNode>,
}

impl FiberGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: FiberNode) -> FiberId {
        let id = FiberId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: FiberId) -> Option<&FiberNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut FiberNode> {
        self.nodes.get_mut(id.0 as usize)
    }

    /// Wire `child` as the last child of `parent`, maintaining the
    /// child/sibling chain and the return pointer.
    pub fn link_child(&mut self, parent: FiberId, child: FiberId) {
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        match self.nodes[parent.0 as usize].child {
            None => self.nodes[parent.0 as usize].child = Some(child),
            Some(first) => {
                let mut current = first;
                while let Some(next) = self.nodes[current.0 as usize].sibling {
                    current = next;
                }
                self.nodes[current.0 as usize].sibling = Some(child);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
