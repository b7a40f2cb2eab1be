//! Resolving a document node into a stable reference plus a descriptive
//! snapshot, and resolving a drag rectangle into the elements beneath it.

pub mod intersection;
pub mod metadata;
pub mod selector;

pub use intersection::{elements_in_area, MAX_AREA_ELEMENTS};
pub use metadata::collect_metadata;
pub use selector::generate_selector;

use crate::dom::{Document, NodeId};
use crate::introspect;
use crate::models::geometry::Dimensions;
use crate::models::target::InspectedTarget;

/// Attribute marking engine-owned chrome (toolbar, popovers, markers).
/// Anything under a marked node never becomes a target.
pub const CHROME_MARKER: &str = "data-pagemark-ui";

/// Resolve a node to its selector and metadata snapshot.
pub fn identify(doc: &Document, node: NodeId) -> (String, crate::models::target::ElementMetadata) {
    (generate_selector(doc, node), collect_metadata(doc, node))
}

/// Build the full ephemeral target record for one element, including
/// optional component introspection. Introspection failure never blocks
/// the build; the component field is simply absent.
pub fn build_target(doc: &Document, node: NodeId) -> InspectedTarget {
    let el = doc.element(node);
    let (selector, metadata) = identify(doc, node);
    InspectedTarget {
        node: Some(node),
        tag_name: el.tag.clone(),
        class_name: el.class_name(),
        id: el.id.clone(),
        selector,
        rect: el.rect,
        dimensions: Dimensions::of(&el.rect),
        metadata,
        component: introspect::introspect(doc, node),
    }
}
