//! Turns raw pointer input into resolved intents: a single click, a
//! completed drag selection, or a hover update.
//!
//! The host forwards pointer events as they arrive and ticks `on_frame`
//! from its animation-frame loop; hover recomputation is throttled to one
//! update per frame (cancel-and-reschedule, so at most one recompute is ever
//! pending) and drag-area element recomputation runs at half frame rate.

use crate::dom::{Document, NodeId};
use crate::inspect::{self, CHROME_MARKER};
use crate::models::geometry::{normalize_area, Rect};
use crate::models::target::InspectedTarget;

/// Movement below this distance on release still counts as a click.
pub const DRAG_THRESHOLD_PX: f64 = 4.0;
/// Completed drags with both dimensions under this are discarded.
pub const MIN_AREA_SIZE_PX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Move,
    Down,
    Up,
    /// Pointer left the window entirely.
    Leave,
}

/// One raw pointer event from the host.
#[derive(Debug, Clone, Copy)]
pub struct PointerInput {
    pub action: PointerAction,
    pub x: f64,
    pub y: f64,
    /// The element the event actually originated on, before any event
    /// retargeting across shadow boundaries. Used for chrome exclusion.
    pub origin: Option<NodeId>,
}

impl PointerInput {
    pub fn new(action: PointerAction, x: f64, y: f64) -> Self {
        Self {
            action,
            x,
            y,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: NodeId) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// A resolved interaction, handed to the surrounding chrome.
#[derive(Debug, Clone)]
pub enum PointerIntent {
    Click {
        element: InspectedTarget,
        click_x: f64,
        click_y: f64,
    },
    Area {
        area: Rect,
        elements: Vec<InspectedTarget>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SessionState {
    Idle,
    Hovering,
    Pressing { start_x: f64, start_y: f64 },
    Dragging { start_x: f64, start_y: f64 },
}

pub struct PointerSession {
    state: SessionState,
    hovered: Option<InspectedTarget>,
    /// Latest unprocessed hover position; overwritten on every move so only
    /// one recompute is ever pending.
    pending_hover: Option<(f64, f64)>,
    drag_area: Option<Rect>,
    drag_elements: Vec<NodeId>,
    /// Drag element recomputation runs every second frame.
    frame_parity: bool,
    exclude_roots: Vec<NodeId>,
}

impl PointerSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            hovered: None,
            pending_hover: None,
            drag_area: None,
            drag_elements: Vec::new(),
            frame_parity: false,
            exclude_roots: Vec::new(),
        }
    }

    /// Register a chrome root (e.g. the toolbar) that can never become a
    /// target or drag origin.
    pub fn add_exclusion(&mut self, root: NodeId) {
        if !self.exclude_roots.contains(&root) {
            self.exclude_roots.push(root);
        }
    }

    pub fn exclusions(&self) -> &[NodeId] {
        &self.exclude_roots
    }

    pub fn is_active(&self) -> bool {
        self.state != SessionState::Idle
    }

    pub fn set_active(&mut self, active: bool) {
        if active && self.state == SessionState::Idle {
            self.state = SessionState::Hovering;
        } else if !active {
            self.state = SessionState::Idle;
            self.reset_transients();
        }
    }

    fn reset_transients(&mut self) {
        self.hovered = None;
        self.pending_hover = None;
        self.drag_area = None;
        self.drag_elements.clear();
    }

    pub fn hovered(&self) -> Option<&InspectedTarget> {
        self.hovered.as_ref()
    }

    /// Live selection rectangle while a drag is in progress.
    pub fn drag_area(&self) -> Option<Rect> {
        self.drag_area
    }

    pub fn drag_elements(&self) -> &[NodeId] {
        &self.drag_elements
    }

    fn is_chrome(&self, doc: &Document, node: NodeId) -> bool {
        doc.closest_attribute(node, CHROME_MARKER).is_some()
            || self
                .exclude_roots
                .iter()
                .any(|root| doc.contains(*root, node))
    }

    /// Element under the pointer that is a legitimate inspection target:
    /// not chrome, not the page shell.
    fn target_at(&self, doc: &Document, x: f64, y: f64) -> Option<NodeId> {
        let node = doc.element_from_point(x, y)?;
        if node == doc.document_element() || node == doc.body() {
            return None;
        }
        if self.is_chrome(doc, node) {
            return None;
        }
        Some(node)
    }

    /// Feed one pointer event. Returns a resolved intent when the event
    /// completes an interaction.
    pub fn handle_input(&mut self, doc: &Document, input: PointerInput) -> Option<PointerIntent> {
        if self.state == SessionState::Idle {
            return None;
        }

        match input.action {
            PointerAction::Move => {
                match self.state {
                    SessionState::Hovering => {
                        self.pending_hover = Some((input.x, input.y));
                    }
                    SessionState::Pressing { start_x, start_y } => {
                        let dx = input.x - start_x;
                        let dy = input.y - start_y;
                        if (dx * dx + dy * dy).sqrt() > DRAG_THRESHOLD_PX {
                            // Hover is suppressed for the rest of the drag.
                            self.hovered = None;
                            self.pending_hover = None;
                            self.state = SessionState::Dragging { start_x, start_y };
                            self.drag_area =
                                Some(normalize_area(start_x, start_y, input.x, input.y));
                        }
                    }
                    SessionState::Dragging { start_x, start_y } => {
                        self.drag_area = Some(normalize_area(start_x, start_y, input.x, input.y));
                    }
                    SessionState::Idle => {}
                }
                None
            }
            PointerAction::Down => {
                // Chrome can never be a drag origin.
                if let Some(origin) = input.origin {
                    if self.is_chrome(doc, origin) {
                        return None;
                    }
                }
                if self.state == SessionState::Hovering {
                    self.state = SessionState::Pressing {
                        start_x: input.x,
                        start_y: input.y,
                    };
                }
                None
            }
            PointerAction::Up => match self.state {
                SessionState::Pressing { .. } => {
                    self.state = SessionState::Hovering;
                    let node = self.target_at(doc, input.x, input.y)?;
                    Some(PointerIntent::Click {
                        element: inspect::build_target(doc, node),
                        click_x: input.x,
                        click_y: input.y,
                    })
                }
                SessionState::Dragging { start_x, start_y } => {
                    self.state = SessionState::Hovering;
                    self.drag_elements.clear();
                    let area = normalize_area(start_x, start_y, input.x, input.y);
                    self.drag_area = None;
                    if area.width < MIN_AREA_SIZE_PX && area.height < MIN_AREA_SIZE_PX {
                        return None;
                    }
                    let elements =
                        inspect::elements_in_area(doc, &area, &self.exclude_roots)
                            .into_iter()
                            .map(|node| inspect::build_target(doc, node))
                            .collect();
                    Some(PointerIntent::Area { area, elements })
                }
                _ => None,
            },
            PointerAction::Leave => {
                // Leaving the window discards an in-progress drag outright.
                if matches!(self.state, SessionState::Dragging { .. })
                    || matches!(self.state, SessionState::Pressing { .. })
                {
                    self.state = SessionState::Hovering;
                }
                self.reset_transients();
                None
            }
        }
    }

    /// Animation-frame tick. Returns `true` when the hover target or the
    /// drag element set changed and the chrome should repaint.
    pub fn on_frame(&mut self, doc: &Document) -> bool {
        let mut changed = false;

        if let Some((x, y)) = self.pending_hover.take() {
            if self.state == SessionState::Hovering {
                let next = self.target_at(doc, x, y).map(|n| inspect::build_target(doc, n));
                if next.as_ref().map(|t| t.node) != self.hovered.as_ref().map(|t| t.node) {
                    changed = true;
                }
                self.hovered = next;
            }
        }

        if let SessionState::Dragging { .. } = self.state {
            self.frame_parity = !self.frame_parity;
            if self.frame_parity {
                if let Some(area) = self.drag_area {
                    let elements = inspect::elements_in_area(doc, &area, &self.exclude_roots);
                    if elements != self.drag_elements {
                        self.drag_elements = elements;
                        changed = true;
                    }
                }
            }
        }

        changed
    }
}

impl Default for PointerSession {
    fn default() -> Self {
        Self::new()
    }
}
