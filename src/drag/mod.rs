use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::document::{Node, NodeId, NodeRole, PLACEHOLDER_CLASS, VisualTree};

pub const DRAGGING_CLASS: &str = "dragging";
pub const DRAG_OVER_CLASS: &str = "drag-over";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalSpan {
    pub top: f32,
    pub height: f32,
}

impl VerticalSpan {
    pub fn new(top: f32, height: f32) -> Self {
        Self { top, height }
    }

    pub fn midpoint(self) -> f32 {
        self.top + self.height / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionPoint {
    pub anchor: NodeId,
    pub position: InsertPosition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub dragged: NodeId,
    pub source_container: NodeId,
    pub container_role: NodeRole,
    pub target_container: Option<NodeId>,
    pub marker: Option<InsertionPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Dragging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragIgnored {
    NotBound,
    NoContainer,
    AlreadyDragging,
    NoSession,
    StaleNode,
    CrossContainer,
    NoTarget,
    NoInsertionPoint,
    Cancelled,
    Abandoned,
}

impl DragIgnored {
    pub fn label(self) -> &'static str {
        match self {
            Self::NotBound => "not_bound",
            Self::NoContainer => "no_container",
            Self::AlreadyDragging => "already_dragging",
            Self::NoSession => "no_session",
            Self::StaleNode => "stale_node",
            Self::CrossContainer => "cross_container",
            Self::NoTarget => "no_target",
            Self::NoInsertionPoint => "no_insertion_point",
            Self::Cancelled => "cancelled",
            Self::Abandoned => "abandoned",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { source_container: NodeId },
    Ignored(DragIgnored),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverOutcome {
    Marked(InsertionPoint),
    Unchanged,
    Ignored(DragIgnored),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Committed { from: usize, to: usize },
    Discarded(DragIgnored),
}

#[derive(Debug, Clone, Default)]
pub struct DragController {
    bindings: BTreeSet<NodeId>,
    bind_passes: u64,
    session: Option<DragSession>,
    placeholder: Option<NodeId>,
    highlighted: Option<NodeId>,
}

impl DragController {
    pub fn phase(&self) -> DragPhase {
        if self.session.is_some() {
            DragPhase::Dragging
        } else {
            DragPhase::Idle
        }
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn placeholder(&self) -> Option<NodeId> {
        self.placeholder
    }

    pub fn is_bound(&self, node: NodeId) -> bool {
        self.bindings.contains(&node)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn bind_passes(&self) -> u64 {
        self.bind_passes
    }

    pub fn rebind(&mut self, tree: &mut VisualTree) -> usize {
        if let Some(session) = &self.session {
            debug!(
                node = session.dragged.get(),
                reason = DragIgnored::Abandoned.label(),
                "in-flight drag abandoned"
            );
            self.finish(tree);
        }

        self.bindings.clear();
        self.bindings.extend(tree.draggable_nodes());
        self.bind_passes += 1;
        debug!(
            bindings = self.bindings.len(),
            pass = self.bind_passes,
            "rebound drag handlers"
        );
        self.bindings.len()
    }

    pub fn start(&mut self, tree: &mut VisualTree, node: NodeId) -> StartOutcome {
        if self.session.is_some() {
            return StartOutcome::Ignored(DragIgnored::AlreadyDragging);
        }
        if !tree.contains(node) {
            return StartOutcome::Ignored(DragIgnored::StaleNode);
        }
        if !self.bindings.contains(&node) {
            debug!(node = node.get(), "drag start on unbound node ignored");
            return StartOutcome::Ignored(DragIgnored::NotBound);
        }

        let Some(source_container) = nearest_container(tree, node) else {
            return StartOutcome::Ignored(DragIgnored::NoContainer);
        };
        let Some(container_role) = tree.role_of(source_container) else {
            return StartOutcome::Ignored(DragIgnored::NoContainer);
        };

        tree.add_class(node, DRAGGING_CLASS);
        self.session = Some(DragSession {
            dragged: node,
            source_container,
            container_role,
            target_container: None,
            marker: None,
        });
        debug!(
            node = node.get(),
            container = source_container.get(),
            "drag started"
        );
        StartOutcome::Started { source_container }
    }

    // `span_of` reports the on-screen extent of a node; the insertion side is
    // decided against the sibling the marker lands next to, not `hovered`.
    pub fn hover<F>(
        &mut self,
        tree: &mut VisualTree,
        hovered: NodeId,
        pointer_y: f32,
        span_of: F,
    ) -> HoverOutcome
    where
        F: Fn(NodeId) -> Option<VerticalSpan>,
    {
        let Some(session) = self.session.clone() else {
            return HoverOutcome::Ignored(DragIgnored::NoSession);
        };
        if !tree.contains(session.dragged) || !tree.contains(hovered) {
            return HoverOutcome::Ignored(DragIgnored::StaleNode);
        }

        let target = tree.enclosing_or_self(hovered, session.container_role);
        if let Some(active) = self.session.as_mut() {
            active.target_container = target;
        }
        if target != Some(session.source_container) {
            self.clear_marker(tree);
            return HoverOutcome::Ignored(DragIgnored::CrossContainer);
        }
        self.highlight(tree, session.source_container);

        let Some(anchor) = child_of(tree, session.source_container, hovered) else {
            return HoverOutcome::Unchanged;
        };
        let anchor_is_peer = tree
            .get(anchor)
            .is_some_and(|node| node.draggable && node.role() != NodeRole::Placeholder);
        if anchor == session.dragged || !anchor_is_peer {
            return HoverOutcome::Unchanged;
        }

        let Some(span) = span_of(anchor) else {
            return HoverOutcome::Unchanged;
        };
        let position = if pointer_y < span.midpoint() {
            InsertPosition::Before
        } else {
            InsertPosition::After
        };
        let point = InsertionPoint { anchor, position };
        if session.marker == Some(point) && self.placeholder_in(tree, session.source_container) {
            return HoverOutcome::Unchanged;
        }

        if !self.place_marker(tree, session.source_container, point) {
            return HoverOutcome::Unchanged;
        }
        if let Some(active) = self.session.as_mut() {
            active.marker = Some(point);
        }
        HoverOutcome::Marked(point)
    }

    pub fn release(&mut self, tree: &mut VisualTree, target: Option<NodeId>) -> DropOutcome {
        let Some(session) = self.session.clone() else {
            return DropOutcome::Discarded(DragIgnored::NoSession);
        };
        if !tree.contains(session.dragged) {
            return self.discard(tree, DragIgnored::StaleNode);
        }
        let Some(target) = target.filter(|target| tree.contains(*target)) else {
            return self.discard(tree, DragIgnored::NoTarget);
        };
        if tree.enclosing_or_self(target, session.container_role) != Some(session.source_container)
        {
            return self.discard(tree, DragIgnored::CrossContainer);
        }
        let Some(placeholder) = self
            .placeholder
            .filter(|_| self.placeholder_in(tree, session.source_container))
        else {
            return self.discard(tree, DragIgnored::NoInsertionPoint);
        };

        let container = session.source_container;
        let Some(from) = peer_index(tree, container, session.dragged, placeholder) else {
            return self.discard(tree, DragIgnored::StaleNode);
        };
        let Some(destination) = tree
            .children(container)
            .iter()
            .filter(|child| **child != session.dragged)
            .position(|child| *child == placeholder)
        else {
            return self.discard(tree, DragIgnored::NoInsertionPoint);
        };

        tree.move_to(session.dragged, container, destination);
        let to = peer_index(tree, container, session.dragged, placeholder).unwrap_or(from);
        self.finish(tree);
        info!(
            node = session.dragged.get(),
            container = container.get(),
            from,
            to,
            "drag committed"
        );
        DropOutcome::Committed { from, to }
    }

    pub fn cancel(&mut self, tree: &mut VisualTree) -> DropOutcome {
        if self.session.is_none() {
            return DropOutcome::Discarded(DragIgnored::NoSession);
        }
        self.discard(tree, DragIgnored::Cancelled)
    }

    fn discard(&mut self, tree: &mut VisualTree, reason: DragIgnored) -> DropOutcome {
        info!(reason = reason.label(), "drag discarded");
        self.finish(tree);
        DropOutcome::Discarded(reason)
    }

    fn finish(&mut self, tree: &mut VisualTree) {
        if let Some(session) = self.session.take() {
            tree.remove_class(session.dragged, DRAGGING_CLASS);
        }
        self.clear_marker(tree);
    }

    fn clear_marker(&mut self, tree: &mut VisualTree) {
        if let Some(placeholder) = self.placeholder.take() {
            tree.remove(placeholder);
        }
        if let Some(container) = self.highlighted.take() {
            tree.remove_class(container, DRAG_OVER_CLASS);
        }
        if let Some(session) = self.session.as_mut() {
            session.marker = None;
        }
    }

    fn highlight(&mut self, tree: &mut VisualTree, container: NodeId) {
        if self.highlighted == Some(container) {
            return;
        }
        if let Some(previous) = self.highlighted.take() {
            tree.remove_class(previous, DRAG_OVER_CLASS);
        }
        tree.add_class(container, DRAG_OVER_CLASS);
        self.highlighted = Some(container);
    }

    fn placeholder_in(&self, tree: &VisualTree, container: NodeId) -> bool {
        self.placeholder
            .is_some_and(|placeholder| tree.parent(placeholder) == Some(container))
    }

    fn place_marker(
        &mut self,
        tree: &mut VisualTree,
        container: NodeId,
        point: InsertionPoint,
    ) -> bool {
        let placeholder = self.placeholder.filter(|id| tree.contains(*id));
        let Some(anchor_index) = tree
            .children(container)
            .iter()
            .filter(|child| Some(**child) != placeholder)
            .position(|child| *child == point.anchor)
        else {
            return false;
        };
        let index = match point.position {
            InsertPosition::Before => anchor_index,
            InsertPosition::After => anchor_index + 1,
        };

        match placeholder {
            Some(existing) => tree.move_to(existing, container, index),
            None => {
                let created = tree.insert(
                    container,
                    index,
                    Node::new(NodeRole::Placeholder).with_class(PLACEHOLDER_CLASS),
                );
                self.placeholder = created;
                created.is_some()
            }
        }
    }
}

fn nearest_container(tree: &VisualTree, node: NodeId) -> Option<NodeId> {
    tree.ancestors(node)
        .skip(1)
        .find(|ancestor| tree.get(*ancestor).is_some_and(|node| node.container))
}

fn child_of(tree: &VisualTree, container: NodeId, node: NodeId) -> Option<NodeId> {
    tree.ancestors(node)
        .find(|ancestor| tree.parent(*ancestor) == Some(container))
}

fn peer_index(
    tree: &VisualTree,
    container: NodeId,
    node: NodeId,
    placeholder: NodeId,
) -> Option<usize> {
    tree.children(container)
        .iter()
        .filter(|child| **child != placeholder)
        .position(|child| *child == node)
}
