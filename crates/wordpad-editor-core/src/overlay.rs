//! Floating-object overlay.
//!
//! Selecting an image or table re-parents it into a positioning shell with
//! a move handle and a resize handle. The shell lives in the document tree
//! while the object is selected, but it is scaffolding: history snapshots
//! are taken from a projection of the tree with the shell dissolved, and
//! every restore tears the shell down first.
//!
//! State machine:
//!
//! ```text
//! Idle --select--> Wrapped --pointer_down(shell)--> Moving  --pointer_up--> Wrapped
//!                          --pointer_down(resize)-> Resizing --pointer_up--> Wrapped
//! Wrapped --click elsewhere / undo / redo / delete--> Idle
//! ```

use crate::config::OverlayConfig;
use crate::error::EditorError;
use crate::events::{ChangeOrigin, ContentChange};
use crate::history::OverlayControl;
use crate::platform::LayoutProvider;
use crate::tree::{DocumentSurface, Element, Node, NodeId, Position, Style, Tag};
use crate::types::{Point, Rect, Size};

/// Externally visible overlay state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayState {
    Idle,
    Wrapped,
    Moving,
    Resizing,
}

/// What a click did to the overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    /// A new object was wrapped.
    Selected(NodeId),
    /// The click landed on the active wrapper; nothing changed.
    Kept,
    /// The active wrapper was dissolved.
    Released,
    /// No wrapper before or after.
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Gesture {
    Moving {
        /// Pointer position relative to the shell origin.
        grab: Point,
        start: Rect,
    },
    Resizing {
        pointer_start: Point,
        start: Rect,
        object_width: Option<f64>,
        object_height: Option<f64>,
    },
}

/// Where the object goes when its shell is dissolved.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Placement {
    object: NodeId,
    position: Option<Position>,
    left: Option<f64>,
    top: Option<f64>,
}

impl Placement {
    fn apply(&self, style: &mut Style) {
        style.position = self.position;
        style.left = self.left;
        style.top = self.top;
    }
}

#[derive(Clone, Debug)]
struct ActiveWrapper {
    shell: NodeId,
    object: NodeId,
    move_handle: NodeId,
    resize_handle: NodeId,
    /// Current shell geometry.
    rect: Rect,
    /// Shell origin when the object was selected.
    home: Point,
    /// Object positioning before it was wrapped.
    home_style: Style,
    gesture: Option<Gesture>,
}

impl ActiveWrapper {
    fn moved(&self) -> bool {
        self.rect.origin() != self.home
    }

    fn placement(&self) -> Placement {
        if self.moved() {
            Placement {
                object: self.object,
                position: Some(Position::Absolute),
                left: Some(self.rect.x),
                top: Some(self.rect.y),
            }
        } else {
            Placement {
                object: self.object,
                position: self.home_style.position,
                left: self.home_style.left,
                top: self.home_style.top,
            }
        }
    }

    fn owns(&self, id: NodeId) -> bool {
        id == self.shell || id == self.object || id == self.move_handle || id == self.resize_handle
    }
}

/// Replace every shell in `nodes` with its non-scaffolding children.
///
/// Returns the number of shells removed.
fn unwrap_shells(nodes: &mut Vec<Node>, placement: Option<Placement>) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i < nodes.len() {
        if nodes[i].tag() != Some(Tag::ObjectShell) {
            if let Some(children) = nodes[i].children_mut() {
                count += unwrap_shells(children, placement);
            }
            i += 1;
            continue;
        }
        let shell = nodes.remove(i);
        let mut kept: Vec<Node> = shell
            .into_children()
            .into_iter()
            .filter(|child| !child.tag().is_some_and(|t| t.is_scaffolding()))
            .collect();
        if let Some(placement) = placement {
            for child in kept.iter_mut().filter(|c| c.id == placement.object) {
                if let Some(el) = child.as_element_mut() {
                    placement.apply(&mut el.style);
                }
            }
        }
        let n = kept.len();
        nodes.splice(i..i, kept);
        i += n;
        count += 1;
    }
    count
}

fn shell_style(rect: Rect) -> Style {
    Style {
        position: Some(Position::Absolute),
        left: Some(rect.x),
        top: Some(rect.y),
        width: Some(rect.width),
        height: Some(rect.height),
        align: None,
    }
}

/// Manages the single active wrapper and its move/resize gestures.
#[derive(Clone, Debug)]
pub struct ObjectOverlayManager {
    config: OverlayConfig,
    active: Option<ActiveWrapper>,
}

impl ObjectOverlayManager {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }

    pub fn state(&self) -> OverlayState {
        match self.active.as_ref().map(|a| a.gesture) {
            None => OverlayState::Idle,
            Some(None) => OverlayState::Wrapped,
            Some(Some(Gesture::Moving { .. })) => OverlayState::Moving,
            Some(Some(Gesture::Resizing { .. })) => OverlayState::Resizing,
        }
    }

    /// The wrapped object, if any.
    pub fn selected(&self) -> Option<NodeId> {
        self.active.as_ref().map(|a| a.object)
    }

    pub fn shell(&self) -> Option<NodeId> {
        self.active.as_ref().map(|a| a.shell)
    }

    pub fn move_handle(&self) -> Option<NodeId> {
        self.active.as_ref().map(|a| a.move_handle)
    }

    pub fn resize_handle(&self) -> Option<NodeId> {
        self.active.as_ref().map(|a| a.resize_handle)
    }

    /// Current shell geometry.
    pub fn rect(&self) -> Option<Rect> {
        self.active.as_ref().map(|a| a.rect)
    }

    pub fn is_gesture_active(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.gesture.is_some())
    }

    // === Selection ===

    /// Wrap `object` in a shell, dissolving any existing wrapper first.
    ///
    /// Non-embeddable targets are rejected and leave the overlay idle.
    pub fn select(
        &mut self,
        surface: &mut DocumentSurface,
        object: NodeId,
        layout: &impl LayoutProvider,
    ) -> Result<(), EditorError> {
        if self.selected() == Some(object) {
            return Ok(());
        }
        self.dissolve(surface);

        let node = surface
            .find(object)
            .ok_or(EditorError::NodeNotFound(object))?;
        let home_style = match node.as_element() {
            Some(el) if el.tag.is_embeddable() => el.style,
            _ => return Err(EditorError::NotEmbeddable(object)),
        };
        let rect = layout
            .object_rect(surface, object)
            .ok_or(EditorError::NoGeometry(object))?;
        let (parent, index) = surface
            .locate(object)
            .ok_or(EditorError::NodeNotFound(object))?;

        let mut node = surface.detach(object)?;
        if let Some(el) = node.as_element_mut() {
            Placement {
                object,
                position: None,
                left: None,
                top: None,
            }
            .apply(&mut el.style);
        }
        let move_handle = surface.element(Element::new(Tag::MoveHandle));
        let resize_handle = surface.element(Element::new(Tag::ResizeHandle));
        let move_id = move_handle.id;
        let resize_id = resize_handle.id;
        let shell = surface.element(
            Element::new(Tag::ObjectShell)
                .with_style(shell_style(rect))
                .with_children(vec![node, move_handle, resize_handle]),
        );
        let shell_id = shell.id;
        surface.insert_at(parent, index, shell)?;

        tracing::debug!(%object, shell = %shell_id, ?rect, "wrapped object");
        self.active = Some(ActiveWrapper {
            shell: shell_id,
            object,
            move_handle: move_id,
            resize_handle: resize_id,
            rect,
            home: rect.origin(),
            home_style,
            gesture: None,
        });
        if self.config.save_on_select {
            surface.publish(ContentChange::discrete(ChangeOrigin::ObjectSelect));
        }
        Ok(())
    }

    /// Put the object back where the shell is and drop the shell.
    ///
    /// Returns whether a wrapper was dissolved. Never fails: a wrapper whose
    /// shell has already vanished from the tree is just forgotten.
    pub fn dissolve(&mut self, surface: &mut DocumentSurface) -> bool {
        match self.try_dissolve(surface) {
            Ok(dissolved) => dissolved,
            Err(err) => {
                tracing::debug!(%err, "dropping stale object wrapper");
                false
            }
        }
    }

    fn try_dissolve(&mut self, surface: &mut DocumentSurface) -> Result<bool, EditorError> {
        let Some(active) = self.active.take() else {
            return Ok(false);
        };
        let removed = unwrap_shells(surface.content_mut(), Some(active.placement()));
        surface.fix_caret();
        if removed == 0 {
            return Err(EditorError::NodeNotFound(active.shell));
        }
        tracing::debug!(object = %active.object, moved = active.moved(), "dissolved object wrapper");
        Ok(true)
    }

    /// Route a click. `target` is the clicked node, or None for a click
    /// outside the editable surface.
    pub fn click(
        &mut self,
        surface: &mut DocumentSurface,
        target: Option<NodeId>,
        layout: &impl LayoutProvider,
    ) -> ClickOutcome {
        if let (Some(active), Some(target)) = (&self.active, target) {
            if active.owns(target) {
                return ClickOutcome::Kept;
            }
        }
        let embeddable = target.filter(|id| {
            surface
                .find(*id)
                .and_then(Node::tag)
                .is_some_and(|t| t.is_embeddable())
        });
        let had_wrapper = self.active.is_some();
        match embeddable {
            Some(object) => match self.select(surface, object, layout) {
                Ok(()) => ClickOutcome::Selected(object),
                Err(err) => {
                    tracing::warn!(%err, "could not select object");
                    self.release(surface, had_wrapper)
                }
            },
            None => {
                self.dissolve(surface);
                self.release(surface, had_wrapper)
            }
        }
    }

    /// Dissolve on focus loss.
    pub fn blur(&mut self, surface: &mut DocumentSurface) -> bool {
        let had_wrapper = self.active.is_some();
        self.dissolve(surface);
        self.release(surface, had_wrapper) == ClickOutcome::Released
    }

    fn release(&mut self, surface: &mut DocumentSurface, had_wrapper: bool) -> ClickOutcome {
        if had_wrapper && self.active.is_none() {
            surface.publish(ContentChange::discrete(ChangeOrigin::ObjectRelease));
            ClickOutcome::Released
        } else {
            ClickOutcome::Ignored
        }
    }

    // === Gestures ===

    /// Start a gesture if `target` is part of the active wrapper.
    ///
    /// The resize handle starts a resize; the shell, move handle or object
    /// start a move. Replaces any gesture already in flight.
    pub fn pointer_down(&mut self, surface: &DocumentSurface, target: NodeId, pos: Point) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if !active.owns(target) {
            return false;
        }
        let gesture = if target == active.resize_handle {
            let object_style = surface
                .find(active.object)
                .and_then(Node::as_element)
                .map(|el| el.style)
                .unwrap_or_default();
            Gesture::Resizing {
                pointer_start: pos,
                start: active.rect,
                object_width: object_style.width,
                object_height: object_style.height,
            }
        } else {
            Gesture::Moving {
                grab: pos.delta_from(active.rect.origin()),
                start: active.rect,
            }
        };
        if active.gesture.is_some() {
            tracing::debug!("replacing in-flight gesture");
        }
        active.gesture = Some(gesture);
        true
    }

    /// Update the in-flight gesture. `bounds` is the surface size that a
    /// moved shell must stay inside.
    pub fn pointer_move(&mut self, surface: &mut DocumentSurface, pos: Point, bounds: Size) -> bool {
        let min_size = self.config.min_object_size;
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        match active.gesture {
            None => false,
            Some(Gesture::Moving { grab, start }) => {
                let origin = pos.delta_from(grab);
                let rect = Rect::from_parts(origin, start.size()).clamped_to(bounds);
                active.rect = rect;
                tracing::trace!(x = rect.x, y = rect.y, "move");
                set_style(surface, active.shell, |style| {
                    style.left = Some(rect.x);
                    style.top = Some(rect.y);
                });
                true
            }
            Some(Gesture::Resizing {
                pointer_start,
                start,
                ..
            }) => {
                let delta = pos.delta_from(pointer_start);
                let size = Size::new(start.width + delta.x, start.height + delta.y).at_least(min_size);
                active.rect = Rect::from_parts(start.origin(), size);
                tracing::trace!(width = size.width, height = size.height, "resize");
                for id in [active.object, active.shell] {
                    set_style(surface, id, |style| {
                        style.width = Some(size.width);
                        style.height = Some(size.height);
                    });
                }
                true
            }
        }
    }

    /// Finish the in-flight gesture, publishing one discrete change.
    pub fn pointer_up(&mut self, surface: &mut DocumentSurface) -> bool {
        let Some(gesture) = self.active.as_mut().and_then(|a| a.gesture.take()) else {
            return false;
        };
        let origin = match gesture {
            Gesture::Moving { .. } => ChangeOrigin::ObjectMove,
            Gesture::Resizing { .. } => ChangeOrigin::ObjectResize,
        };
        tracing::debug!(?origin, rect = ?self.rect(), "gesture committed");
        surface.publish(ContentChange::discrete(origin));
        true
    }

    /// Abandon the in-flight gesture and put the geometry back as it was
    /// when the gesture started. Records nothing.
    pub fn cancel_gesture(&mut self, surface: &mut DocumentSurface) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        let Some(gesture) = active.gesture.take() else {
            return false;
        };
        match gesture {
            Gesture::Moving { start, .. } => {
                active.rect = start;
                set_style(surface, active.shell, |style| {
                    style.left = Some(start.x);
                    style.top = Some(start.y);
                });
            }
            Gesture::Resizing {
                start,
                object_width,
                object_height,
                ..
            } => {
                active.rect = start;
                set_style(surface, active.shell, |style| {
                    style.width = Some(start.width);
                    style.height = Some(start.height);
                });
                set_style(surface, active.object, |style| {
                    style.width = object_width;
                    style.height = object_height;
                });
            }
        }
        tracing::debug!("gesture cancelled");
        true
    }

    /// Remove the wrapped object together with its shell.
    ///
    /// Returns false when nothing is selected.
    pub fn delete_selected(&mut self, surface: &mut DocumentSurface) -> Result<bool, EditorError> {
        let Some(active) = self.active.take() else {
            return Ok(false);
        };
        surface.detach(active.shell)?;
        tracing::debug!(object = %active.object, "deleted selected object");
        surface.publish(ContentChange::discrete(ChangeOrigin::ObjectDelete));
        Ok(true)
    }
}

fn set_style(surface: &mut DocumentSurface, id: NodeId, f: impl FnOnce(&mut Style)) {
    if let Some(el) = surface.find_mut(id).and_then(Node::as_element_mut) {
        f(&mut el.style);
    }
}

impl OverlayControl for ObjectOverlayManager {
    fn project(&self, surface: &DocumentSurface) -> Vec<Node> {
        let mut nodes = surface.content().to_vec();
        unwrap_shells(&mut nodes, self.active.as_ref().map(ActiveWrapper::placement));
        nodes
    }

    fn dissolve_for_restore(&mut self, surface: &mut DocumentSurface) -> Result<(), EditorError> {
        self.try_dissolve(surface).map(|_| ())
    }
}
