//! Platform abstraction traits.
//!
//! These define the interface between the editor logic and the host that
//! renders it (browser DOM, headless tests). Geometry comes in through
//! [`LayoutProvider`], UI feedback goes out through [`UiHooks`], and time
//! through [`Clock`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

use crate::tree::{ActiveFormats, DocumentSurface, NodeId};
use crate::types::{Rect, Size};

/// Source of rendered geometry.
///
/// Coordinates are relative to the top-left of the editable surface.
pub trait LayoutProvider {
    /// Rendered bounds of a node, if it is laid out.
    fn object_rect(&self, surface: &DocumentSurface, id: NodeId) -> Option<Rect>;

    /// Size of the editable surface, used to clamp moved objects.
    fn surface_size(&self) -> Size;
}

/// UI refresh points the editor calls after it changes content underneath
/// the user.
pub trait UiHooks {
    /// Return keyboard focus to the editable surface.
    fn focus_surface(&mut self);

    /// Update toolbar indicators (bold, alignment, lists, ...).
    fn refresh_active_states(&mut self, formats: &ActiveFormats);

    /// Show or hide the table editing toolbar.
    fn show_table_tools(&mut self, visible: bool);
}

/// UI hooks that do nothing, for headless use.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopUi;

impl UiHooks for NoopUi {
    fn focus_surface(&mut self) {}

    fn refresh_active_states(&mut self, _formats: &ActiveFormats) {}

    fn show_table_tools(&mut self, _visible: bool) {}
}

/// Monotonic time source for debouncing.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}
