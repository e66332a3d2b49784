//! Headless geometry.

use crate::platform::LayoutProvider;
use crate::tree::{DocumentSurface, Node, NodeId, Tag};
use crate::types::{Rect, Size};

const IMAGE_SIZE: f64 = 100.0;
const CELL_WIDTH: f64 = 40.0;
const ROW_HEIGHT: f64 = 24.0;
const LINE_HEIGHT: f64 = 20.0;

/// Layout computed from explicit inline styles, falling back to fixed
/// intrinsic sizes (images 100x100, tables 40 per column by 24 per row).
///
/// Objects without an explicit offset sit at the surface origin.
#[derive(Clone, Copy, Debug)]
pub struct StaticLayout {
    pub surface: Size,
}

impl StaticLayout {
    pub fn new(surface: Size) -> Self {
        Self { surface }
    }

    fn intrinsic_size(&self, node: &Node) -> Size {
        match node.tag() {
            Some(Tag::Image) => Size::new(IMAGE_SIZE, IMAGE_SIZE),
            Some(Tag::Table) => {
                let rows = node.children().len();
                let cols = node
                    .children()
                    .iter()
                    .map(|row| row.children().len())
                    .max()
                    .unwrap_or(0);
                Size::new(CELL_WIDTH * cols as f64, ROW_HEIGHT * rows as f64)
            }
            _ => Size::new(self.surface.width, LINE_HEIGHT),
        }
    }
}

impl Default for StaticLayout {
    fn default() -> Self {
        Self::new(Size::new(800.0, 1000.0))
    }
}

impl LayoutProvider for StaticLayout {
    fn object_rect(&self, surface: &DocumentSurface, id: NodeId) -> Option<Rect> {
        let node = surface.find(id)?;
        let el = node.as_element()?;
        let intrinsic = self.intrinsic_size(node);
        Some(Rect::new(
            el.style.left.unwrap_or(0.0),
            el.style.top.unwrap_or(0.0),
            el.style.width.unwrap_or(intrinsic.width),
            el.style.height.unwrap_or(intrinsic.height),
        ))
    }

    fn surface_size(&self) -> Size {
        self.surface
    }
}
