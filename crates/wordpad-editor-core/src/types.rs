//! Geometry types shared by the overlay and layout code.
//!
//! All values are logical units relative to the top-left corner of the
//! document surface.

use serde::{Deserialize, Serialize};

/// A point in surface coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise difference `self - other`.
    pub fn delta_from(&self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// A width/height pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Clamp both dimensions to at least `min`.
    pub fn at_least(self, min: f64) -> Self {
        Self::new(self.width.max(min), self.height.max(min))
    }
}

/// An axis-aligned rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_parts(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Check if a point lies inside the rectangle (right/bottom edges exclusive).
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }

    /// Move the rectangle so it stays inside `bounds` anchored at the origin.
    ///
    /// When the rectangle is larger than the bounds it is pinned to 0 on
    /// that axis.
    pub fn clamped_to(self, bounds: Size) -> Self {
        Self {
            x: clamp_axis(self.x, bounds.width, self.width),
            y: clamp_axis(self.y, bounds.height, self.height),
            ..self
        }
    }
}

fn clamp_axis(pos: f64, extent: f64, size: f64) -> f64 {
    pos.min(extent - size).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_inside_bounds_unchanged() {
        let r = Rect::new(10.0, 20.0, 50.0, 50.0).clamped_to(Size::new(800.0, 600.0));
        assert_eq!(r, Rect::new(10.0, 20.0, 50.0, 50.0));
    }

    #[test]
    fn test_clamp_negative_and_overflow() {
        let bounds = Size::new(200.0, 100.0);
        let r = Rect::new(-15.0, 90.0, 50.0, 40.0).clamped_to(bounds);
        assert_eq!(r.origin(), Point::new(0.0, 60.0));

        let r = Rect::new(190.0, -1.0, 50.0, 40.0).clamped_to(bounds);
        assert_eq!(r.origin(), Point::new(150.0, 0.0));
    }

    #[test]
    fn test_clamp_larger_than_bounds_pins_to_zero() {
        let r = Rect::new(30.0, 30.0, 500.0, 500.0).clamped_to(Size::new(100.0, 100.0));
        assert_eq!(r.origin(), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_rect_contains() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(Point::new(0.0, 0.0)));
        assert!(r.contains(Point::new(9.5, 9.5)));
        assert!(!r.contains(Point::new(10.0, 5.0)));
    }

    #[test]
    fn test_size_at_least() {
        assert_eq!(Size::new(10.0, 45.0).at_least(30.0), Size::new(30.0, 45.0));
    }
}
