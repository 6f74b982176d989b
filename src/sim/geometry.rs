//! Shape and rectangle primitives shared by the spatial index and collision tests
//!
//! Screen-space convention: origin top-left, y grows downward. Rectangles are
//! stored by their top-left corner.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (top-left corner + size)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size centered on `center`
    pub fn centered(center: Vec2, width: f32, height: f32) -> Self {
        Self::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            width,
            height,
        )
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict overlap (touching edges do not count)
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Grow on every side by `margin`
    pub fn expanded(&self, margin: f32) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            self.width + margin * 2.0,
            self.height + margin * 2.0,
        )
    }
}

/// Bounding shape of an entity, independent of position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Circle { radius: f32 },
    Rect { width: f32, height: f32 },
}

impl Shape {
    /// Place the shape with its center at `pos`
    pub fn at(&self, pos: Vec2) -> Collider {
        match *self {
            Shape::Circle { radius } => Collider::Circle {
                center: pos,
                radius,
            },
            Shape::Rect { width, height } => Collider::Rect(Rect::centered(pos, width, height)),
        }
    }
}

impl Default for Shape {
    fn default() -> Self {
        Shape::Circle { radius: 0.0 }
    }
}

/// A positioned shape, ready for collision tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collider {
    Circle { center: Vec2, radius: f32 },
    Rect(Rect),
}

impl Collider {
    /// Axis-aligned bounding box, used as the quadtree key
    pub fn bounds(&self) -> Rect {
        match *self {
            Collider::Circle { center, radius } => {
                Rect::new(center.x - radius, center.y - radius, radius * 2.0, radius * 2.0)
            }
            Collider::Rect(rect) => rect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.right(), 40.0);
        assert_eq!(r.bottom(), 60.0);
        assert_eq!(r.center(), Vec2::new(25.0, 40.0));
    }

    #[test]
    fn test_rect_intersects_is_strict() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rect::new(5.0, 5.0, 10.0, 10.0)));
        assert!(!a.intersects(&Rect::new(10.0, 0.0, 10.0, 10.0)));
        assert!(!a.intersects(&Rect::new(0.0, 11.0, 10.0, 10.0)));
    }

    #[test]
    fn test_shape_placement_and_bounds() {
        let circle = Shape::Circle { radius: 5.0 }.at(Vec2::new(10.0, 10.0));
        assert_eq!(circle.bounds(), Rect::new(5.0, 5.0, 10.0, 10.0));

        let rect = Shape::Rect {
            width: 20.0,
            height: 10.0,
        }
        .at(Vec2::new(10.0, 10.0));
        assert_eq!(rect.bounds(), Rect::new(0.0, 5.0, 20.0, 10.0));
    }

    #[test]
    fn test_shape_serde_tagging() {
        let shape: Shape = serde_json::from_str(r#"{"kind":"circle","radius":3.0}"#).unwrap();
        assert_eq!(shape, Shape::Circle { radius: 3.0 });
    }
}
