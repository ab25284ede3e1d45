//! Planar geometry primitives shared across the simulation.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// 2D vector type for positions, velocities, and flow directions.
pub type Vec2 = Vector2<f32>;

/// Axis-aligned rectangle in apartment coordinates (meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Point-in-rectangle test with inclusive edges.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        (self.x..=self.x + self.width).contains(&x) && (self.y..=self.y + self.height).contains(&y)
    }

    /// Like [`Rect::contains`], but with the rectangle grown by the given
    /// margins on each side. Used for the window-escape test, which widens
    /// openings horizontally so grazing particles still count as through.
    pub fn contains_expanded(&self, x: f32, y: f32, margin_x: f32, margin_y: f32) -> bool {
        (self.x - margin_x..=self.x + self.width + margin_x).contains(&x)
            && (self.y - margin_y..=self.y + self.height + margin_y).contains(&y)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_edge_inclusive() {
        let r = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert!(r.contains(1.0, 2.0));
        assert!(r.contains(4.0, 6.0));
        assert!(r.contains(2.5, 3.0));
        assert!(!r.contains(0.99, 3.0));
        assert!(!r.contains(2.5, 6.01));
    }

    #[test]
    fn expanded_contains_widens_bounds() {
        let r = Rect::new(8.9, 0.5, 0.1, 1.5);
        assert!(!r.contains(8.75, 1.0));
        assert!(r.contains_expanded(8.75, 1.0, 0.2, 0.0));
        assert!(!r.contains_expanded(8.75, 0.4, 0.2, 0.0));
    }

    #[test]
    fn center_and_area() {
        let r = Rect::new(0.0, 3.0, 6.0, 3.0);
        assert_eq!(r.center(), Vec2::new(3.0, 4.5));
        assert_eq!(r.area(), 18.0);
    }
}
