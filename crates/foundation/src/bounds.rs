use crate::math::Vec2;

/// Axis-aligned bounding box in 2D.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb2 {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Aabb2 { min, max }
    }

    pub fn from_center(center: Vec2, half_extent: Vec2) -> Self {
        Aabb2 {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Grow the box by `amount` on every side.
    pub fn expand(&self, amount: Vec2) -> Self {
        Aabb2 {
            min: self.min - amount,
            max: self.max + amount,
        }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        self.min.x <= p.x && p.x <= self.max.x && self.min.y <= p.y && p.y <= self.max.y
    }
}
