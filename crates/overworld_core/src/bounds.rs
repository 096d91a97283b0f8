//! Axis-aligned rectangles in world or pixel space.

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// Largest magnitude an `f32` can hold while still representing every integer
/// below it exactly (2^24).
pub const F32_EXACT_INT_MAX: u32 = 1 << 24;

/// Axis-aligned rectangle spanning `[x1, x2) x [y1, y2)`.
///
/// A valid rectangle has finite coordinates with `x1 <= x2` and `y1 <= y2`.
/// Zero-area rectangles are valid but never collide with anything.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Bounds {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Bounds {
    pub const ZERO: Bounds = Bounds::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a rectangle from its top-left corner and extent.
    #[inline]
    pub fn from_size(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Finite coordinates, ordered corners.
    pub fn is_valid(&self) -> bool {
        self.x1.is_finite()
            && self.y1.is_finite()
            && self.x2.is_finite()
            && self.y2.is_finite()
            && self.x1 <= self.x2
            && self.y1 <= self.y2
    }

    /// Every coordinate is a whole number.
    pub fn is_integral(&self) -> bool {
        self.x1.fract() == 0.0
            && self.y1.fract() == 0.0
            && self.x2.fract() == 0.0
            && self.y2.fract() == 0.0
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Strictly positive extent on both axes.
    #[inline]
    pub fn has_area(&self) -> bool {
        self.x2 > self.x1 && self.y2 > self.y1
    }

    /// Overlap test with exclusive edges: touching rectangles do not collide
    /// and a rectangle without area collides with nothing, itself included.
    pub fn collides(&self, other: &Bounds) -> bool {
        self.has_area()
            && other.has_area()
            && self.x1 < other.x2
            && other.x1 < self.x2
            && self.y1 < other.y2
            && other.y1 < self.y2
    }

    /// `inner` lies entirely within `self` (shared edges allowed).
    pub fn contains(&self, inner: &Bounds) -> bool {
        self.x1 <= inner.x1 && self.y1 <= inner.y1 && inner.x2 <= self.x2 && inner.y2 <= self.y2
    }

    /// Same origin, zero extent.
    #[inline]
    pub fn collapsed(&self) -> Bounds {
        Bounds::new(self.x1, self.y1, self.x1, self.y1)
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x1, self.y1, self.x2, self.y2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_edges_do_not_collide() {
        let a = Bounds::new(0.0, 0.0, 1.0, 1.0);
        let right = Bounds::new(1.0, 0.0, 2.0, 1.0);
        let below = Bounds::new(0.0, 1.0, 1.0, 2.0);
        assert!(!a.collides(&right));
        assert!(!right.collides(&a));
        assert!(!a.collides(&below));
    }

    #[test]
    fn zero_area_never_collides() {
        let point = Bounds::new(4.0, 4.0, 4.0, 4.0);
        let line = Bounds::new(0.0, 4.0, 8.0, 4.0);
        let big = Bounds::new(0.0, 0.0, 8.0, 8.0);
        assert!(!point.collides(&point));
        assert!(!point.collides(&big));
        assert!(!big.collides(&line));
        assert!(!line.collides(&line));
    }

    #[test]
    fn overlap_collides_both_ways() {
        let a = Bounds::new(0.0, 0.0, 16.0, 16.0);
        let b = Bounds::new(15.0, 15.0, 31.0, 31.0);
        assert!(a.collides(&b));
        assert!(b.collides(&a));
        assert!(a.collides(&a));
    }

    #[test]
    fn validity_rejects_inverted_and_non_finite() {
        assert!(Bounds::ZERO.is_valid());
        assert!(!Bounds::new(1.0, 0.0, 0.0, 1.0).is_valid());
        assert!(!Bounds::new(0.0, 0.0, f32::NAN, 1.0).is_valid());
        assert!(!Bounds::new(0.0, 0.0, f32::INFINITY, 1.0).is_valid());
    }

    #[test]
    fn contains_allows_shared_edges() {
        let outer = Bounds::new(0.0, 0.0, 4.0, 4.0);
        assert!(outer.contains(&Bounds::new(0.0, 0.0, 4.0, 2.0)));
        assert!(!outer.contains(&Bounds::new(0.0, 0.0, 5.0, 2.0)));
    }

    #[test]
    fn collapsed_keeps_origin() {
        let b = Bounds::new(3.0, 7.0, 9.0, 11.0).collapsed();
        assert_eq!(b, Bounds::new(3.0, 7.0, 3.0, 7.0));
        assert!(!b.has_area());
    }
}
