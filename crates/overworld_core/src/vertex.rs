//! Render vertices and quad construction.

use crate::{Bounds, Color};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

/// Two triangles per quad.
pub const QUAD_VERTEX_COUNT: usize = 6;

/// GPU vertex: homogeneous position, color and texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 4],
    pub color: Color,
    pub u: f32,
    pub v: f32,
}

impl Vertex {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, color: Color, u: f32, v: f32) -> Self {
        Self {
            pos: [x, y, z, 1.0],
            color,
            u,
            v,
        }
    }

    /// Build the six vertices covering `bounds` at depth `z`, textured with
    /// `texture_bounds` (in texel units).
    ///
    /// Winding: (x1,y1) (x2,y1) (x1,y2), then (x2,y1) (x2,y2) (x1,y2).
    pub fn quad(bounds: &Bounds, texture_bounds: &Bounds, color: Color, z: f32) -> [Vertex; QUAD_VERTEX_COUNT] {
        let b = bounds;
        let t = texture_bounds;
        [
            Vertex::new(b.x1, b.y1, z, color, t.x1, t.y1),
            Vertex::new(b.x2, b.y1, z, color, t.x2, t.y1),
            Vertex::new(b.x1, b.y2, z, color, t.x1, t.y2),
            Vertex::new(b.x2, b.y1, z, color, t.x2, t.y1),
            Vertex::new(b.x2, b.y2, z, color, t.x2, t.y2),
            Vertex::new(b.x1, b.y2, z, color, t.x1, t.y2),
        ]
    }

    /// Apply a transform to the position.
    #[inline]
    pub fn transform(&mut self, matrix: &Mat4) {
        self.pos = (*matrix * Vec4::from_array(self.pos)).to_array();
    }

    #[inline]
    pub fn depth(&self) -> f32 {
        self.pos[2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn quad_corners_and_uvs() {
        let bounds = Bounds::new(0.0, 0.0, 4.0, 2.0);
        let tex = Bounds::new(8.0, 8.0, 12.0, 10.0);
        let quad = Vertex::quad(&bounds, &tex, Color::RED, 3.0);

        assert_eq!(quad.len(), QUAD_VERTEX_COUNT);
        assert!(quad.iter().all(|v| v.depth() == 3.0 && v.color == Color::RED));
        assert_eq!(quad[0].pos, [0.0, 0.0, 3.0, 1.0]);
        assert_eq!((quad[0].u, quad[0].v), (8.0, 8.0));
        assert_eq!(quad[4].pos, [4.0, 2.0, 3.0, 1.0]);
        assert_eq!((quad[4].u, quad[4].v), (12.0, 10.0));
    }

    #[test]
    fn transform_translates_position() {
        let mut v = Vertex::new(1.0, 2.0, 0.5, Color::WHITE, 0.0, 0.0);
        v.transform(&Mat4::from_translation(Vec3::new(10.0, -2.0, 0.0)));
        assert_eq!(v.pos, [11.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn vertex_is_plain_bytes() {
        let quad = Vertex::quad(&Bounds::new(0.0, 0.0, 1.0, 1.0), &Bounds::ZERO, Color::WHITE, 0.0);
        let bytes: &[u8] = bytemuck::cast_slice(&quad);
        assert_eq!(bytes.len(), QUAD_VERTEX_COUNT * std::mem::size_of::<Vertex>());
        assert_eq!(std::mem::size_of::<Vertex>(), 28);
    }
}
