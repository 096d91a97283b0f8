//! Overworld Core
//!
//! Plain-data building blocks shared by the engine:
//! - Axis-aligned bounds and collision predicates
//! - RGBA8 colors, images and pixel blits
//! - Render vertices and quad primitives
//! - Swap-remove buckets with relocation reporting
//! - Deterministic math helpers

pub mod bounds;
pub mod bucket;
pub mod color;
pub mod image;
pub mod math;
pub mod vertex;

pub use bounds::Bounds;
pub use bucket::{Bucket, BucketError, Relocation};
pub use color::Color;
pub use image::{Image, ImageError};
pub use vertex::{Vertex, QUAD_VERTEX_COUNT};

pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
