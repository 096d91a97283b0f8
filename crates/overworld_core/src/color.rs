//! RGBA8 colors and row-strided pixel copies.

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// 8-bit-per-channel RGBA color, laid out exactly as the GPU expects it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(0xff, 0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::rgba(0x00, 0x00, 0x00, 0xff);
    pub const RED: Color = Color::rgba(0xff, 0x00, 0x00, 0xff);
    pub const GREEN: Color = Color::rgba(0x00, 0xff, 0x00, 0xff);
    pub const BLUE: Color = Color::rgba(0x00, 0x00, 0xff, 0xff);
    pub const TRANSPARENT: Color = Color::rgba(0x00, 0x00, 0x00, 0x00);

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

/// Copy a `width x height` block of pixels between two row-major buffers with
/// independent row strides (in pixels).
///
/// Both buffers must be large enough for the block; callers validate this.
pub fn blit(
    width: usize,
    height: usize,
    src: &[Color],
    src_stride: usize,
    dest: &mut [Color],
    dest_stride: usize,
) {
    debug_assert!(src_stride >= width && dest_stride >= width);
    for row in 0..height {
        let src_start = row * src_stride;
        let dest_start = row * dest_stride;
        dest[dest_start..dest_start + width].copy_from_slice(&src[src_start..src_start + width]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blit_honors_both_strides() {
        // 3x2 block out of a 4-wide source into a 5-wide destination
        let src: Vec<Color> = (0..8u8).map(|i| Color::rgba(i, 0, 0, 255)).collect();
        let mut dest = vec![Color::TRANSPARENT; 10];
        blit(3, 2, &src, 4, &mut dest, 5);

        let reds: Vec<u8> = dest.iter().map(|c| c.r).collect();
        assert_eq!(reds, vec![0, 1, 2, 0, 0, 4, 5, 6, 0, 0]);
        assert_eq!(dest[3], Color::TRANSPARENT);
        assert_eq!(dest[8], Color::TRANSPARENT);
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(Color::RED.to_string(), "#ff0000ff");
    }
}
