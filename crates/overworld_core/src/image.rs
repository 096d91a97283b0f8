//! Owned RGBA8 image with row-preserving resize.

use crate::color::{blit, Color};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("allocation of {width}x{height} pixels failed")]
    OutOfMemory { width: u32, height: u32 },
    #[error("block {width}x{height} at ({x}, {y}) exceeds {image_width}x{image_height} image")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
    #[error("source of {len} pixels too small for {width}x{height} block with stride {stride}")]
    SourceTooSmall {
        len: usize,
        width: u32,
        height: u32,
        stride: u32,
    },
}

/// Row-major pixel buffer; `pixels.len() == width * height`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl Image {
    /// Image filled with `fill`.
    pub fn new(width: u32, height: u32, fill: Color) -> Result<Self, ImageError> {
        let len = pixel_count(width, height)?;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| ImageError::OutOfMemory { width, height })?;
        pixels.resize(len, fill);
        Ok(Self { width, height, pixels })
    }

    /// 1x1 image of `color`.
    pub fn single(color: Color) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![color],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize).copied()
    }

    #[inline]
    pub fn get_mut(&mut self, x: u32, y: u32) -> Option<&mut Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get_mut(y as usize * self.width as usize + x as usize)
    }

    /// Change dimensions, keeping every pixel of the overlapping area at the
    /// same (x, y). New pixels are filled with `fill`.
    ///
    /// On allocation failure the image is unchanged.
    pub fn resize(&mut self, width: u32, height: u32, fill: Color) -> Result<(), ImageError> {
        if width == self.width && height == self.height {
            return Ok(());
        }
        let mut resized = Image::new(width, height, fill)?;
        let copy_w = self.width.min(width) as usize;
        let copy_h = self.height.min(height) as usize;
        blit(
            copy_w,
            copy_h,
            &self.pixels,
            self.width as usize,
            &mut resized.pixels,
            width as usize,
        );
        *self = resized;
        Ok(())
    }

    /// Copy a `width x height` block from `src` (rows `stride` pixels apart)
    /// so its top-left corner lands on `(x, y)`.
    pub fn blit_from(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        src: &[Color],
        stride: u32,
    ) -> Result<(), ImageError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        let fits_x = x.checked_add(width).is_some_and(|x2| x2 <= self.width);
        let fits_y = y.checked_add(height).is_some_and(|y2| y2 <= self.height);
        if !fits_x || !fits_y {
            return Err(ImageError::OutOfBounds {
                x,
                y,
                width,
                height,
                image_width: self.width,
                image_height: self.height,
            });
        }
        let needed = (height as usize - 1) * stride as usize + width as usize;
        if stride < width || src.len() < needed {
            return Err(ImageError::SourceTooSmall {
                len: src.len(),
                width,
                height,
                stride,
            });
        }
        let offset = y as usize * self.width as usize + x as usize;
        blit(
            width as usize,
            height as usize,
            src,
            stride as usize,
            &mut self.pixels[offset..],
            self.width as usize,
        );
        Ok(())
    }
}

fn pixel_count(width: u32, height: u32) -> Result<usize, ImageError> {
    (width as usize)
        .checked_mul(height as usize)
        .ok_or(ImageError::OutOfMemory { width, height })
}
