//! Atlas paired with a GPU texture that mirrors its image.

use crate::atlas::{Atlas, AtlasRegionId};
use crate::config::AtlasConfig;
use crate::error::EngineError;
use overworld_core::{Bounds, Color};

/// Backend that receives the atlas image. Implemented by the renderer.
pub trait TextureUpload {
    /// Replace the whole texture with `pixels` (row-major, `width` per row).
    fn upload(&mut self, width: u32, height: u32, pixels: &[Color]) -> Result<(), EngineError>;
}

/// [`Atlas`] plus the texture it is drawn from. Packing marks the texture
/// stale; [`flush`](TextureAtlas::flush) brings it up to date.
pub struct TextureAtlas<U: TextureUpload> {
    atlas: Atlas,
    texture: U,
    dirty: bool,
}

impl<U: TextureUpload> TextureAtlas<U> {
    /// Create a texture atlas with the default size limits. The first
    /// flush uploads the placeholder.
    pub fn new(texture: U) -> Self {
        Self {
            atlas: Atlas::new(),
            texture,
            // placeholder image has never been uploaded
            dirty: true,
        }
    }

    pub fn with_config(texture: U, config: AtlasConfig) -> Result<Self, EngineError> {
        Ok(Self {
            atlas: Atlas::with_config(config)?,
            texture,
            dirty: true,
        })
    }

    /// Pack `pixels` as region `id`; see [`Atlas::set_region`].
    pub fn set_region(
        &mut self,
        id: AtlasRegionId,
        width: u32,
        height: u32,
        pixels: &[Color],
        stride: u32,
    ) -> Result<(), EngineError> {
        self.atlas.set_region(id, width, height, pixels, stride)?;
        self.dirty = true;
        Ok(())
    }

    /// Freeing space leaves the texture contents valid, so no upload is
    /// scheduled.
    pub fn reset_region(&mut self, id: AtlasRegionId) -> Result<(), EngineError> {
        self.atlas.reset_region(id)
    }

    /// Push the image to the texture if anything was packed since the last
    /// flush. Returns whether an upload happened.
    pub fn flush(&mut self) -> Result<bool, EngineError> {
        if !self.dirty {
            return Ok(false);
        }
        self.texture
            .upload(self.atlas.width(), self.atlas.height(), self.atlas.pixels())
            .inspect_err(|err| tracing::error!(%err, "atlas texture upload failed"))?;
        self.dirty = false;
        tracing::debug!(
            width = self.atlas.width(),
            height = self.atlas.height(),
            "uploaded atlas texture"
        );
        Ok(true)
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn region_bounds(&self, id: AtlasRegionId) -> Option<Bounds> {
        self.atlas.region_bounds(id)
    }

    /// Region bounds scaled into `[0, 1]` texture space.
    pub fn region_uv(&self, id: AtlasRegionId) -> Option<Bounds> {
        let bounds = self.atlas.region_bounds(id)?;
        let (w, h) = (self.atlas.width() as f32, self.atlas.height() as f32);
        Some(Bounds::new(bounds.x1 / w, bounds.y1 / h, bounds.x2 / w, bounds.y2 / h))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.atlas.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.atlas.height()
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.atlas.count()
    }

    #[inline]
    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    #[inline]
    pub fn texture(&self) -> &U {
        &self.texture
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingTexture {
        uploads: Vec<(u32, u32, usize)>,
        fail: bool,
    }

    impl TextureUpload for RecordingTexture {
        fn upload(&mut self, width: u32, height: u32, pixels: &[Color]) -> Result<(), EngineError> {
            if self.fail {
                return Err(EngineError::Upload("device lost".into()));
            }
            self.uploads.push((width, height, pixels.len()));
            Ok(())
        }
    }

    #[test]
    fn flush_uploads_only_when_dirty() {
        let mut atlas = TextureAtlas::new(RecordingTexture::default());
        assert!(atlas.flush().unwrap());
        assert!(!atlas.flush().unwrap());

        atlas.set_region(0, 2, 2, &[Color::RED; 4], 2).unwrap();
        assert!(atlas.is_dirty());
        assert!(atlas.flush().unwrap());
        atlas.reset_region(0).unwrap();
        assert!(!atlas.flush().unwrap());

        let uploads = &atlas.texture().uploads;
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0], (1, 1, 1));
        assert_eq!(uploads[1], (2, 3, 6));
    }

    #[test]
    fn failed_upload_stays_dirty() {
        let texture = RecordingTexture {
            fail: true,
            ..Default::default()
        };
        let mut atlas = TextureAtlas::new(texture);
        assert!(matches!(atlas.flush(), Err(EngineError::Upload(_))));
        assert!(atlas.is_dirty());
    }

    #[test]
    fn region_uv_is_normalized() {
        let mut atlas = TextureAtlas::new(RecordingTexture::default());
        atlas.set_region(5, 4, 2, &[Color::BLUE; 8], 4).unwrap();
        // 4x3 image, region on rows 1..3
        let uv = atlas.region_uv(5).unwrap();
        assert_eq!(uv, Bounds::new(0.0, 1.0 / 3.0, 1.0, 1.0));
        assert_eq!(atlas.count(), 6);
        assert_eq!(atlas.region_uv(6), None);
    }
}
