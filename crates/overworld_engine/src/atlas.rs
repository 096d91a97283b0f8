//! Rectangle packer backed by a single growable image.
//!
//! Placement is first-fit over a list of free rectangles. The chosen free
//! rectangle is cut guillotine-style: the allocation takes its top-left
//! corner, the strip to the right of the allocation (same height) and the
//! full-width strip below become new free rectangles. When nothing fits the
//! image grows downward by the requested height (vertical shelf); existing
//! regions never move.

use crate::config::AtlasConfig;
use crate::error::EngineError;
use overworld_core::bounds::F32_EXACT_INT_MAX;
use overworld_core::{Bounds, Color, Image, ImageError};
use overworld_metrics::{metrics, Counter};

pub type AtlasRegionId = u32;

/// Region ids are dense indices; keep them addressable as `i32`.
pub const MAX_REGION_ID: AtlasRegionId = i32::MAX as AtlasRegionId;

/// Most free rectangles one `set_region` holds at once beyond its starting
/// list: the released region plus the two leftovers of a split. A freshly
/// grown shelf is exactly as tall as the request, so splitting it leaves no
/// strip below and the shelf takes the second leftover's place.
const FREE_LIST_RESERVE: usize = 3;

static REGIONS_PLACED: Counter = Counter::new();
static FREE_LIST_HITS: Counter = Counter::new();
static GROWTHS: Counter = Counter::new();
static FREE_LIST_HIGH_WATER: Counter = Counter::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtlasMetrics {
    pub regions_placed: u64,
    pub free_list_hits: u64,
    pub growths: u64,
    pub free_list_high_water: u64,
}

pub fn atlas_metrics_snapshot() -> AtlasMetrics {
    AtlasMetrics {
        regions_placed: REGIONS_PLACED.get(),
        free_list_hits: FREE_LIST_HITS.get(),
        growths: GROWTHS.get(),
        free_list_high_water: FREE_LIST_HIGH_WATER.get(),
    }
}

pub fn reset_atlas_metrics() {
    for counter in [&REGIONS_PLACED, &FREE_LIST_HITS, &GROWTHS, &FREE_LIST_HIGH_WATER] {
        counter.reset();
    }
}

/// Packed image plus one rectangle per region id.
///
/// Region ids are dense: touching id `n` creates empty records for every
/// lower id.
#[derive(Debug, Clone)]
pub struct Atlas {
    config: AtlasConfig,
    image: Image,
    regions: Vec<Bounds>,
    free_regions: Vec<Bounds>,
}

impl Default for Atlas {
    fn default() -> Self {
        Self::build(AtlasConfig::default())
    }
}

impl Atlas {
    /// Empty atlas holding a 1x1 white placeholder image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an atlas bounded by `config`.
    pub fn with_config(config: AtlasConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: AtlasConfig) -> Self {
        Self {
            config,
            image: Image::single(Color::WHITE),
            regions: Vec::new(),
            free_regions: Vec::new(),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Number of region records (highest id used + 1).
    #[inline]
    pub fn count(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    pub fn image(&self) -> &Image {
        &self.image
    }

    #[inline]
    pub fn pixels(&self) -> &[Color] {
        self.image.pixels()
    }

    #[inline]
    pub fn free_regions(&self) -> &[Bounds] {
        &self.free_regions
    }

    /// Current rectangle of `id`; zero extent when empty. `None` for ids
    /// never touched.
    pub fn region_bounds(&self, id: AtlasRegionId) -> Option<Bounds> {
        self.regions.get(id as usize).copied()
    }

    /// Regions currently holding pixels.
    pub fn live_regions(&self) -> impl Iterator<Item = (AtlasRegionId, Bounds)> + '_ {
        self.regions
            .iter()
            .enumerate()
            .filter(|(_, bounds)| bounds.has_area())
            .map(|(id, bounds)| (id as AtlasRegionId, *bounds))
    }

    /// Pack a `width x height` block of `pixels` (rows `stride` pixels apart)
    /// as region `id`, replacing whatever `id` held before.
    ///
    /// A zero `width` or `height` leaves the region empty. If the atlas would
    /// have to grow past its configured maximum, the call fails with
    /// [`EngineError::AtlasFull`] and `id` keeps its previous rectangle.
    pub fn set_region(
        &mut self,
        id: AtlasRegionId,
        width: u32,
        height: u32,
        pixels: &[Color],
        stride: u32,
    ) -> Result<(), EngineError> {
        validate_source(width, height, pixels, stride)?;
        self.ensure_region(id)?;
        self.free_regions
            .try_reserve(FREE_LIST_RESERVE)
            .map_err(|_| oom("reserving free regions"))?;

        let previous = self.regions[id as usize];
        let free_len = self.free_regions.len();
        self.release(id);

        if width == 0 || height == 0 {
            return Ok(());
        }

        // Pixels go in before the free list is cut, so a failure only has
        // the release to undo.
        let placed = self.find_free_region(width, height).and_then(|free_idx| {
            let free = self.free_regions[free_idx];
            self.image
                .blit_from(free.x1 as u32, free.y1 as u32, width, height, pixels, stride)?;
            Ok(free_idx)
        });
        let free_idx = match placed {
            Ok(free_idx) => free_idx,
            Err(err) => {
                self.unrelease(id, previous, free_len);
                return Err(err);
            }
        };
        let bounds = self.allocate(free_idx, width, height);
        self.regions[id as usize] = bounds;

        metrics! {
            REGIONS_PLACED.increment(1);
            FREE_LIST_HIGH_WATER.record_max(self.free_regions.len() as u64);
        }
        tracing::trace!(id, %bounds, "placed atlas region");
        Ok(())
    }

    /// Give the region's space back to the free list and collapse it to zero
    /// extent at its origin. Resetting an empty region does nothing.
    pub fn reset_region(&mut self, id: AtlasRegionId) -> Result<(), EngineError> {
        self.ensure_region(id)?;
        self.free_regions
            .try_reserve(1)
            .map_err(|_| oom("reserving free regions"))?;
        self.release(id);
        Ok(())
    }

    fn release(&mut self, id: AtlasRegionId) {
        let region = &mut self.regions[id as usize];
        if region.has_area() {
            self.free_regions.push(*region);
        }
        *region = region.collapsed();
    }

    /// Undo `release(id)` made when the free list was `free_len` long. A
    /// shelf grown since then stays free.
    fn unrelease(&mut self, id: AtlasRegionId, previous: Bounds, free_len: usize) {
        if previous.has_area() {
            self.free_regions.remove(free_len);
        }
        self.regions[id as usize] = previous;
    }

    fn ensure_region(&mut self, id: AtlasRegionId) -> Result<(), EngineError> {
        if id > MAX_REGION_ID {
            tracing::error!(id, max = MAX_REGION_ID, "atlas region id out of range");
            return Err(EngineError::RegionOutOfRange { id });
        }
        let needed = id as usize + 1;
        if needed > self.regions.len() {
            self.regions
                .try_reserve(needed - self.regions.len())
                .map_err(|_| oom("growing region table"))?;
            self.regions.resize(needed, Bounds::ZERO);
        }
        Ok(())
    }

    /// First free rectangle that fits, growing the image if none does.
    fn find_free_region(&mut self, width: u32, height: u32) -> Result<usize, EngineError> {
        let (w, h) = (width as f32, height as f32);
        if let Some(idx) = self
            .free_regions
            .iter()
            .position(|free| free.width() >= w && free.height() >= h)
        {
            metrics! {
                FREE_LIST_HITS.increment(1);
            }
            return Ok(idx);
        }
        self.grow(width, height)
    }

    /// Append a shelf `height` rows tall below the current image and return
    /// its index in the free list.
    fn grow(&mut self, width: u32, height: u32) -> Result<usize, EngineError> {
        let old_height = self.image.height();
        let new_width = self.image.width().max(width);
        let new_height = old_height.saturating_add(height);
        if new_width > self.config.max_width || new_height > self.config.max_height {
            tracing::warn!(
                width,
                height,
                new_width,
                new_height,
                max_width = self.config.max_width,
                max_height = self.config.max_height,
                "atlas full"
            );
            return Err(EngineError::AtlasFull {
                width: new_width,
                height: new_height,
                max_width: self.config.max_width,
                max_height: self.config.max_height,
            });
        }

        self.image
            .resize(new_width, new_height, Color::TRANSPARENT)
            .map_err(|err| match err {
                ImageError::OutOfMemory { .. } => oom("growing atlas image"),
                other => EngineError::from(other),
            })?;
        self.free_regions.push(Bounds::new(
            0.0,
            old_height as f32,
            new_width as f32,
            new_height as f32,
        ));

        metrics! {
            GROWTHS.increment(1);
        }
        tracing::debug!(new_width, new_height, "grew atlas");
        Ok(self.free_regions.len() - 1)
    }

    /// Carve `width x height` out of the top-left of free region `free_idx`.
    fn allocate(&mut self, free_idx: usize, width: u32, height: u32) -> Bounds {
        let free = self.free_regions[free_idx];
        let (w, h) = (width as f32, height as f32);
        let allocated = Bounds::new(free.x1, free.y1, free.x1 + w, free.y1 + h);
        let right = Bounds::new(free.x1 + w, free.y1, free.x2, free.y1 + h);
        let below = Bounds::new(free.x1, free.y1 + h, free.x2, free.y2);
        debug_assert!(free.contains(&allocated));

        for leftover in [right, below] {
            if leftover.has_area() {
                self.free_regions.push(leftover);
            }
        }
        self.free_regions.swap_remove(free_idx);
        allocated
    }
}

fn validate_source(width: u32, height: u32, pixels: &[Color], stride: u32) -> Result<(), EngineError> {
    if width > F32_EXACT_INT_MAX || height > F32_EXACT_INT_MAX {
        tracing::error!(width, height, "atlas region too large");
        return Err(EngineError::InvalidRegionSize {
            width,
            height,
            max: F32_EXACT_INT_MAX,
        });
    }
    if width == 0 || height == 0 {
        return Ok(());
    }
    if stride < width {
        tracing::error!(stride, width, "atlas source stride smaller than width");
        return Err(EngineError::InvalidStride { stride, width });
    }
    let needed = (height as usize - 1) * stride as usize + width as usize;
    if pixels.len() < needed {
        tracing::error!(len = pixels.len(), needed, "atlas source too small");
        return Err(EngineError::SourceTooSmall {
            len: pixels.len(),
            needed,
        });
    }
    Ok(())
}

fn oom(context: &'static str) -> EngineError {
    tracing::error!(context, "atlas allocation failed");
    EngineError::OutOfMemory { context }
}
