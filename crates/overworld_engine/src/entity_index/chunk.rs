//! World-space to chunk-grid mapping.
//!
//! The grid is `2^grid_bits` chunks per axis and wraps around: chunk
//! coordinates are masked, so positions `2^(grid_bits + chunk_width_bits)`
//! apart land in the same chunk. Far-apart entities can therefore share a
//! chunk; the per-entry bounds check in search filters them out.

use crate::config::EntityIndexConfig;
use overworld_core::Bounds;

pub type ChunkId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkGrid {
    chunk_width_bits: u32,
    grid_bits: u32,
}

impl ChunkGrid {
    pub fn new(config: &EntityIndexConfig) -> Self {
        Self {
            chunk_width_bits: config.chunk_width_bits,
            grid_bits: config.grid_bits,
        }
    }

    #[inline]
    fn grid_size(&self) -> u64 {
        1 << self.grid_bits
    }

    #[inline]
    fn mask(&self) -> u32 {
        (1 << self.grid_bits) - 1
    }

    /// Chunk id of the chunk holding world point `(x, y)`.
    pub fn chunk_at(&self, x: f32, y: f32) -> ChunkId {
        let cx = ((x.floor() as i64) >> self.chunk_width_bits) as u32 & self.mask();
        let cy = ((y.floor() as i64) >> self.chunk_width_bits) as u32 & self.mask();
        cx | (cy << self.grid_bits)
    }

    /// Chunks overlapped by `bounds`. Rectangles without area cover nothing.
    pub fn span(&self, bounds: &Bounds) -> ChunkSpan {
        if !bounds.has_area() {
            return ChunkSpan::EMPTY;
        }
        let x = self.axis(bounds.x1, bounds.x2);
        let y = self.axis(bounds.y1, bounds.y2);
        ChunkSpan {
            x,
            y,
            mask: self.mask(),
            grid_bits: self.grid_bits,
        }
    }

    /// First chunk coordinate and chunk count along one axis for `[lo, hi)`.
    ///
    /// `hi` is an exclusive edge: the last chunk is the one holding the last
    /// integer unit strictly inside the range.
    fn axis(&self, lo: f32, hi: f32) -> AxisSpan {
        let first = (lo.floor() as i64) >> self.chunk_width_bits;
        let last = ((hi.ceil() as i64).saturating_sub(1)) >> self.chunk_width_bits;
        let count = last.saturating_sub(first).saturating_add(1).max(1) as u64;
        AxisSpan {
            first,
            count: count.min(self.grid_size()) as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AxisSpan {
    first: i64,
    count: u32,
}

impl AxisSpan {
    #[inline]
    fn coord(&self, k: u32, mask: u32) -> u32 {
        self.first.wrapping_add(k as i64) as u32 & mask
    }

    #[inline]
    fn covers(&self, c: u32, mask: u32) -> bool {
        (c.wrapping_sub(self.first as u32) & mask) < self.count
    }
}

/// Rectangular block of chunk ids, wrapped onto the grid. Never yields the
/// same id twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    x: AxisSpan,
    y: AxisSpan,
    mask: u32,
    grid_bits: u32,
}

impl ChunkSpan {
    pub const EMPTY: ChunkSpan = ChunkSpan {
        x: AxisSpan { first: 0, count: 0 },
        y: AxisSpan { first: 0, count: 0 },
        mask: 0,
        grid_bits: 0,
    };

    #[inline]
    pub fn len(&self) -> usize {
        self.x.count as usize * self.y.count as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, chunk_id: ChunkId) -> bool {
        let cx = chunk_id & self.mask;
        let cy = (chunk_id >> self.grid_bits) & self.mask;
        self.x.covers(cx, self.mask) && self.y.covers(cy, self.mask)
    }

    pub fn iter(&self) -> impl Iterator<Item = ChunkId> + '_ {
        (0..self.y.count).flat_map(move |j| {
            let cy = self.y.coord(j, self.mask);
            (0..self.x.count).map(move |i| self.x.coord(i, self.mask) | (cy << self.grid_bits))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn grid(chunk_width_bits: u32, grid_bits: u32) -> ChunkGrid {
        ChunkGrid::new(&EntityIndexConfig {
            chunk_width_bits,
            grid_bits,
        })
    }

    #[test]
    fn exclusive_edge_stays_in_one_chunk() {
        let grid = grid(5, 8);
        let span = grid.span(&Bounds::new(0.0, 0.0, 32.0, 32.0));
        assert_eq!(span.iter().collect::<Vec<_>>(), vec![0]);

        let span = grid.span(&Bounds::new(0.0, 0.0, 32.5, 16.0));
        assert_eq!(span.iter().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn ids_pack_x_then_y() {
        let grid = grid(5, 8);
        assert_eq!(grid.chunk_at(33.0, 0.0), 1);
        assert_eq!(grid.chunk_at(0.0, 33.0), 1 << 8);
        let span = grid.span(&Bounds::new(40.0, 70.0, 41.0, 71.0));
        assert_eq!(span.iter().collect::<Vec<_>>(), vec![grid.chunk_at(40.0, 70.0)]);
    }

    #[test]
    fn negative_coordinates_wrap() {
        let grid = grid(5, 8);
        // -1 falls into chunk -1, which wraps to column 255
        assert_eq!(grid.chunk_at(-1.0, 0.0), 255);
        let span = grid.span(&Bounds::new(-1.0, 0.0, 1.0, 1.0));
        assert_eq!(span.iter().collect::<Vec<_>>(), vec![255, 0]);
    }

    #[test]
    fn huge_bounds_cover_grid_once() {
        let grid = grid(2, 3);
        let span = grid.span(&Bounds::new(-1.0e9, -1.0e9, 1.0e9, 1.0e9));
        assert_eq!(span.len(), 64);
        let unique: HashSet<ChunkId> = span.iter().collect();
        assert_eq!(unique.len(), 64);

        let span = grid.span(&Bounds::new(f32::MIN, 0.0, f32::MAX, 1.0));
        assert_eq!(span.len(), 8);
    }

    #[test]
    fn zero_area_covers_nothing() {
        let grid = grid(5, 8);
        assert!(grid.span(&Bounds::new(3.0, 3.0, 3.0, 40.0)).is_empty());
        assert_eq!(grid.span(&Bounds::ZERO).iter().count(), 0);
    }

    #[test]
    fn contains_agrees_with_iter() {
        let grid = grid(2, 3);
        for bounds in [
            Bounds::new(5.0, 5.0, 13.0, 6.0),
            Bounds::new(-6.0, 28.0, 3.0, 36.0),
            Bounds::new(-1.0e9, 0.0, 1.0e9, 1.0),
        ] {
            let span = grid.span(&bounds);
            let covered: HashSet<ChunkId> = span.iter().collect();
            for chunk_id in 0..64 {
                assert_eq!(span.contains(chunk_id), covered.contains(&chunk_id), "{bounds} {chunk_id}");
            }
        }
        assert!(!ChunkSpan::EMPTY.contains(0));
    }
}
