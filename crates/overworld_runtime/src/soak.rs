//! Headless workload: a field of moving entities queried every frame, plus a
//! glyph cache churning through the atlas.

use anyhow::{ensure, Result};
use overworld_core::math::DeterministicRng;
use overworld_core::{Bounds, Color};
use overworld_engine::{
    atlas_metrics_snapshot, entity_index_metrics_snapshot, reset_atlas_metrics,
    reset_entity_index_metrics, AtlasMetrics, EngineConfig, EngineError, Entity, EntityId,
    EntityIndex, EntityIndexMetrics, EntitySearch, EntitySprite, Tagset, TextureAtlas,
    TextureUpload,
};
use std::time::{Duration, Instant};

const TAG_MOVING: u32 = 0;
const TAG_RARE: u32 = 7;

#[derive(Debug, Clone)]
pub struct SoakSettings {
    pub seed: u64,
    /// Entities per side of the square field.
    pub grid_side: u32,
    pub spacing: f32,
    pub frames: u32,
    /// One in `move_every` entities moves each frame.
    pub move_every: u32,
    pub glyphs: u32,
}

impl Default for SoakSettings {
    fn default() -> Self {
        Self {
            seed: 0x0b5e_55ed,
            grid_side: 64,
            spacing: 24.0,
            frames: 120,
            move_every: 8,
            glyphs: 256,
        }
    }
}

#[derive(Debug)]
pub struct SoakReport {
    pub entities: usize,
    pub vertices: usize,
    pub small_search_hits: u64,
    pub large_search_hits: u64,
    pub elapsed: Duration,
    pub atlas_size: (u32, u32),
    pub atlas_uploads: u32,
    pub index_metrics: EntityIndexMetrics,
    pub atlas_metrics: AtlasMetrics,
}

impl SoakReport {
    pub fn log(&self) {
        tracing::info!(
            entities = self.entities,
            vertices = self.vertices,
            small_hits = self.small_search_hits,
            large_hits = self.large_search_hits,
            elapsed_ms = self.elapsed.as_secs_f64() * 1000.0,
            "entity index soak finished"
        );
        tracing::info!(
            width = self.atlas_size.0,
            height = self.atlas_size.1,
            uploads = self.atlas_uploads,
            "atlas soak finished"
        );
        if overworld_metrics::enabled() {
            tracing::info!(metrics = ?self.index_metrics, "entity index metrics");
            tracing::info!(metrics = ?self.atlas_metrics, "atlas metrics");
        }
    }
}

/// Counts uploads instead of talking to a GPU.
#[derive(Debug, Default)]
struct HeadlessTexture {
    uploads: u32,
}

impl TextureUpload for HeadlessTexture {
    fn upload(&mut self, width: u32, height: u32, pixels: &[Color]) -> Result<(), EngineError> {
        if pixels.len() != width as usize * height as usize {
            return Err(EngineError::Upload(format!(
                "{} pixels for {width}x{height} texture",
                pixels.len()
            )));
        }
        self.uploads += 1;
        Ok(())
    }
}

pub fn run(config: &EngineConfig, settings: &SoakSettings) -> Result<SoakReport> {
    reset_entity_index_metrics();
    reset_atlas_metrics();
    let mut rng = DeterministicRng::new(settings.seed);
    let started = Instant::now();

    let mut index = EntityIndex::with_config(config.entity_index)?;
    populate(&mut index, settings, &mut rng)?;
    let entities = index.count();
    ensure!(
        entities == (settings.grid_side * settings.grid_side) as usize,
        "expected one slot per entity, got {entities}"
    );

    let mut out: Vec<EntityId> = vec![0; entities];
    let mut small_search_hits = 0;
    let mut large_search_hits = 0;
    let mut vertices = 0;
    let world = settings.grid_side as f32 * settings.spacing;

    for frame in 0..settings.frames {
        move_some(&mut index, settings, frame, &mut rng)?;

        // neighbourhood query around a random entity
        let subject = rng.next_below(entities as u32);
        if let Some(entity) = index.get(subject) {
            let b = entity.collider.bounds;
            let around = Bounds::new(b.x1 - 32.0, b.y1 - 32.0, b.x2 + 32.0, b.y2 + 32.0);
            let query = EntitySearch::new(around).excluding(subject);
            small_search_hits += index.search(&query, &mut out) as u64;
        }

        // screen-sized query for rare-tagged entities
        let x = rng.next_range(0.0, world * 0.5);
        let y = rng.next_range(0.0, world * 0.5);
        let query = EntitySearch::new(Bounds::from_size(x, y, world * 0.5, world * 0.5))
            .with_tags(Tagset::from_tags(&[TAG_RARE]));
        large_search_hits += index.search(&query, &mut out) as u64;

        vertices = index.all_vertices().len();
    }
    index.check_consistency()?;

    let (atlas_size, atlas_uploads) = churn_glyphs(config, settings, &mut rng)?;

    Ok(SoakReport {
        entities,
        vertices,
        small_search_hits,
        large_search_hits,
        elapsed: started.elapsed(),
        atlas_size,
        atlas_uploads,
        index_metrics: entity_index_metrics_snapshot(),
        atlas_metrics: atlas_metrics_snapshot(),
    })
}

fn populate(index: &mut EntityIndex, settings: &SoakSettings, rng: &mut DeterministicRng) -> Result<()> {
    let side = settings.grid_side;
    for row in 0..side {
        for col in 0..side {
            let id = row * side + col;
            let x = col as f32 * settings.spacing;
            let y = row as f32 * settings.spacing;
            let size = 4.0 + rng.next_below(12) as f32;
            let mut tags = vec![TAG_MOVING];
            if id % 32 == 0 {
                tags.push(TAG_RARE);
            }
            let sprite = EntitySprite {
                texture_bounds: Bounds::new(0.0, 0.0, 1.0, 1.0),
                depth: (id % 4) as f32,
                ..Default::default()
            };
            let entity = Entity::new(id, Bounds::from_size(x, y, size, size))
                .with_tags(Tagset::from_tags(&tags))
                .with_sprite(sprite);
            index.set(&entity)?;
        }
    }
    tracing::debug!(entities = index.count(), "populated entity field");
    Ok(())
}

fn move_some(
    index: &mut EntityIndex,
    settings: &SoakSettings,
    frame: u32,
    rng: &mut DeterministicRng,
) -> Result<()> {
    let total = settings.grid_side * settings.grid_side;
    let phase = frame % settings.move_every.max(1);
    for id in (phase..total).step_by(settings.move_every.max(1) as usize) {
        let Some(entity) = index.get(id) else {
            continue;
        };
        let b = entity.collider.bounds;
        let dx = rng.next_range(-6.0, 6.0).round();
        let dy = rng.next_range(-6.0, 6.0).round();
        index.set_bounds(id, Bounds::new(b.x1 + dx, b.y1 + dy, b.x2 + dx, b.y2 + dy))?;
    }
    Ok(())
}

/// Pack glyph bitmaps, evicting and re-rasterizing some each round.
fn churn_glyphs(
    config: &EngineConfig,
    settings: &SoakSettings,
    rng: &mut DeterministicRng,
) -> Result<((u32, u32), u32)> {
    let mut atlas = TextureAtlas::with_config(HeadlessTexture::default(), config.atlas)?;
    let bitmap = vec![Color::WHITE; 32 * 32];

    for round in 0..4 {
        for glyph in 0..settings.glyphs {
            if round > 0 && rng.next_below(3) != 0 {
                continue;
            }
            if round > 0 && glyph % 5 == 0 {
                atlas.reset_region(glyph)?;
                continue;
            }
            let width = 4 + rng.next_below(28);
            let height = 8 + rng.next_below(24);
            atlas.set_region(glyph, width, height, &bitmap, 32)?;
        }
        atlas.flush()?;
    }

    let live: Vec<Bounds> = atlas.atlas().live_regions().map(|(_, b)| b).collect();
    for (i, a) in live.iter().enumerate() {
        ensure!(
            live[i + 1..].iter().all(|b| !a.collides(b)),
            "atlas region {a} overlaps another region"
        );
    }
    Ok(((atlas.width(), atlas.height()), atlas.texture().uploads))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_soak_completes() {
        let settings = SoakSettings {
            grid_side: 12,
            frames: 10,
            glyphs: 32,
            ..Default::default()
        };
        let report = run(&EngineConfig::default(), &settings).unwrap();
        assert_eq!(report.entities, 144);
        assert_eq!(report.vertices, 144 * 6);
        assert!(report.atlas_size.1 > 1);
        assert!(report.atlas_uploads >= 1);
    }

    #[test]
    fn runs_with_small_grid_config() {
        let config = EngineConfig::from_json_str(
            r#"{ "entity_index": { "chunk_width_bits": 3, "grid_bits": 4 } }"#,
        )
        .unwrap();
        let settings = SoakSettings {
            grid_side: 10,
            frames: 5,
            glyphs: 8,
            ..Default::default()
        };
        let report = run(&config, &settings).unwrap();
        assert_eq!(report.entities, 100);
    }
}
