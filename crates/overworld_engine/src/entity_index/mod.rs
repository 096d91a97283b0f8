//! Spatial entity index.
//!
//! Entities are stored densely in slots (one per id ever seen). Two derived
//! indices point back at the slots:
//!
//! - **chunks**: one bucket per grid chunk the collider bounds overlap
//! - **tags**: one bucket per tag set on the collider
//!
//! Each slot remembers, per membership, which bucket it is in and at what
//! position. Buckets drop entries by swap-pop, so whenever an entry is moved
//! the moved entity's back-reference for that bucket is repointed.
//!
//! Collider updates never assume old and new memberships coincide: every
//! membership derived from the old state is removed, then the new ones are
//! inserted. All capacity needed for the insert is reserved up front, so an
//! allocation failure leaves the previous state untouched.

mod chunk;
mod metrics;
mod search;

pub use chunk::{ChunkGrid, ChunkId, ChunkSpan};
pub use metrics::{entity_index_metrics_snapshot, reset_entity_index_metrics, EntityIndexMetrics};

use crate::config::EntityIndexConfig;
use crate::entity::{Entity, EntityCollider, EntityId, EntitySprite};
use crate::error::EngineError;
use crate::tagset::{TagId, Tagset, TAG_ID_COUNT};
use overworld_core::{Bounds, Bucket, Relocation, Vertex, QUAD_VERTEX_COUNT};
use overworld_metrics::metrics;
use std::collections::HashMap;

/// Membership record: the bucket an entity is in and its position there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BackRef {
    bucket: u32,
    position: u32,
}

/// Chunk bucket entry. Carries a copy of the collider so a search can test
/// candidates without touching the slot table.
#[derive(Debug, Clone, Copy)]
struct ChunkEntry {
    slot: u32,
    id: EntityId,
    bounds: Bounds,
    tagset: Tagset,
    /// Entity sits in more than one chunk and may be seen twice by a search.
    shared: bool,
}

#[derive(Debug, Clone)]
struct Slot {
    entity: Entity,
    chunk_refs: Vec<BackRef>,
    tag_refs: Vec<BackRef>,
    vertices: [Vertex; QUAD_VERTEX_COUNT],
}

impl Slot {
    fn new(id: EntityId) -> Self {
        let mut entity = Entity::default();
        entity.collider.id = id;
        Self {
            entity,
            chunk_refs: Vec::new(),
            tag_refs: Vec::new(),
            vertices: [Vertex::default(); QUAD_VERTEX_COUNT],
        }
    }

    fn refresh_vertices(&mut self) {
        let sprite = &self.entity.sprite;
        self.vertices = Vertex::quad(
            &self.entity.collider.bounds,
            &sprite.texture_bounds,
            sprite.color,
            sprite.depth,
        );
        for vertex in &mut self.vertices {
            vertex.transform(&sprite.transform);
        }
    }

    #[inline]
    fn is_drawable(&self) -> bool {
        self.entity.collider.bounds.has_area()
    }
}

/// Entities keyed by id, searchable by area and tags.
pub struct EntityIndex {
    config: EntityIndexConfig,
    grid: ChunkGrid,
    slots: Vec<Slot>,
    slot_by_id: HashMap<EntityId, u32>,
    chunks: HashMap<ChunkId, Bucket<ChunkEntry>>,
    tags: Vec<Bucket<u32>>,
    draw_vertices: Vec<Vertex>,
    draw_dirty: bool,
}

impl Default for EntityIndex {
    fn default() -> Self {
        Self::build(EntityIndexConfig::default())
    }
}

impl EntityIndex {
    /// Create an index with the default chunk grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index over a custom chunk grid.
    pub fn with_config(config: EntityIndexConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EntityIndexConfig) -> Self {
        tracing::debug!(
            chunk_width_bits = config.chunk_width_bits,
            grid_bits = config.grid_bits,
            "created entity index"
        );
        Self {
            config,
            grid: ChunkGrid::new(&config),
            slots: Vec::new(),
            slot_by_id: HashMap::new(),
            chunks: HashMap::new(),
            tags: (0..TAG_ID_COUNT).map(|_| Bucket::new()).collect(),
            draw_vertices: Vec::new(),
            draw_dirty: false,
        }
    }

    #[inline]
    pub fn config(&self) -> &EntityIndexConfig {
        &self.config
    }

    #[inline]
    pub fn grid(&self) -> &ChunkGrid {
        &self.grid
    }

    /// Number of slots ever created, including entities that no longer have
    /// any area. Upper bound for search result buffers.
    #[inline]
    pub fn count(&self) -> usize {
        self.slots.len()
    }

    /// Entity `id`, if it was ever set.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        let slot = *self.slot_by_id.get(&id)?;
        Some(&self.slots[slot as usize].entity)
    }

    /// Look up `id`, creating an empty entity (no area, no tags) if unseen.
    pub fn get_or_add(&mut self, id: EntityId) -> Result<&Entity, EngineError> {
        let slot = self.slot_for(id)?;
        Ok(&self.slots[slot as usize].entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.slots.iter().map(|slot| &slot.entity)
    }

    /// Insert or replace the whole entity.
    pub fn set(&mut self, entity: &Entity) -> Result<(), EngineError> {
        validate_collider(&entity.collider)?;
        validate_sprite(entity.collider.id, &entity.sprite)?;
        let slot = self.slot_for(entity.collider.id)?;
        self.replace_collider(slot, &entity.collider)?;
        let slot = &mut self.slots[slot as usize];
        slot.entity.sprite = entity.sprite;
        slot.refresh_vertices();
        self.draw_dirty = true;
        Ok(())
    }

    /// Replace the entity's bounds and tags, keeping its sprite.
    pub fn set_collider(&mut self, collider: &EntityCollider) -> Result<(), EngineError> {
        validate_collider(collider)?;
        let slot = self.slot_for(collider.id)?;
        self.replace_collider(slot, collider)
    }

    /// Replace how the entity is drawn. Search memberships are unaffected.
    pub fn set_sprite(&mut self, id: EntityId, sprite: &EntitySprite) -> Result<(), EngineError> {
        validate_sprite(id, sprite)?;
        let slot = self.slot_for(id)?;
        let slot = &mut self.slots[slot as usize];
        slot.entity.sprite = *sprite;
        slot.refresh_vertices();
        self.draw_dirty = true;
        Ok(())
    }

    /// Move or resize the entity, keeping its tags.
    pub fn set_bounds(&mut self, id: EntityId, bounds: Bounds) -> Result<(), EngineError> {
        let mut collider = self.get(id).map(|e| e.collider).unwrap_or(EntityCollider {
            id,
            ..Default::default()
        });
        collider.bounds = bounds;
        self.set_collider(&collider)
    }

    /// Replace the entity's tags with exactly `tag_ids`.
    pub fn set_tags(&mut self, id: EntityId, tag_ids: &[TagId]) -> Result<(), EngineError> {
        let mut tagset = Tagset::EMPTY;
        for &tag_id in tag_ids {
            tagset.set(tag_id, true)?;
        }
        self.set_tagset(id, tagset)
    }

    /// Replace the entity's tags, keeping its bounds.
    pub fn set_tagset(&mut self, id: EntityId, tagset: Tagset) -> Result<(), EngineError> {
        let mut collider = self.get(id).map(|e| e.collider).unwrap_or(EntityCollider {
            id,
            ..Default::default()
        });
        collider.tagset = tagset;
        self.set_collider(&collider)
    }

    /// Transformed quad of one entity, if it has area.
    pub fn vertices(&self, id: EntityId) -> Option<&[Vertex; QUAD_VERTEX_COUNT]> {
        let slot = &self.slots[*self.slot_by_id.get(&id)? as usize];
        slot.is_drawable().then_some(&slot.vertices)
    }

    /// Six vertices per entity with area, back to front (ascending depth,
    /// ties in slot order). Rebuilt lazily after mutations.
    pub fn all_vertices(&mut self) -> &[Vertex] {
        if self.draw_dirty {
            let mut vertices = std::mem::take(&mut self.draw_vertices);
            vertices.clear();
            self.append_vertices(&mut vertices);
            self.draw_vertices = vertices;
            self.draw_dirty = false;
        }
        &self.draw_vertices
    }

    /// Append every drawable quad to `out`, in `all_vertices` order.
    pub fn append_vertices(&self, out: &mut Vec<Vertex>) {
        let mut order: Vec<u32> = (0..self.slots.len() as u32)
            .filter(|&slot| self.slots[slot as usize].is_drawable())
            .collect();
        order.sort_by(|&a, &b| {
            let da = self.slots[a as usize].entity.sprite.depth;
            let db = self.slots[b as usize].entity.sprite.depth;
            da.total_cmp(&db).then(a.cmp(&b))
        });
        out.reserve(order.len() * QUAD_VERTEX_COUNT);
        for slot in order {
            out.extend_from_slice(&self.slots[slot as usize].vertices);
        }
    }

    fn slot_for(&mut self, id: EntityId) -> Result<u32, EngineError> {
        if let Some(&slot) = self.slot_by_id.get(&id) {
            return Ok(slot);
        }
        let slot = u32::try_from(self.slots.len()).map_err(|_| EngineError::OutOfMemory {
            context: "allocating entity slot",
        })?;
        self.slots.try_reserve(1).map_err(|_| oom("allocating entity slot"))?;
        self.slot_by_id
            .try_reserve(1)
            .map_err(|_| oom("allocating entity slot"))?;
        self.slots.push(Slot::new(id));
        self.slot_by_id.insert(id, slot);
        tracing::trace!(id, slot, "created entity slot");
        Ok(slot)
    }

    /// Swap every membership derived from the slot's current collider for
    /// the memberships of `collider`.
    fn replace_collider(&mut self, slot: u32, collider: &EntityCollider) -> Result<(), EngineError> {
        let span = self.grid.span(&collider.bounds);
        let tag_ids: Vec<TagId> = collider.tagset.iter().collect();

        // Reserve everything the insert needs before removing anything.
        let mut chunk_refs = Vec::new();
        chunk_refs
            .try_reserve_exact(span.len())
            .map_err(|_| oom("reserving chunk memberships"))?;
        let mut tag_refs = Vec::new();
        tag_refs
            .try_reserve_exact(tag_ids.len())
            .map_err(|_| oom("reserving tag memberships"))?;
        self.chunks
            .try_reserve(span.len())
            .map_err(|_| oom("reserving chunk table"))?;
        for chunk_id in span.iter() {
            if self.chunks.entry(chunk_id).or_default().try_reserve(1).is_err() {
                self.drop_empty_chunks();
                return Err(oom("reserving chunk bucket"));
            }
        }
        for &tag_id in &tag_ids {
            if self.tags[tag_id as usize].try_reserve(1).is_err() {
                self.drop_empty_chunks();
                return Err(oom("reserving tag bucket"));
            }
        }

        self.unset_chunks(slot, &span)?;
        self.unset_tags(slot)?;

        let shared = span.len() > 1;
        for chunk_id in span.iter() {
            let Some(bucket) = self.chunks.get_mut(&chunk_id) else {
                return Err(consistency(format!("chunk {chunk_id} vanished after reserve")));
            };
            let position = bucket.push(ChunkEntry {
                slot,
                id: collider.id,
                bounds: collider.bounds,
                tagset: collider.tagset,
                shared,
            });
            chunk_refs.push(BackRef {
                bucket: chunk_id,
                position: position as u32,
            });
        }
        for &tag_id in &tag_ids {
            let position = self.tags[tag_id as usize].push(slot);
            tag_refs.push(BackRef {
                bucket: tag_id,
                position: position as u32,
            });
        }

        let record = &mut self.slots[slot as usize];
        record.chunk_refs = chunk_refs;
        record.tag_refs = tag_refs;
        record.entity.collider = *collider;
        record.refresh_vertices();
        self.draw_dirty = true;

        metrics! {
            metrics::COLLIDER_UPDATES.increment(1);
        }
        tracing::trace!(
            id = collider.id,
            chunks = record.chunk_refs.len(),
            tags = record.tag_refs.len(),
            "updated entity memberships"
        );
        Ok(())
    }

    fn drop_empty_chunks(&mut self) {
        self.chunks.retain(|_, bucket| !bucket.is_empty());
    }

    /// Drop every chunk membership of `slot`. Buckets left empty are removed
    /// unless `keep` covers them; the caller refills those.
    fn unset_chunks(&mut self, slot: u32, keep: &ChunkSpan) -> Result<(), EngineError> {
        let refs = std::mem::take(&mut self.slots[slot as usize].chunk_refs);
        let slots = &mut self.slots;
        for back_ref in refs {
            let Some(bucket) = self.chunks.get_mut(&back_ref.bucket) else {
                return Err(consistency(format!(
                    "slot {slot} references missing chunk {}",
                    back_ref.bucket
                )));
            };
            let mut fixed = Ok(());
            let removed = bucket
                .swap_remove_with(back_ref.position as usize, |moved, relocation| {
                    fixed = repoint(&mut slots[moved.slot as usize].chunk_refs, back_ref.bucket, relocation);
                })
                .map_err(|err| consistency(format!("chunk {}: {err}", back_ref.bucket)))?;
            debug_assert_eq!(removed.slot, slot, "chunk entry belongs to another slot");
            fixed?;
            if bucket.is_empty() && !keep.contains(back_ref.bucket) {
                self.chunks.remove(&back_ref.bucket);
            }
            metrics! {
                metrics::MEMBERSHIP_REMOVALS.increment(1);
            }
        }
        Ok(())
    }

    fn unset_tags(&mut self, slot: u32) -> Result<(), EngineError> {
        let refs = std::mem::take(&mut self.slots[slot as usize].tag_refs);
        let slots = &mut self.slots;
        for back_ref in refs {
            let Some(bucket) = self.tags.get_mut(back_ref.bucket as usize) else {
                return Err(consistency(format!(
                    "slot {slot} references missing tag {}",
                    back_ref.bucket
                )));
            };
            let mut fixed = Ok(());
            let removed = bucket
                .swap_remove_with(back_ref.position as usize, |&moved, relocation| {
                    fixed = repoint(&mut slots[moved as usize].tag_refs, back_ref.bucket, relocation);
                })
                .map_err(|err| consistency(format!("tag {}: {err}", back_ref.bucket)))?;
            debug_assert_eq!(removed, slot, "tag entry belongs to another slot");
            fixed?;
            metrics! {
                metrics::MEMBERSHIP_REMOVALS.increment(1);
            }
        }
        Ok(())
    }

    /// Walk every membership and check that each back-reference points at an
    /// entry naming its own slot, and that buckets hold nothing else.
    pub fn check_consistency(&self) -> Result<(), EngineError> {
        let mut chunk_entries = 0;
        let mut tag_entries = 0;
        for (slot, record) in self.slots.iter().enumerate() {
            for back_ref in &record.chunk_refs {
                let entry = self
                    .chunks
                    .get(&back_ref.bucket)
                    .and_then(|bucket| bucket.get(back_ref.position as usize).ok());
                match entry {
                    Some(entry) if entry.slot as usize == slot => chunk_entries += 1,
                    _ => {
                        return Err(EngineError::Consistency(format!(
                            "slot {slot} chunk back-reference {back_ref:?} is stale"
                        )))
                    }
                }
            }
            for back_ref in &record.tag_refs {
                let entry = self.tags[back_ref.bucket as usize].get(back_ref.position as usize);
                match entry {
                    Ok(&entry) if entry as usize == slot => tag_entries += 1,
                    _ => {
                        return Err(EngineError::Consistency(format!(
                            "slot {slot} tag back-reference {back_ref:?} is stale"
                        )))
                    }
                }
            }
        }
        if let Some((chunk_id, _)) = self.chunks.iter().find(|(_, bucket)| bucket.is_empty()) {
            return Err(EngineError::Consistency(format!("chunk {chunk_id} bucket is empty")));
        }
        let chunk_total: usize = self.chunks.values().map(Bucket::len).sum();
        let tag_total: usize = self.tags.iter().map(Bucket::len).sum();
        if chunk_total != chunk_entries || tag_total != tag_entries {
            return Err(EngineError::Consistency(format!(
                "{chunk_total} chunk / {tag_total} tag entries, {chunk_entries} / {tag_entries} referenced"
            )));
        }
        Ok(())
    }
}

/// After a swap-pop moved an entry from `relocation.from` to `relocation.to`
/// in `bucket`, rewrite the moved entity's back-reference for that bucket.
fn repoint(refs: &mut [BackRef], bucket: u32, relocation: Relocation) -> Result<(), EngineError> {
    let found = refs
        .iter_mut()
        .find(|r| r.bucket == bucket && r.position as usize == relocation.from);
    match found {
        Some(back_ref) => {
            back_ref.position = relocation.to as u32;
            metrics! {
                metrics::BACK_REFERENCE_FIXUPS.increment(1);
            }
            Ok(())
        }
        None => {
            debug_assert!(false, "moved entry has no back-reference for bucket {bucket}");
            Err(consistency(format!(
                "no back-reference for bucket {bucket} at position {}",
                relocation.from
            )))
        }
    }
}

fn validate_collider(collider: &EntityCollider) -> Result<(), EngineError> {
    if !collider.bounds.is_valid() {
        tracing::error!(id = collider.id, bounds = %collider.bounds, "invalid collider bounds");
        return Err(EngineError::InvalidBounds {
            id: collider.id,
            bounds: collider.bounds,
        });
    }
    Ok(())
}

fn validate_sprite(id: EntityId, sprite: &EntitySprite) -> Result<(), EngineError> {
    let reason = if !sprite.depth.is_finite() {
        Some("depth is not finite")
    } else if !sprite.texture_bounds.is_valid() || !sprite.texture_bounds.is_integral() {
        Some("texture bounds must be valid whole texel coordinates")
    } else if !sprite.transform.is_finite() {
        Some("transform is not finite")
    } else {
        None
    };
    match reason {
        Some(reason) => {
            tracing::error!(id, reason, "invalid sprite");
            Err(EngineError::InvalidSprite { id, reason })
        }
        None => Ok(()),
    }
}

fn oom(context: &'static str) -> EngineError {
    tracing::error!(context, "entity index allocation failed");
    EngineError::OutOfMemory { context }
}

fn consistency(message: String) -> EngineError {
    tracing::error!(%message, "entity index consistency violated");
    EngineError::Consistency(message)
}
