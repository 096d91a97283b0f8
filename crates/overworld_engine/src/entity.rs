//! Entity records stored by the index.

use crate::tagset::Tagset;
use glam::Mat4;
use overworld_core::{Bounds, Color};

/// External entity key chosen by the caller.
pub type EntityId = u32;

/// What the index partitions and filters on.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EntityCollider {
    pub id: EntityId,
    pub bounds: Bounds,
    pub tagset: Tagset,
}

/// How the entity is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntitySprite {
    /// Region in the atlas, in texel units.
    pub texture_bounds: Bounds,
    pub color: Color,
    pub depth: f32,
    pub transform: Mat4,
}

impl Default for EntitySprite {
    fn default() -> Self {
        Self {
            texture_bounds: Bounds::ZERO,
            color: Color::WHITE,
            depth: 0.0,
            transform: Mat4::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Entity {
    pub collider: EntityCollider,
    pub sprite: EntitySprite,
}

impl Entity {
    pub fn new(id: EntityId, bounds: Bounds) -> Self {
        Self {
            collider: EntityCollider {
                id,
                bounds,
                tagset: Tagset::EMPTY,
            },
            sprite: EntitySprite::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        self.collider.id
    }

    pub fn with_tags(mut self, tagset: Tagset) -> Self {
        self.collider.tagset = tagset;
        self
    }

    pub fn with_sprite(mut self, sprite: EntitySprite) -> Self {
        self.sprite = sprite;
        self
    }
}

/// Range query over the index.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EntitySearch {
    pub bounds: Bounds,
    /// Entities must carry every tag in here.
    pub tagset: Tagset,
    pub excluded_id: Option<EntityId>,
}

impl EntitySearch {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            ..Default::default()
        }
    }

    pub fn with_tags(mut self, tagset: Tagset) -> Self {
        self.tagset = tagset;
        self
    }

    pub fn excluding(mut self, id: EntityId) -> Self {
        self.excluded_id = Some(id);
        self
    }

    #[inline]
    pub fn matches(&self, id: EntityId, bounds: &Bounds, tagset: &Tagset) -> bool {
        self.excluded_id != Some(id)
            && self.bounds.collides(bounds)
            && tagset.contains_all(&self.tagset)
    }
}
