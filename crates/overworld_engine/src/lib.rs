//! Overworld Engine
//!
//! Game-side indexing and packing built on `overworld_core`:
//! - Spatial entity index with chunk and tag buckets
//! - Texture atlas packing with guillotine splits and shelf growth
//!
//! # Feature Flags
//!
//! - `metrics` - Record search and packing counters (default: enabled)

pub mod atlas;
pub mod config;
pub mod entity;
pub mod entity_index;
pub mod error;
pub mod tagset;
pub mod texture_atlas;

pub use atlas::{atlas_metrics_snapshot, reset_atlas_metrics, Atlas, AtlasMetrics, AtlasRegionId};
pub use config::{AtlasConfig, EngineConfig, EntityIndexConfig};
pub use entity::{Entity, EntityCollider, EntityId, EntitySearch, EntitySprite};
pub use entity_index::{
    entity_index_metrics_snapshot, reset_entity_index_metrics, EntityIndex, EntityIndexMetrics,
};
pub use error::{EngineError, EngineResult};
pub use tagset::{TagId, Tagset, TAG_ID_COUNT};
pub use texture_atlas::{TextureAtlas, TextureUpload};
