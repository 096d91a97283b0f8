use crate::entity::EntityId;
use overworld_core::{Bounds, ImageError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid bounds {bounds} for entity {id}")]
    InvalidBounds { id: EntityId, bounds: Bounds },
    #[error("invalid sprite for entity {id}: {reason}")]
    InvalidSprite { id: EntityId, reason: &'static str },
    #[error("tag id {tag_id} out of range (max {max})")]
    TagOutOfRange { tag_id: u32, max: u32 },
    #[error("region size {width}x{height} exceeds {max} on one axis")]
    InvalidRegionSize { width: u32, height: u32, max: u32 },
    #[error("stride {stride} smaller than region width {width}")]
    InvalidStride { stride: u32, width: u32 },
    #[error("pixel source has {len} pixels, region needs {needed}")]
    SourceTooSmall { len: usize, needed: usize },
    #[error("region id {id} out of range")]
    RegionOutOfRange { id: u32 },
    #[error("atlas cannot grow to {width}x{height} (max {max_width}x{max_height})")]
    AtlasFull {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },
    #[error("out of memory while {context}")]
    OutOfMemory { context: &'static str },
    #[error("index consistency violated: {0}")]
    Consistency(String),
    #[error("texture upload failed: {0}")]
    Upload(String),
    #[error("invalid config: {0}")]
    Config(String),
}

impl From<ImageError> for EngineError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::OutOfMemory { .. } => EngineError::OutOfMemory {
                context: "resizing atlas image",
            },
            other => EngineError::Consistency(other.to_string()),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
