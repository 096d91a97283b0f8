//! Engine configuration

use crate::error::EngineError;
use overworld_core::bounds::F32_EXACT_INT_MAX;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level engine settings, loadable from JSON.
///
/// Every field has a default, so a partial document (or `{}`) is accepted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub entity_index: EntityIndexConfig,
    pub atlas: AtlasConfig,
}

/// Spatial partitioning of the entity index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityIndexConfig {
    /// Chunk edge is `2^chunk_width_bits` world units.
    pub chunk_width_bits: u32,
    /// Grid is `2^grid_bits` chunks per axis, wrapping around.
    pub grid_bits: u32,
}

/// Size limits of the packed image. Both axes stay within exact `f32`
/// integer range so region bounds are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for EntityIndexConfig {
    fn default() -> Self {
        Self {
            chunk_width_bits: 5,
            grid_bits: 8,
        }
    }
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            max_width: 4096,
            max_height: 16384,
        }
    }
}

impl EntityIndexConfig {
    pub const MAX_GRID_BITS: u32 = 12;
    pub const MAX_CHUNK_WIDTH_BITS: u32 = 16;

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.grid_bits == 0 || self.grid_bits > Self::MAX_GRID_BITS {
            return Err(EngineError::Config(format!(
                "entity_index.grid_bits must be in 1..={}, got {}",
                Self::MAX_GRID_BITS,
                self.grid_bits
            )));
        }
        if self.chunk_width_bits > Self::MAX_CHUNK_WIDTH_BITS {
            return Err(EngineError::Config(format!(
                "entity_index.chunk_width_bits must be <= {}, got {}",
                Self::MAX_CHUNK_WIDTH_BITS,
                self.chunk_width_bits
            )));
        }
        Ok(())
    }

    /// Chunks per axis.
    #[inline]
    pub fn grid_size(&self) -> u32 {
        1 << self.grid_bits
    }
}

impl AtlasConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(EngineError::Config(format!(
                "atlas max size must be non-zero, got {}x{}",
                self.max_width, self.max_height
            )));
        }
        if self.max_width > F32_EXACT_INT_MAX || self.max_height > F32_EXACT_INT_MAX {
            return Err(EngineError::Config(format!(
                "atlas max size must be <= {F32_EXACT_INT_MAX} per axis, got {}x{}",
                self.max_width, self.max_height
            )));
        }
        Ok(())
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        self.entity_index.validate()?;
        self.atlas.validate()
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|err| EngineError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| EngineError::Config(format!("{}: {err}", path.display())))?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), ?config, "loaded engine config");
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self).map_err(|err| EngineError::Config(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.entity_index.chunk_width_bits, 5);
        assert_eq!(config.entity_index.grid_bits, 8);
        assert_eq!(config.atlas.max_width, 4096);
    }

    #[test]
    fn partial_document_overrides() {
        let config =
            EngineConfig::from_json_str(r#"{ "entity_index": { "grid_bits": 4 } }"#).unwrap();
        assert_eq!(config.entity_index.grid_bits, 4);
        assert_eq!(config.entity_index.chunk_width_bits, 5);
        assert_eq!(config.entity_index.grid_size(), 16);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "entity_index": { "grid_bits": 0 } }"#),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "atlas": { "max_width": 0 } }"#),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str("not json"),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn rejects_atlas_beyond_exact_f32() {
        let too_tall = AtlasConfig {
            max_width: 1,
            max_height: F32_EXACT_INT_MAX + 8,
        };
        assert!(matches!(too_tall.validate(), Err(EngineError::Config(_))));
        let too_wide = AtlasConfig {
            max_width: F32_EXACT_INT_MAX + 1,
            max_height: 1,
        };
        assert!(matches!(too_wide.validate(), Err(EngineError::Config(_))));
        let limit = AtlasConfig {
            max_width: F32_EXACT_INT_MAX,
            max_height: F32_EXACT_INT_MAX,
        };
        limit.validate().unwrap();
    }

    #[test]
    fn json_round_trip() {
        let mut config = EngineConfig::default();
        config.atlas.max_height = 2048;
        let json = config.to_json_string().unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }
}
