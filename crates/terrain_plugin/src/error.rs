//! Error type for terrain setup and configuration.
//!
//! Runtime queries never fail (height lookups fall back to direct sampling),
//! so every variant here describes a setup problem.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerrainError {
  #[error("no terrain layers configured")]
  NoLayers,

  #[error("world dimensions must be positive and finite, got {width} x {depth}")]
  InvalidDimensions { width: f32, depth: f32 },

  #[error("chunk resolution must be at least 1, got {0}")]
  InvalidResolution(u32),

  #[error("max_lod {max_lod} exceeds the supported limit of {limit}")]
  InvalidLod { max_lod: u32, limit: u32 },

  #[error("layer `{layer}`: {reason}")]
  InvalidLayer { layer: String, reason: String },

  #[error("city layout: {0}")]
  InvalidCities(String),

  #[error("terrain has not been initialized")]
  NotInitialized,

  #[error("failed to parse terrain config: {0}")]
  Config(#[from] toml::de::Error),

  #[error("failed to read terrain config: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = TerrainError> = std::result::Result<T, E>;
