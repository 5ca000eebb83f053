//! Terrain configuration, loadable from TOML.
//!
//! ```toml
//! width = 2048.0
//! depth = 2048.0
//! chunk_resolution = 64
//! max_lod = 4
//! world_origin = [-1024.0, -1024.0]
//! execution = "background"
//!
//! [city]
//! seed = 7
//!
//! [[layers]]
//! kind = "perlin_noise"
//! strength = 25.0
//!
//! [[layers]]
//! kind = "city_square"
//!
//! [[layers]]
//! kind = "road"
//! ```
//!
//! Every field has a default; an empty document is the stock terrain.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::city::CityConfig;
use crate::constants::{
  DEFAULT_CHUNK_RESOLUTION, DEFAULT_MAX_LOD, DEFAULT_WORLD_DEPTH, DEFAULT_WORLD_WIDTH,
  MAX_LOD_LIMIT,
};
use crate::error::{Result, TerrainError};
use crate::layers::{CitySquareConfig, LayerConfig, NoiseLayerConfig, RoadConfig};
use crate::threading::ExecutionMode;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
  /// World extent along X.
  pub width: f32,
  /// World extent along Z.
  pub depth: f32,
  /// Cells per chunk side at every LOD.
  pub chunk_resolution: u32,
  pub max_lod: u32,
  /// World (x, z) of the root node's minimum corner.
  pub world_origin: Vec2,
  pub execution: ExecutionMode,
  pub city: CityConfig,
  /// Applied in order.
  pub layers: Vec<LayerConfig>,
}

impl Default for TerrainConfig {
  fn default() -> Self {
    Self {
      width: DEFAULT_WORLD_WIDTH,
      depth: DEFAULT_WORLD_DEPTH,
      chunk_resolution: DEFAULT_CHUNK_RESOLUTION,
      max_lod: DEFAULT_MAX_LOD,
      world_origin: Vec2::ZERO,
      execution: ExecutionMode::default(),
      city: CityConfig::default(),
      layers: default_layers(),
    }
  }
}

/// Noise, then city squares, then roads.
pub fn default_layers() -> Vec<LayerConfig> {
  vec![
    LayerConfig::PerlinNoise(NoiseLayerConfig::default()),
    LayerConfig::CitySquare(CitySquareConfig::default()),
    LayerConfig::Road(RoadConfig::default()),
  ]
}

impl TerrainConfig {
  pub fn from_toml_str(source: &str) -> Result<Self> {
    Ok(toml::from_str(source)?)
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let source = std::fs::read_to_string(path.as_ref())?;
    Self::from_toml_str(&source)
  }

  /// Check world and layer parameters.
  pub fn validate(&self) -> Result<()> {
    self.validate_world()?;
    if self.layers.is_empty() {
      return Err(TerrainError::NoLayers);
    }
    self.layers.iter().try_for_each(LayerConfig::validate)
  }

  /// Check everything except the layer list.
  pub fn validate_world(&self) -> Result<()> {
    let dims_ok = |v: f32| v.is_finite() && v > 0.0;
    if !dims_ok(self.width) || !dims_ok(self.depth) {
      return Err(TerrainError::InvalidDimensions {
        width: self.width,
        depth: self.depth,
      });
    }
    if self.chunk_resolution == 0 {
      return Err(TerrainError::InvalidResolution(self.chunk_resolution));
    }
    if self.max_lod > MAX_LOD_LIMIT {
      return Err(TerrainError::InvalidLod {
        max_lod: self.max_lod,
        limit: MAX_LOD_LIMIT,
      });
    }
    self.city.validate()
  }

  /// Side of the square root node.
  pub fn root_size(&self) -> f32 {
    self.width.max(self.depth)
  }

  /// Triangles in one chunk mesh.
  pub fn triangles_per_chunk(&self) -> u64 {
    let r = self.chunk_resolution as u64;
    2 * r * r
  }
}
