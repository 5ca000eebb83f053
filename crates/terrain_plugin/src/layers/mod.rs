//! Layered heightmap synthesis.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ PerlinNoise  ├────►│ CitySquare   ├────►│ Road         ├────► normalize
//! │ (+= noise)   │     │ (flatten)    │     │ (flatten)    │      weights
//! └──────────────┘     └──────┬───────┘     └──────┬───────┘
//!                             │                    │
//!                    height_before(1)     height_before(2)
//!                   (avg over footprint)  (city heights)
//! ```
//!
//! Layers run in stack order over a shared `TerrainData`; later layers see
//! earlier output. A layer that needs "the terrain as it was before me"
//! asks its `LayerContext`, which re-runs the preceding layers for a single
//! point. This is what breaks the circular dependency between flattening and
//! height sampling.

pub mod city_square;
pub mod perlin;
pub mod road;

use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::city::CityLayout;
use crate::constants::MAX_TEXTURES;
use crate::error::{Result, TerrainError};
use crate::types::{SampleRegion, TerrainData};

pub use city_square::{CitySquareConfig, CitySquareLayer};
pub use perlin::{NoiseLayerConfig, PerlinNoiseLayer};
pub use road::{road_graph, RoadConfig, RoadGenerationLayer, RoadSegment};

/// One stage of the terrain pipeline.
///
/// Implementations run on worker threads and must not touch scene state.
pub trait TerrainLayer: Send + Sync {
  /// Short name for logs.
  fn name(&self) -> &str;

  /// Mutate `data` in place for the samples described by `region`.
  fn apply(&self, data: &mut TerrainData, region: &SampleRegion, ctx: &LayerContext<'_>);

  /// Called before a full regeneration pass. Layers drop generation caches here.
  fn on_generation_start(&self) {}
}

/// Per-call view of the stack, handed to [`TerrainLayer::apply`].
pub struct LayerContext<'a> {
  stack: &'a LayerStack,
  index: usize,
}

impl<'a> LayerContext<'a> {
  /// Position of the running layer in the stack.
  pub fn layer_index(&self) -> usize {
    self.index
  }

  /// Height at `world` as produced by every layer before this one.
  pub fn height_before(&self, world: Vec2) -> f32 {
    self.stack.height_before(world, self.index)
  }
}

/// Splatmap contribution shared by all layer kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureBlend {
  pub enabled: bool,
  /// Target channel, `0..MAX_TEXTURES`.
  pub channel: usize,
  pub strength: f32,
}

impl TextureBlend {
  pub fn channel(channel: usize, strength: f32) -> Self {
    Self {
      enabled: true,
      channel,
      strength,
    }
  }

  #[inline]
  pub(crate) fn paint(&self, data: &mut TerrainData, x: usize, z: usize) {
    if self.enabled {
      data.add_weight(x, z, self.channel, self.strength);
    }
  }

  fn validate(&self, layer: &str) -> Result<()> {
    if self.enabled && self.channel >= MAX_TEXTURES {
      return Err(invalid(
        layer,
        format!("texture channel {} out of range 0..{MAX_TEXTURES}", self.channel),
      ));
    }
    Ok(())
  }
}

impl Default for TextureBlend {
  fn default() -> Self {
    Self {
      enabled: false,
      channel: 0,
      strength: 1.0,
    }
  }
}

/// Serialized layer description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerConfig {
  PerlinNoise(NoiseLayerConfig),
  CitySquare(CitySquareConfig),
  Road(RoadConfig),
}

impl LayerConfig {
  pub fn kind(&self) -> &'static str {
    match self {
      LayerConfig::PerlinNoise(_) => "perlin_noise",
      LayerConfig::CitySquare(_) => "city_square",
      LayerConfig::Road(_) => "road",
    }
  }

  /// Check parameter ranges.
  pub fn validate(&self) -> Result<()> {
    let layer = self.kind();
    match self {
      LayerConfig::PerlinNoise(c) => {
        if !(c.scale > 0.0) {
          return Err(invalid(layer, format!("scale must be positive, got {}", c.scale)));
        }
        if !(1..=perlin::MAX_OCTAVES).contains(&c.octaves) {
          return Err(invalid(
            layer,
            format!("octaves must be in 1..={}, got {}", perlin::MAX_OCTAVES, c.octaves),
          ));
        }
        c.texture.validate(layer)
      }
      LayerConfig::CitySquare(c) => {
        if !(c.square_size > 0.0) {
          return Err(invalid(layer, "square_size must be positive".into()));
        }
        check_strength(layer, c.flatten_strength)?;
        c.texture.validate(layer)
      }
      LayerConfig::Road(c) => {
        if !(c.road_width > 0.0) {
          return Err(invalid(layer, "road_width must be positive".into()));
        }
        check_strength(layer, c.flatten_strength)?;
        c.texture.validate(layer)
      }
    }
  }

  /// Instantiate the layer. City-aware layers share `cities`.
  pub fn build(&self, cities: &Arc<CityLayout>) -> Box<dyn TerrainLayer> {
    match self {
      LayerConfig::PerlinNoise(c) => Box::new(PerlinNoiseLayer::new(c.clone())),
      LayerConfig::CitySquare(c) => Box::new(CitySquareLayer::new(c.clone(), Arc::clone(cities))),
      LayerConfig::Road(c) => Box::new(RoadGenerationLayer::new(c.clone(), Arc::clone(cities))),
    }
  }
}

fn check_strength(layer: &str, strength: f32) -> Result<()> {
  if (0.0..=1.0).contains(&strength) {
    Ok(())
  } else {
    Err(invalid(
      layer,
      format!("flatten_strength must be in [0, 1], got {strength}"),
    ))
  }
}

fn invalid(layer: &str, reason: String) -> TerrainError {
  TerrainError::InvalidLayer {
    layer: layer.to_string(),
    reason,
  }
}

/// Ordered list of layers.
#[derive(Default)]
pub struct LayerStack {
  layers: Vec<Box<dyn TerrainLayer>>,
}

impl LayerStack {
  pub fn new(layers: Vec<Box<dyn TerrainLayer>>) -> Self {
    Self { layers }
  }

  /// Validate and build every configured layer.
  pub fn from_configs(configs: &[LayerConfig], cities: &Arc<CityLayout>) -> Result<Self> {
    let layers = configs
      .iter()
      .map(|config| {
        config.validate()?;
        Ok(config.build(cities))
      })
      .collect::<Result<Vec<_>>>()?;
    Ok(Self { layers })
  }

  pub fn push(&mut self, layer: Box<dyn TerrainLayer>) {
    self.layers.push(layer);
  }

  pub fn len(&self) -> usize {
    self.layers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.layers.is_empty()
  }

  /// Layer names in stack order.
  pub fn names(&self) -> Vec<&str> {
    self.layers.iter().map(|l| l.name()).collect()
  }

  /// Run every layer over `data`.
  pub fn apply_all(&self, data: &mut TerrainData, region: &SampleRegion) {
    self.apply_until(data, region, self.layers.len());
  }

  /// Run layers `[0, end)` over `data`.
  pub fn apply_until(&self, data: &mut TerrainData, region: &SampleRegion, end: usize) {
    let end = end.min(self.layers.len());
    for (index, layer) in self.layers[..end].iter().enumerate() {
      let ctx = LayerContext { stack: self, index };
      layer.apply(data, region, &ctx);
    }
  }

  /// Height at `world` as of layer `layer_index` (layers before it only).
  pub fn height_before(&self, world: Vec2, layer_index: usize) -> f32 {
    let mut data = TerrainData::new(1);
    self.apply_until(&mut data, &SampleRegion::point(world), layer_index);
    data.height(0, 0)
  }

  /// Height at `world` after every layer.
  pub fn sample_height(&self, world: Vec2) -> f32 {
    self.height_before(world, self.layers.len())
  }

  /// Notify every layer that a full regeneration is starting.
  pub fn begin_generation(&self) {
    for layer in &self.layers {
      layer.on_generation_start();
    }
  }
}
