//! Fractal Perlin noise heights.

use ::noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use super::{LayerContext, TerrainLayer, TextureBlend};
use crate::types::{SampleRegion, TerrainData};

/// Octave cap accepted by the fBm generator.
pub const MAX_OCTAVES: usize = Fbm::<Perlin>::MAX_OCTAVES;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseLayerConfig {
  pub seed: u32,
  /// Feature size in world units (frequency = 1 / scale).
  pub scale: f32,
  /// Noise in [-1, 1] is multiplied by this before being added.
  pub strength: f32,
  pub octaves: usize,
  /// Amplitude falloff per octave.
  pub persistence: f32,
  /// Frequency gain per octave.
  pub lacunarity: f32,
  pub texture: TextureBlend,
}

impl Default for NoiseLayerConfig {
  fn default() -> Self {
    Self {
      seed: 1337,
      scale: 50.0,
      strength: 10.0,
      octaves: 4,
      persistence: 0.5,
      lacunarity: 2.0,
      texture: TextureBlend::default(),
    }
  }
}

/// Adds `fbm(world) * strength` to every sample.
///
/// Noise is evaluated in world space, so a vertex shared by two chunks gets
/// the same value from either side.
pub struct PerlinNoiseLayer {
  config: NoiseLayerConfig,
  fbm: Fbm<Perlin>,
}

impl PerlinNoiseLayer {
  pub fn new(config: NoiseLayerConfig) -> Self {
    let fbm = Fbm::<Perlin>::new(config.seed)
      .set_octaves(config.octaves.clamp(1, MAX_OCTAVES))
      .set_frequency(1.0 / config.scale.max(f32::EPSILON) as f64)
      .set_persistence(config.persistence as f64)
      .set_lacunarity(config.lacunarity as f64);
    Self { config, fbm }
  }

  pub fn config(&self) -> &NoiseLayerConfig {
    &self.config
  }

  /// Raw fBm value at a world position, roughly in [-1, 1].
  #[inline]
  pub fn noise_at(&self, x: f32, z: f32) -> f32 {
    self.fbm.get([x as f64, z as f64]) as f32
  }
}

impl TerrainLayer for PerlinNoiseLayer {
  fn name(&self) -> &str {
    "perlin_noise"
  }

  #[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "layer::perlin"))]
  fn apply(&self, data: &mut TerrainData, region: &SampleRegion, _ctx: &LayerContext<'_>) {
    for z in 0..region.resolution {
      for x in 0..region.resolution {
        let world = region.world_pos(x, z);
        let value = self.noise_at(world.x, world.y);
        data.add_height(x, z, value * self.config.strength);
        self.config.texture.paint(data, x, z);
      }
    }
  }
}
