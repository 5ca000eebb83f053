//! Flattens square plazas around each city center.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec2;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{LayerContext, TerrainLayer, TextureBlend};
use crate::city::{CityKey, CityLayout};
use crate::types::{SampleRegion, TerrainData};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CitySquareConfig {
  /// Side length of the flattened square.
  pub square_size: f32,
  /// 0 = untouched, 1 = perfectly flat at the city's average height.
  pub flatten_strength: f32,
  /// The footprint average is taken over `(footprint_samples + 1)²` points.
  pub footprint_samples: u32,
  pub texture: TextureBlend,
}

impl Default for CitySquareConfig {
  fn default() -> Self {
    Self {
      square_size: 200.0,
      flatten_strength: 0.8,
      footprint_samples: 8,
      texture: TextureBlend {
        enabled: false,
        channel: 2,
        strength: 1.0,
      },
    }
  }
}

/// Lerps every sample inside a city square toward that city's average height.
///
/// The average is measured on a fixed world-space grid through
/// `LayerContext::height_before`, so it does not depend on which chunk asks
/// first. It is cached per city for the current generation pass.
pub struct CitySquareLayer {
  config: CitySquareConfig,
  cities: Arc<CityLayout>,
  average_heights: Mutex<HashMap<CityKey, f32>>,
}

impl CitySquareLayer {
  pub fn new(config: CitySquareConfig, cities: Arc<CityLayout>) -> Self {
    Self {
      config,
      cities,
      average_heights: Mutex::new(HashMap::new()),
    }
  }

  pub fn config(&self) -> &CitySquareConfig {
    &self.config
  }

  /// Cached average for a city, if this generation already computed it.
  pub fn cached_average(&self, center: Vec2) -> Option<f32> {
    self.average_heights.lock().get(&CityKey::from(center)).copied()
  }

  /// Average height over a city's footprint, computed once per generation.
  ///
  /// Concurrent callers may compute it redundantly; the first stored value
  /// wins and is what every caller returns.
  pub fn average_height(&self, center: Vec2, ctx: &LayerContext<'_>) -> f32 {
    let key = CityKey::from(center);
    if let Some(&cached) = self.average_heights.lock().get(&key) {
      return cached;
    }

    // Computed outside the lock: sampling re-enters earlier layers.
    let average = self.measure_footprint(center, ctx);
    *self.average_heights.lock().entry(key).or_insert(average)
  }

  fn measure_footprint(&self, center: Vec2, ctx: &LayerContext<'_>) -> f32 {
    let samples = self.config.footprint_samples.max(1);
    let half = self.config.square_size / 2.0;
    let step = self.config.square_size / samples as f32;
    let start = center - Vec2::splat(half);

    let mut total = 0.0;
    for iz in 0..=samples {
      for ix in 0..=samples {
        let p = start + Vec2::new(ix as f32 * step, iz as f32 * step);
        total += ctx.height_before(p);
      }
    }
    total / ((samples + 1) * (samples + 1)) as f32
  }

  #[inline]
  fn inside(&self, p: Vec2, center: Vec2) -> bool {
    let half = self.config.square_size / 2.0;
    (p.x - center.x).abs() < half && (p.y - center.y).abs() < half
  }
}

impl TerrainLayer for CitySquareLayer {
  fn name(&self) -> &str {
    "city_square"
  }

  fn on_generation_start(&self) {
    self.average_heights.lock().clear();
  }

  #[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "layer::city_square"))]
  fn apply(&self, data: &mut TerrainData, region: &SampleRegion, ctx: &LayerContext<'_>) {
    let half = self.config.square_size / 2.0;
    let region_min = region.origin;
    let region_max = region.max();

    for &center in self.cities.centers() {
      // Skip cities whose square misses this region entirely.
      if center.x + half < region_min.x
        || center.x - half > region_max.x
        || center.y + half < region_min.y
        || center.y - half > region_max.y
      {
        continue;
      }

      let mut average = None;
      for z in 0..region.resolution {
        for x in 0..region.resolution {
          let world = region.world_pos(x, z);
          if !self.inside(world, center) {
            continue;
          }
          let target = *average.get_or_insert_with(|| self.average_height(center, ctx));
          let h = data.height(x, z);
          data.set_height(x, z, lerp(h, target, self.config.flatten_strength));
          self.config.texture.paint(data, x, z);
        }
      }
    }
  }
}

#[inline]
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
  a + (b - a) * t
}
