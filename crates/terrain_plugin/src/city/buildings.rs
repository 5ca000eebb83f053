//! Building placement inside city squares.
//!
//! Produces plain placement records; spawning the actual bodies is up to the
//! host. Placement must run after terrain generation so the height lookups
//! hit finished chunks instead of the slow single-point fallback.

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::CityLayout;

/// Spacing factor between building slots (leaves streets between them).
const SLOT_SPACING: f32 = 1.5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingConfig {
  pub min_height: f32,
  pub max_height: f32,
  pub width: f32,
  pub depth: f32,
  /// Probability that a slot receives a building.
  pub density: f32,
  pub seed: u64,
  /// Side of the square footprint around each city center. Should match the
  /// city flattening layer's `square_size`.
  pub footprint: f32,
}

impl Default for BuildingConfig {
  fn default() -> Self {
    Self {
      min_height: 10.0,
      max_height: 50.0,
      width: 20.0,
      depth: 20.0,
      density: 0.5,
      seed: 42,
      footprint: 200.0,
    }
  }
}

/// One building to spawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildingPlacement {
  /// Center of the box; its base rests on the terrain.
  pub center: Vec3,
  /// Full box extents (width, height, depth).
  pub size: Vec3,
}

/// Plan buildings for every city.
///
/// `height_at` maps a world (x, z) to terrain height.
pub fn plan_buildings<F>(
  cities: &CityLayout,
  config: &BuildingConfig,
  mut height_at: F,
) -> Vec<BuildingPlacement>
where
  F: FnMut(Vec2) -> f32,
{
  let step_x = config.width * SLOT_SPACING;
  let step_z = config.depth * SLOT_SPACING;
  if !(config.footprint > 0.0 && step_x > 0.0 && step_z > 0.0) {
    tracing::warn!(?config, "building config has no usable footprint, skipping");
    return Vec::new();
  }

  let (min_height, max_height) = if config.min_height <= config.max_height {
    (config.min_height, config.max_height)
  } else {
    (config.max_height, config.min_height)
  };

  let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
  let half = config.footprint / 2.0;
  let slots_x = (config.footprint / step_x).ceil() as u32;
  let slots_z = (config.footprint / step_z).ceil() as u32;
  let mut placements = Vec::new();

  for center in cities.centers() {
    for ix in 0..slots_x {
      let x = center.x - half + ix as f32 * step_x;
      for iz in 0..slots_z {
        let z = center.y - half + iz as f32 * step_z;
        if rng.random::<f32>() >= config.density {
          continue;
        }

        let height = rng.random_range(min_height..=max_height);
        let ground = height_at(Vec2::new(x, z));
        placements.push(BuildingPlacement {
          center: Vec3::new(x, ground + height / 2.0, z),
          size: Vec3::new(config.width, height, config.depth),
        });
      }
    }
  }

  tracing::debug!(buildings = placements.len(), "planned city buildings");
  placements
}
