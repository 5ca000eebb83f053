//! City placement: concentric rings of city centers around the world origin.
//!
//! ```text
//!                 ring 2 (2n cities)
//!            ·  ·  ·  ·  ·  ·  ·  ·
//!         ·      ring 1 (n cities)    ·
//!       ·        ·    ·    ·           ·
//!      ·       ·    ring 0    ·         ·
//!      ·       ·     (0,0)    ·         ·
//!       ·        ·    ·    ·           ·
//!         ·                           ·
//!            ·  ·  ·  ·  ·  ·  ·  ·
//! ```
//!
//! Every ring draws its jitter from an RNG seeded with `seed + ring`, so the
//! layout is reproducible and independent of generation order. Chunks on
//! different worker threads agree on city locations without coordination.

pub mod buildings;

use std::f32::consts::TAU;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_CITIES, MAX_CITY_RINGS};
use crate::error::{Result, TerrainError};

pub use buildings::{plan_buildings, BuildingConfig, BuildingPlacement};

/// Maximum angular jitter per city, in radians.
const ANGLE_JITTER: f32 = 0.1;

/// Parameters for ring generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityConfig {
  /// Base seed; ring `i` uses `seed + i`.
  pub seed: u64,
  /// Radial distance between rings.
  pub ring_distance: f32,
  /// Ring `i` holds `i * cities_per_ring` cities.
  pub cities_per_ring: u32,
  /// Rings are generated out to this radius.
  pub max_radius: f32,
}

impl Default for CityConfig {
  fn default() -> Self {
    Self {
      seed: 1337,
      ring_distance: 500.0,
      cities_per_ring: 8,
      max_radius: 5000.0,
    }
  }
}

impl CityConfig {
  /// Number of rings outside the central city.
  pub fn ring_count(&self) -> Result<u32> {
    if !(self.ring_distance > 0.0 && self.ring_distance.is_finite()) {
      return Err(TerrainError::InvalidCities(format!(
        "ring_distance must be positive and finite, got {}",
        self.ring_distance
      )));
    }
    if !(self.max_radius >= 0.0 && self.max_radius.is_finite()) {
      return Err(TerrainError::InvalidCities(format!(
        "max_radius must be non-negative and finite, got {}",
        self.max_radius
      )));
    }
    let rings = (self.max_radius / self.ring_distance).floor();
    if rings > MAX_CITY_RINGS as f32 {
      return Err(TerrainError::InvalidCities(format!(
        "{rings} rings exceed the limit of {MAX_CITY_RINGS}"
      )));
    }
    Ok(rings as u32)
  }

  /// Reject layouts that are degenerate or too large to generate.
  pub fn validate(&self) -> Result<()> {
    let rings = self.ring_count()? as u64;
    // Ring i holds i * cities_per_ring cities.
    let total = (rings * (rings + 1) / 2).checked_mul(self.cities_per_ring as u64);
    match total {
      Some(n) if n <= MAX_CITIES => Ok(()),
      _ => Err(TerrainError::InvalidCities(format!(
        "{rings} rings of {} cities per step exceed the limit of {MAX_CITIES} cities",
        self.cities_per_ring
      ))),
    }
  }
}

/// Stable hash key for a city center (bitwise on the coordinates).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CityKey(u32, u32);

impl From<Vec2> for CityKey {
  fn from(center: Vec2) -> Self {
    Self(center.x.to_bits(), center.y.to_bits())
  }
}

/// Immutable city layout shared by every consumer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CityLayout {
  centers: Vec<Vec2>,
  rings: Vec<Vec<Vec2>>,
}

impl CityLayout {
  /// Generate the ring layout for `config`.
  pub fn generate(config: &CityConfig) -> Self {
    let mut rings = vec![vec![Vec2::ZERO]];

    if let Err(err) = config.validate() {
      tracing::warn!(%err, "only the central city is placed");
      return Self::from_rings(rings);
    }
    let max_ring = config.ring_count().unwrap_or(0);
    let jitter = config.ring_distance / 4.0;

    for ring in 1..=max_ring {
      let count = ring * config.cities_per_ring;
      let ring_radius = ring as f32 * config.ring_distance;
      let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(ring as u64));

      let cities = (0..count)
        .map(|j| {
          let mut angle = j as f32 / count as f32 * TAU;
          angle += rng.random_range(-ANGLE_JITTER..=ANGLE_JITTER);
          let radius = ring_radius + rng.random_range(-jitter..=jitter);
          Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect();
      rings.push(cities);
    }

    let layout = Self::from_rings(rings);
    tracing::debug!(
      rings = layout.rings.len(),
      cities = layout.centers.len(),
      "generated city layout"
    );
    layout
  }

  /// Build a layout from explicit rings (ring 0 first).
  pub fn from_rings(rings: Vec<Vec<Vec2>>) -> Self {
    let centers = rings.iter().flatten().copied().collect();
    Self { centers, rings }
  }

  /// Layout with no cities at all.
  pub fn empty() -> Self {
    Self::default()
  }

  /// Every city center, ring by ring.
  pub fn centers(&self) -> &[Vec2] {
    &self.centers
  }

  /// City centers grouped by ring.
  pub fn rings(&self) -> &[Vec<Vec2>] {
    &self.rings
  }

  pub fn len(&self) -> usize {
    self.centers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.centers.is_empty()
  }
}
