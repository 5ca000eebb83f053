//! Roads between cities.
//!
//! ```text
//!   ring 2   o───o───o───o          ring neighbors: j → (j+1) mod n
//!            │
//!   ring 1   o───o───o              ring i → nearest city in ring i+1
//!            │
//!   ring 0   o (center)
//! ```

use std::sync::Arc;

use glam::Vec2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::city_square::lerp;
use super::{LayerContext, TerrainLayer, TextureBlend};
use crate::city::CityLayout;
use crate::types::{SampleRegion, TerrainData};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadConfig {
  pub road_width: f32,
  pub flatten_strength: f32,
  /// Raised above the interpolated city heights.
  pub road_height_offset: f32,
  pub texture: TextureBlend,
}

impl Default for RoadConfig {
  fn default() -> Self {
    Self {
      road_width: 8.0,
      flatten_strength: 0.9,
      road_height_offset: 0.5,
      texture: TextureBlend::channel(1, 1.0),
    }
  }
}

/// A road between two cities with their pre-road heights.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoadSegment {
  pub start: Vec2,
  pub end: Vec2,
  pub start_height: f32,
  pub end_height: f32,
}

impl RoadSegment {
  /// Projection parameter of `p` onto the segment, clamped to [0, 1].
  #[inline]
  pub fn project(&self, p: Vec2) -> f32 {
    let ab = self.end - self.start;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
      return 0.0;
    }
    ((p - self.start).dot(ab) / len_sq).clamp(0.0, 1.0)
  }

  /// Distance from `p` to the closest point on the segment.
  #[inline]
  pub fn distance(&self, p: Vec2) -> f32 {
    let t = self.project(p);
    p.distance(self.start.lerp(self.end, t))
  }

  /// Road surface height at parameter `t`, before the offset.
  #[inline]
  pub fn height_at(&self, t: f32) -> f32 {
    lerp(self.start_height, self.end_height, t)
  }

  /// True if the segment widened by `half_width` can touch `[min, max]`.
  fn touches(&self, min: Vec2, max: Vec2, half_width: f32) -> bool {
    let lo = self.start.min(self.end) - Vec2::splat(half_width);
    let hi = self.start.max(self.end) + Vec2::splat(half_width);
    lo.x <= max.x && hi.x >= min.x && lo.y <= max.y && hi.y >= min.y
  }
}

/// Endpoints of every road in a layout.
///
/// A two-city ring yields a single segment rather than the same road twice.
pub fn road_graph(cities: &CityLayout) -> Vec<(Vec2, Vec2)> {
  let rings = cities.rings();
  let mut edges = Vec::new();

  for ring in rings {
    match ring.len() {
      0 | 1 => {}
      2 => edges.push((ring[0], ring[1])),
      n => {
        for j in 0..n {
          edges.push((ring[j], ring[(j + 1) % n]));
        }
      }
    }
  }

  for pair in rings.windows(2) {
    let (inner, outer) = (&pair[0], &pair[1]);
    for &city in inner {
      let nearest = outer
        .iter()
        .copied()
        .min_by(|a, b| city.distance_squared(*a).total_cmp(&city.distance_squared(*b)));
      if let Some(target) = nearest {
        edges.push((city, target));
      }
    }
  }

  edges
}

/// Flattens a strip along every road toward the interpolated city heights.
pub struct RoadGenerationLayer {
  config: RoadConfig,
  cities: Arc<CityLayout>,
  edges: Vec<(Vec2, Vec2)>,
  segments: RwLock<Option<Arc<Vec<RoadSegment>>>>,
}

impl RoadGenerationLayer {
  pub fn new(config: RoadConfig, cities: Arc<CityLayout>) -> Self {
    let edges = road_graph(&cities);
    tracing::debug!(cities = cities.len(), roads = edges.len(), "built road graph");
    Self {
      config,
      cities,
      edges,
      segments: RwLock::new(None),
    }
  }

  pub fn config(&self) -> &RoadConfig {
    &self.config
  }

  pub fn cities(&self) -> &CityLayout {
    &self.cities
  }

  /// Segments with city heights for the current generation.
  ///
  /// Heights come from the terrain as it was before this layer and are
  /// measured once; roads touching a city with no finite height are dropped.
  pub fn segments(&self, ctx: &LayerContext<'_>) -> Arc<Vec<RoadSegment>> {
    if let Some(cached) = self.segments.read().as_ref() {
      return Arc::clone(cached);
    }

    // Measured outside the lock: sampling re-enters earlier layers.
    let measured = Arc::new(self.measure(ctx));
    Arc::clone(self.segments.write().get_or_insert(measured))
  }

  fn measure(&self, ctx: &LayerContext<'_>) -> Vec<RoadSegment> {
    let heights: Vec<(Vec2, f32)> = self
      .cities
      .centers()
      .iter()
      .map(|&c| (c, ctx.height_before(c)))
      .filter(|(_, h)| h.is_finite())
      .collect();
    let height_of = |p: Vec2| heights.iter().find(|(c, _)| *c == p).map(|(_, h)| *h);

    let mut segments = Vec::with_capacity(self.edges.len());
    for &(start, end) in &self.edges {
      let (Some(start_height), Some(end_height)) = (height_of(start), height_of(end)) else {
        tracing::debug!(?start, ?end, "road endpoint has no height, skipping");
        continue;
      };
      segments.push(RoadSegment {
        start,
        end,
        start_height,
        end_height,
      });
    }
    segments
  }
}

impl TerrainLayer for RoadGenerationLayer {
  fn name(&self) -> &str {
    "road"
  }

  fn on_generation_start(&self) {
    *self.segments.write() = None;
  }

  #[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "layer::road"))]
  fn apply(&self, data: &mut TerrainData, region: &SampleRegion, ctx: &LayerContext<'_>) {
    if self.edges.is_empty() {
      return;
    }

    let half_width = self.config.road_width / 2.0;
    let region_min = region.origin;
    let region_max = region.max();
    let segments = self.segments(ctx);

    for segment in segments.iter() {
      if !segment.touches(region_min, region_max, half_width) {
        continue;
      }
      for z in 0..region.resolution {
        for x in 0..region.resolution {
          let p = region.world_pos(x, z);
          if segment.distance(p) >= half_width {
            continue;
          }
          let road = segment.height_at(segment.project(p)) + self.config.road_height_offset;
          let h = data.height(x, z);
          data.set_height(x, z, lerp(h, road, self.config.flatten_strength));
          self.config.texture.paint(data, x, z);
        }
      }
    }
  }
}
