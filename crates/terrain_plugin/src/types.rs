//! Core data types for terrain synthesis and chunk meshing.

use glam::{Vec2, Vec3};

use crate::constants::{grid_index, MAX_TEXTURES, WEIGHT_EPSILON};

/// Per-sample splatmap weights, one per texture channel.
pub type BlendWeights = [f32; MAX_TEXTURES];

/// Heightmap and splatmap for one generation pass.
///
/// Both grids are `resolution x resolution`, row-major (`index = z * res + x`).
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainData {
  resolution: usize,
  heights: Vec<f32>,
  weights: Vec<BlendWeights>,
}

impl TerrainData {
  /// Allocate a zeroed grid. A resolution of 0 is bumped to 1.
  pub fn new(resolution: usize) -> Self {
    let resolution = resolution.max(1);
    let len = resolution * resolution;
    Self {
      resolution,
      heights: vec![0.0; len],
      weights: vec![[0.0; MAX_TEXTURES]; len],
    }
  }

  /// Samples per side.
  #[inline]
  pub fn resolution(&self) -> usize {
    self.resolution
  }

  #[inline]
  pub fn height(&self, x: usize, z: usize) -> f32 {
    self.heights[grid_index(x, z, self.resolution)]
  }

  #[inline]
  pub fn set_height(&mut self, x: usize, z: usize, height: f32) {
    self.heights[grid_index(x, z, self.resolution)] = height;
  }

  /// Add to the height at `(x, z)`.
  #[inline]
  pub fn add_height(&mut self, x: usize, z: usize, delta: f32) {
    self.heights[grid_index(x, z, self.resolution)] += delta;
  }

  #[inline]
  pub fn weights(&self, x: usize, z: usize) -> &BlendWeights {
    &self.weights[grid_index(x, z, self.resolution)]
  }

  /// Add `amount` to one splatmap channel. Out-of-range channels clamp to
  /// the last channel.
  #[inline]
  pub fn add_weight(&mut self, x: usize, z: usize, channel: usize, amount: f32) {
    let channel = channel.min(MAX_TEXTURES - 1);
    self.weights[grid_index(x, z, self.resolution)][channel] += amount;
  }

  /// Raw height buffer (row-major).
  pub fn heights(&self) -> &[f32] {
    &self.heights
  }

  /// Raw weight buffer (row-major).
  pub fn blend_weights(&self) -> &[BlendWeights] {
    &self.weights
  }

  /// Normalize every cell's weights to sum to 1.0.
  ///
  /// Cells with no weight at all fall back to full weight on channel 0.
  pub fn normalize_weights(&mut self) {
    for weights in &mut self.weights {
      normalize_blend(weights);
    }
  }
}

/// Normalize a single weight set in place.
#[inline]
pub fn normalize_blend(weights: &mut BlendWeights) {
  let sum: f32 = weights.iter().sum();
  if sum > WEIGHT_EPSILON {
    let inv_sum = 1.0 / sum;
    for w in weights.iter_mut() {
      *w *= inv_sum;
    }
  } else {
    // Fallback: all weight on texture 0
    *weights = [0.0; MAX_TEXTURES];
    weights[0] = 1.0;
  }
}

/// Grid placement handed to every layer.
///
/// Sample `(x, z)` lies at world position `origin + (x, z) * step`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleRegion {
  /// Samples per side.
  pub resolution: usize,
  /// World-space (x, z) of sample (0, 0).
  pub origin: Vec2,
  /// Quadtree depth of the chunk being generated (0 = coarsest).
  pub lod: u32,
  /// World-space distance between adjacent samples.
  pub step: f32,
}

impl SampleRegion {
  pub fn new(resolution: usize, origin: Vec2, lod: u32, step: f32) -> Self {
    Self {
      resolution,
      origin,
      lod,
      step,
    }
  }

  /// Degenerate one-sample region used for point height queries.
  pub fn point(world: Vec2) -> Self {
    Self::new(1, world, 0, 1.0)
  }

  /// World position of sample `(x, z)`.
  #[inline(always)]
  pub fn world_pos(&self, x: usize, z: usize) -> Vec2 {
    Vec2::new(
      self.origin.x + x as f32 * self.step,
      self.origin.y + z as f32 * self.step,
    )
  }

  /// World-space extent covered by the samples (inclusive).
  pub fn max(&self) -> Vec2 {
    let span = (self.resolution.saturating_sub(1)) as f32 * self.step;
    self.origin + Vec2::splat(span)
  }
}

/// Output vertex with all mesh attributes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainVertex {
  /// Position relative to the chunk origin.
  pub position: [f32; 3],

  /// Smooth surface normal (unit vector).
  pub normal: [f32; 3],

  /// World-space texture coordinate (continuous across chunks).
  pub uv: [f32; 2],

  /// Splatmap weights packed as RGBA.
  pub color: [f32; 4],
}

impl Default for TerrainVertex {
  fn default() -> Self {
    Self {
      position: [0.0; 3],
      normal: [0.0, 1.0, 0.0],
      uv: [0.0; 2],
      color: [1.0, 0.0, 0.0, 0.0],
    }
  }
}

/// Axis-aligned bounding box.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxAABB {
  pub min: [f32; 3],
  pub max: [f32; 3],
}

impl MinMaxAABB {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: [f32::INFINITY; 3],
      max: [f32::NEG_INFINITY; 3],
    }
  }

  /// Create AABB from min/max corners.
  pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
    Self { min, max }
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: [f32; 3]) {
    for i in 0..3 {
      self.min[i] = self.min[i].min(point[i]);
      self.max[i] = self.max[i].max(point[i]);
    }
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min[0] <= self.max[0] && self.min[1] <= self.max[1] && self.min[2] <= self.max[2]
  }
}

impl Default for MinMaxAABB {
  fn default() -> Self {
    Self::empty()
  }
}

/// Renderable chunk mesh.
#[derive(Clone, Debug, Default)]
pub struct ChunkMesh {
  /// Output vertices, `(R+1)²` of them.
  pub vertices: Vec<TerrainVertex>,

  /// Triangle indices (3 indices per triangle).
  pub indices: Vec<u32>,

  /// Bounding box encompassing all vertices (chunk-local).
  pub bounds: MinMaxAABB,
}

impl ChunkMesh {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns true if no geometry was generated.
  pub fn is_empty(&self) -> bool {
    self.vertices.is_empty()
  }

  /// Number of triangles in the mesh.
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }
}

/// Triangle-mesh collision volume in chunk-local space.
#[derive(Clone, Debug, Default)]
pub struct TrimeshCollider {
  pub vertices: Vec<Vec3>,
  pub triangles: Vec<[u32; 3]>,
}

impl TrimeshCollider {
  pub fn triangle_count(&self) -> usize {
    self.triangles.len()
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
