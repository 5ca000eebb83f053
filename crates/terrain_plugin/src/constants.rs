//! Shared constants for terrain chunks and layers.
//!
//! # Grid Layout
//!
//! ```text
//! A chunk with resolution R covers R x R cells and stores (R+1)² samples:
//!
//!   z
//!   │  (0,R) ─── (1,R) ─── ... ─── (R,R)
//!   │    │         │                 │
//!   │  (0,1) ─── (1,1) ─── ... ─── (R,1)
//!   │    │         │                 │
//!   │  (0,0) ─── (1,0) ─── ... ─── (R,0)
//!   └──────────────────────────────────── x
//!
//! index = z * (R + 1) + x
//! world = chunk_origin + (x, z) * step,   step = chunk_size / R
//! ```
//!
//! Edge samples are shared with the neighboring chunk at the same LOD, which
//! is what keeps heights continuous across chunk borders.

/// Number of splatmap texture channels (packed as RGBA vertex color).
pub const MAX_TEXTURES: usize = 4;

/// Default cells per chunk side.
pub const DEFAULT_CHUNK_RESOLUTION: u32 = 128;

/// Default world width in world units.
pub const DEFAULT_WORLD_WIDTH: f32 = 1024.0;

/// Default world depth in world units.
pub const DEFAULT_WORLD_DEPTH: f32 = 1024.0;

/// Default deepest quadtree level.
pub const DEFAULT_MAX_LOD: u32 = 3;

/// Upper bound for `max_lod`; each level quadruples the worst-case chunk count.
pub const MAX_LOD_LIMIT: u32 = 12;

/// Upper bound on generated city rings.
pub const MAX_CITY_RINGS: u32 = 256;

/// Upper bound on the total number of generated cities.
pub const MAX_CITIES: u64 = 65_536;

/// Weight sums below this are treated as "no texture assigned".
pub const WEIGHT_EPSILON: f32 = 1e-4;

/// Convert grid coordinates to a flat row-major index.
#[inline(always)]
pub const fn grid_index(x: usize, z: usize, resolution: usize) -> usize {
  z * resolution + x
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
