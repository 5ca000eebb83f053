//! Heightmap sampling, mesh and collider construction for one chunk.
//!
//! ```text
//!   tl ──── tr        quad (x, z) → two triangles
//!   │ ╲  B  │           A = (tl, bl, tr)
//!   │  ╲    │           B = (tr, bl, br)
//!   │ A ╲   │
//!   bl ──── br        tl = (x, z), bl = (x, z+1)
//! ```
//!
//! The winding makes flat terrain face +Y. `sample_grid` interpolates on the
//! same diagonal so point queries agree with the rendered surface.

use glam::{Vec2, Vec3, Vec3A};

use crate::constants::grid_index;
use crate::layers::LayerStack;
use crate::types::{ChunkMesh, MinMaxAABB, SampleRegion, TerrainData, TerrainVertex, TrimeshCollider};

/// Run the layer stack over one chunk footprint.
///
/// The grid has `resolution + 1` samples per side so edges are shared with
/// neighbors. Blend weights are normalized before returning.
#[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "chunk::generate"))]
pub fn generate_chunk_data(
  stack: &LayerStack,
  origin: Vec2,
  size: f32,
  lod: u32,
  resolution: u32,
) -> TerrainData {
  let resolution = resolution.max(1);
  let samples = resolution as usize + 1;
  let step = size / resolution as f32;
  let region = SampleRegion::new(samples, origin, lod, step);

  let mut data = TerrainData::new(samples);
  stack.apply_all(&mut data, &region);
  data.normalize_weights();
  data
}

/// Build the render mesh for a generated grid.
///
/// Positions are chunk-local, UVs are world-space, vertex color carries the
/// blend weights.
#[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "chunk::mesh"))]
pub fn build_mesh(data: &TerrainData, step: f32, origin: Vec2) -> ChunkMesh {
  let samples = data.resolution();
  let cells = samples.saturating_sub(1);

  let mut mesh = ChunkMesh {
    vertices: Vec::with_capacity(samples * samples),
    indices: Vec::with_capacity(cells * cells * 6),
    bounds: MinMaxAABB::empty(),
  };

  for z in 0..samples {
    for x in 0..samples {
      let local = [x as f32 * step, data.height(x, z), z as f32 * step];
      mesh.bounds.encapsulate(local);
      mesh.vertices.push(TerrainVertex {
        position: local,
        normal: [0.0; 3],
        uv: [origin.x + local[0], origin.y + local[2]],
        color: *data.weights(x, z),
      });
    }
  }

  for z in 0..cells {
    for x in 0..cells {
      let tl = grid_index(x, z, samples) as u32;
      let tr = grid_index(x + 1, z, samples) as u32;
      let bl = grid_index(x, z + 1, samples) as u32;
      let br = grid_index(x + 1, z + 1, samples) as u32;
      mesh.indices.extend_from_slice(&[tl, bl, tr, tr, bl, br]);
    }
  }

  compute_smooth_normals(&mut mesh);
  mesh
}

/// Area-weighted vertex normals: unnormalized face normals summed per vertex.
fn compute_smooth_normals(mesh: &mut ChunkMesh) {
  let mut accum = vec![Vec3A::ZERO; mesh.vertices.len()];

  for tri in mesh.indices.chunks_exact(3) {
    let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
    let p0 = Vec3A::from_array(mesh.vertices[i0].position);
    let p1 = Vec3A::from_array(mesh.vertices[i1].position);
    let p2 = Vec3A::from_array(mesh.vertices[i2].position);

    // Cross product length is twice the triangle area.
    let face = (p1 - p0).cross(p2 - p0);
    accum[i0] += face;
    accum[i1] += face;
    accum[i2] += face;
  }

  for (vertex, n) in mesh.vertices.iter_mut().zip(accum) {
    let len_sq = n.length_squared();
    vertex.normal = if len_sq < 1e-12 {
      [0.0, 1.0, 0.0]
    } else {
      (n * len_sq.sqrt().recip()).to_array()
    };
  }
}

/// Collision trimesh sharing the render mesh's vertices and triangulation.
pub fn build_collider(mesh: &ChunkMesh) -> TrimeshCollider {
  TrimeshCollider {
    vertices: mesh.vertices.iter().map(|v| Vec3::from_array(v.position)).collect(),
    triangles: mesh
      .indices
      .chunks_exact(3)
      .map(|t| [t[0], t[1], t[2]])
      .collect(),
  }
}

/// Height at a chunk-local position, interpolated on the mesh triangles.
///
/// `local` is clamped to the grid.
pub fn sample_grid(data: &TerrainData, step: f32, local: Vec2) -> f32 {
  let samples = data.resolution();
  if samples < 2 || step <= 0.0 {
    return data.height(0, 0);
  }

  let cells = (samples - 1) as f32;
  let gx = (local.x / step).clamp(0.0, cells);
  let gz = (local.y / step).clamp(0.0, cells);

  let x = (gx.floor() as usize).min(samples - 2);
  let z = (gz.floor() as usize).min(samples - 2);
  let fx = gx - x as f32;
  let fz = gz - z as f32;

  let h_tl = data.height(x, z);
  let h_tr = data.height(x + 1, z);
  let h_bl = data.height(x, z + 1);
  let h_br = data.height(x + 1, z + 1);

  if fx + fz <= 1.0 {
    h_tl + (h_tr - h_tl) * fx + (h_bl - h_tl) * fz
  } else {
    h_br + (h_bl - h_br) * (1.0 - fx) + (h_tr - h_br) * (1.0 - fz)
  }
}

#[cfg(test)]
#[path = "build_test.rs"]
mod build_test;
