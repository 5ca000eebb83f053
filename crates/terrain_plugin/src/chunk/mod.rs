//! One square patch of terrain at one LOD.
//!
//! A chunk is created in the `Pending` state with its job already queued.
//! When the completion is routed back it turns `Ready`, keeps its heightmap
//! for point queries and hands mesh and collider to the presenter.
//! Visibility is recorded even while pending and applied on attach.

pub mod build;

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec2;

use crate::presentation::ChunkPresenter;
use crate::threading::{ChunkGenerator, ChunkPayload};
use crate::types::TerrainData;

pub use build::{build_collider, build_mesh, generate_chunk_data, sample_grid};

/// Process-unique chunk identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(u64);

impl ChunkId {
  pub fn next() -> Self {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    Self(COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  pub fn raw(self) -> u64 {
    self.0
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
  /// Job queued, no geometry yet.
  Pending,
  /// Geometry attached to the presenter.
  Ready,
}

pub struct TerrainChunk {
  id: ChunkId,
  origin: Vec2,
  size: f32,
  lod: u32,
  visible: bool,
  ready: Option<ReadyGrid>,
}

struct ReadyGrid {
  data: TerrainData,
  step: f32,
}

impl TerrainChunk {
  /// Create a chunk and queue its generation job.
  pub fn generate(generator: &ChunkGenerator, origin: Vec2, size: f32, lod: u32) -> Self {
    let id = ChunkId::next();
    tracing::debug!(?id, ?origin, size, lod, "queue chunk");
    generator.queue(id, origin, size, lod);
    Self {
      id,
      origin,
      size,
      lod,
      visible: true,
      ready: None,
    }
  }

  pub fn id(&self) -> ChunkId {
    self.id
  }

  pub fn origin(&self) -> Vec2 {
    self.origin
  }

  pub fn size(&self) -> f32 {
    self.size
  }

  pub fn lod(&self) -> u32 {
    self.lod
  }

  pub fn state(&self) -> ChunkState {
    if self.ready.is_some() {
      ChunkState::Ready
    } else {
      ChunkState::Pending
    }
  }

  pub fn is_generation_complete(&self) -> bool {
    self.ready.is_some()
  }

  /// Requested visibility (applies once ready).
  pub fn is_visible(&self) -> bool {
    self.visible
  }

  /// Whether `world` lies within this chunk's footprint (edges inclusive).
  #[inline]
  pub fn contains(&self, world: Vec2) -> bool {
    let local = world - self.origin;
    local.x >= 0.0 && local.y >= 0.0 && local.x <= self.size && local.y <= self.size
  }

  /// Install a finished payload and attach it to the scene.
  pub fn complete(&mut self, payload: ChunkPayload, presenter: &mut dyn ChunkPresenter) {
    if self.ready.is_some() {
      tracing::warn!(id = ?self.id, "duplicate completion ignored");
      return;
    }
    presenter.attach_chunk(
      self.id,
      self.origin,
      &payload.mesh,
      &payload.collider,
      self.visible,
    );
    tracing::debug!(
      id = ?self.id,
      lod = self.lod,
      triangles = payload.mesh.triangle_count(),
      visible = self.visible,
      "attach chunk"
    );
    self.ready = Some(ReadyGrid {
      data: payload.data,
      step: payload.step,
    });
  }

  /// Height at a world position. `None` until ready or when outside.
  pub fn height_at(&self, world: Vec2) -> Option<f32> {
    let grid = self.ready.as_ref()?;
    if !self.contains(world) {
      return None;
    }
    Some(sample_grid(&grid.data, grid.step, world - self.origin))
  }

  pub fn show(&mut self, presenter: &mut dyn ChunkPresenter) {
    self.set_visible(true, presenter);
  }

  pub fn hide(&mut self, presenter: &mut dyn ChunkPresenter) {
    self.set_visible(false, presenter);
  }

  fn set_visible(&mut self, visible: bool, presenter: &mut dyn ChunkPresenter) {
    if self.visible == visible {
      return;
    }
    self.visible = visible;
    if self.ready.is_some() {
      presenter.set_chunk_visible(self.id, visible);
    }
  }

  /// Tear down scene resources. A pending job's result will be discarded.
  pub fn release(self, presenter: &mut dyn ChunkPresenter) {
    if self.ready.is_some() {
      presenter.detach_chunk(self.id);
    }
    tracing::debug!(id = ?self.id, lod = self.lod, "release chunk");
  }
}

impl std::fmt::Debug for TerrainChunk {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TerrainChunk")
      .field("id", &self.id)
      .field("origin", &self.origin)
      .field("size", &self.size)
      .field("lod", &self.lod)
      .field("visible", &self.visible)
      .field("state", &self.state())
      .finish()
  }
}
