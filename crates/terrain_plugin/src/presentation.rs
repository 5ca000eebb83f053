//! ChunkPresenter - callback interface for scene integration.
//!
//! The terrain core never touches a scene graph. When a chunk is ready, shown,
//! hidden or torn down, it calls into a `ChunkPresenter` that owns the
//! engine-side mesh instance and collision body.
//!
//! All calls happen on the thread driving `Terrain::update`.

use std::collections::HashMap;

use glam::Vec2;

use crate::chunk::ChunkId;
use crate::types::{ChunkMesh, TrimeshCollider};

/// Scene services consumed by the terrain.
///
/// # Example
///
/// ```ignore
/// struct EnginePresenter { scene: Scene }
///
/// impl ChunkPresenter for EnginePresenter {
///     fn attach_chunk(&mut self, id: ChunkId, origin: Vec2, mesh: &ChunkMesh,
///                     collider: &TrimeshCollider, visible: bool) {
///         self.scene.spawn_terrain(id, origin, mesh, collider, visible);
///     }
///     // ...
/// }
/// ```
pub trait ChunkPresenter {
  /// A chunk finished generating. `origin` is the world (x, z) of its local
  /// (0, 0); mesh and collider positions are relative to it.
  fn attach_chunk(
    &mut self,
    id: ChunkId,
    origin: Vec2,
    mesh: &ChunkMesh,
    collider: &TrimeshCollider,
    visible: bool,
  );

  /// Toggle rendering of an attached chunk.
  fn set_chunk_visible(&mut self, id: ChunkId, visible: bool);

  /// Remove mesh instance and collision body.
  fn detach_chunk(&mut self, id: ChunkId);
}

/// No-op implementation for testing and headless operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPresenter;

impl ChunkPresenter for NullPresenter {
  fn attach_chunk(
    &mut self,
    _id: ChunkId,
    _origin: Vec2,
    _mesh: &ChunkMesh,
    _collider: &TrimeshCollider,
    _visible: bool,
  ) {
  }

  fn set_chunk_visible(&mut self, _id: ChunkId, _visible: bool) {}

  fn detach_chunk(&mut self, _id: ChunkId) {}
}

/// What a [`TrackingPresenter`] knows about one attached chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresentedChunk {
  pub origin: Vec2,
  pub visible: bool,
  pub triangles: usize,
}

/// Headless presenter that records scene state.
///
/// Useful for tools and tests that need to inspect what would be on screen.
#[derive(Debug, Default)]
pub struct TrackingPresenter {
  chunks: HashMap<ChunkId, PresentedChunk>,
  attached_total: usize,
  detached_total: usize,
}

impl TrackingPresenter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, id: ChunkId) -> Option<&PresentedChunk> {
    self.chunks.get(&id)
  }

  /// Chunks currently attached.
  pub fn len(&self) -> usize {
    self.chunks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.chunks.is_empty()
  }

  pub fn visible_count(&self) -> usize {
    self.chunks.values().filter(|c| c.visible).count()
  }

  pub fn visible_triangles(&self) -> usize {
    self.chunks.values().filter(|c| c.visible).map(|c| c.triangles).sum()
  }

  pub fn attached_total(&self) -> usize {
    self.attached_total
  }

  pub fn detached_total(&self) -> usize {
    self.detached_total
  }
}

impl ChunkPresenter for TrackingPresenter {
  fn attach_chunk(
    &mut self,
    id: ChunkId,
    origin: Vec2,
    mesh: &ChunkMesh,
    _collider: &TrimeshCollider,
    visible: bool,
  ) {
    self.attached_total += 1;
    self.chunks.insert(
      id,
      PresentedChunk {
        origin,
        visible,
        triangles: mesh.triangle_count(),
      },
    );
  }

  fn set_chunk_visible(&mut self, id: ChunkId, visible: bool) {
    match self.chunks.get_mut(&id) {
      Some(chunk) => chunk.visible = visible,
      None => tracing::warn!(?id, "visibility change for unknown chunk"),
    }
  }

  fn detach_chunk(&mut self, id: ChunkId) {
    if self.chunks.remove(&id).is_some() {
      self.detached_total += 1;
    } else {
      tracing::warn!(?id, "detach of unknown chunk");
    }
  }
}
