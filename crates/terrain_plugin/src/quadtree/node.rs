//! QuadtreeNode - one square of the LOD tree, owning at most one chunk.
//!
//! LOD 0 = the root (coarsest), each level halves the side length.

use glam::Vec2;

use super::bounds::Rect2;
use super::TreeContext;
use crate::chunk::{ChunkId, TerrainChunk};
use crate::presentation::ChunkPresenter;
use crate::threading::ChunkPayload;

pub struct QuadtreeNode {
  bounds: Rect2,
  lod: u32,
  children: Option<Box<[QuadtreeNode; 4]>>,
  chunk: Option<TerrainChunk>,
}

impl QuadtreeNode {
  pub fn new(origin: Vec2, size: f32, lod: u32) -> Self {
    Self {
      bounds: Rect2::new(origin, size),
      lod,
      children: None,
      chunk: None,
    }
  }

  pub fn bounds(&self) -> Rect2 {
    self.bounds
  }

  pub fn origin(&self) -> Vec2 {
    self.bounds.origin
  }

  pub fn size(&self) -> f32 {
    self.bounds.size
  }

  pub fn center(&self) -> Vec2 {
    self.bounds.center()
  }

  pub fn lod(&self) -> u32 {
    self.lod
  }

  pub fn is_leaf(&self) -> bool {
    self.children.is_none()
  }

  pub fn children(&self) -> Option<&[QuadtreeNode; 4]> {
    self.children.as_deref()
  }

  pub fn chunk(&self) -> Option<&TerrainChunk> {
    self.chunk.as_ref()
  }

  fn split(&mut self) {
    let lod = self.lod + 1;
    let b = self.bounds;
    let child = |i: usize| {
      let r = b.quadrant_rect(i);
      QuadtreeNode::new(r.origin, r.size, lod)
    };
    self.children = Some(Box::new([child(0), child(1), child(2), child(3)]));
  }

  /// Apply the LOD rule for `viewer`, top-down.
  pub(crate) fn update(&mut self, viewer: Vec2, max_lod: u32, ctx: &mut TreeContext<'_>) {
    let distance = viewer.distance(self.center());

    if distance < self.size() && self.lod < max_lod {
      if self.children.is_none() {
        self.split();
      }
      if let Some(children) = self.children.as_deref_mut() {
        for child in children.iter_mut() {
          child.update(viewer, max_lod, ctx);
        }
      }
      self.show_unless_covered(ctx.presenter);
    } else {
      self.merge(ctx.presenter);
      match self.chunk.as_mut() {
        Some(chunk) => chunk.show(ctx.presenter),
        None => {
          self.chunk = Some(TerrainChunk::generate(
            ctx.generator,
            self.origin(),
            self.size(),
            self.lod,
          ))
        }
      }
    }
  }

  /// Keep the own chunk on screen until the children can replace it.
  fn show_unless_covered(&mut self, presenter: &mut dyn ChunkPresenter) {
    let covered = self
      .children
      .as_deref()
      .is_some_and(|children| children.iter().all(QuadtreeNode::is_covered));
    if let Some(chunk) = self.chunk.as_mut() {
      if covered {
        chunk.hide(presenter);
      } else {
        chunk.show(presenter);
      }
    }
  }

  /// Re-evaluate chunk visibility bottom-up without changing the tree shape.
  pub(crate) fn refresh_visibility(&mut self, presenter: &mut dyn ChunkPresenter) {
    if let Some(children) = self.children.as_deref_mut() {
      for child in children.iter_mut() {
        child.refresh_visibility(presenter);
      }
    }
    self.show_unless_covered(presenter);
  }

  /// Give every node down to `max_lod` a chunk. Every chunk starts shown;
  /// [`refresh_visibility`](Self::refresh_visibility) hides parents as their
  /// children land.
  pub(crate) fn pre_generate(&mut self, max_lod: u32, ctx: &mut TreeContext<'_>) {
    if self.chunk.is_none() {
      self.chunk = Some(TerrainChunk::generate(
        ctx.generator,
        self.origin(),
        self.size(),
        self.lod,
      ));
    }
    if self.lod >= max_lod {
      return;
    }

    if self.children.is_none() {
      self.split();
    }
    if let Some(children) = self.children.as_deref_mut() {
      for child in children.iter_mut() {
        child.pre_generate(max_lod, ctx);
      }
    }
  }

  /// Collapse the subtree below this node.
  pub(crate) fn merge(&mut self, presenter: &mut dyn ChunkPresenter) {
    if let Some(children) = self.children.take() {
      tracing::debug!(lod = self.lod, origin = ?self.origin(), "merge node");
      for child in *children {
        child.release(presenter);
      }
    }
  }

  /// Tear down this node's subtree, deepest chunks first.
  pub(crate) fn release(mut self, presenter: &mut dyn ChunkPresenter) {
    self.merge(presenter);
    if let Some(chunk) = self.chunk.take() {
      chunk.release(presenter);
    }
  }

  /// Whether this node's area is fully drawn by ready chunks: either its own
  /// shown chunk, or all four children.
  pub fn is_covered(&self) -> bool {
    let own = self
      .chunk
      .as_ref()
      .is_some_and(|c| c.is_generation_complete() && c.is_visible());
    own
      || self
        .children
        .as_deref()
        .is_some_and(|children| children.iter().all(QuadtreeNode::is_covered))
  }

  /// Deepest node containing `world` (nearest quadrant when outside).
  pub fn find_leaf(&self, world: Vec2) -> &QuadtreeNode {
    let mut node = self;
    while let Some(children) = node.children.as_deref() {
      node = &children[node.bounds.quadrant(world)];
    }
    node
  }

  /// Route a finished payload to the node that queued it.
  ///
  /// Returns false when that node or chunk no longer exists.
  pub(crate) fn deliver(
    &mut self,
    id: ChunkId,
    origin: Vec2,
    lod: u32,
    payload: ChunkPayload,
    presenter: &mut dyn ChunkPresenter,
  ) -> bool {
    let mut node = self;
    while node.lod < lod {
      let quadrant = node.bounds.quadrant(origin);
      match node.children.as_deref_mut() {
        Some(children) => node = &mut children[quadrant],
        None => return false,
      }
    }

    if node.lod != lod || node.origin() != origin {
      return false;
    }
    match node.chunk.as_mut() {
      Some(chunk) if chunk.id() == id => {
        chunk.complete(payload, presenter);
        true
      }
      _ => false,
    }
  }

  /// Depth-first, parents before children.
  pub fn visit<F: FnMut(&QuadtreeNode)>(&self, f: &mut F) {
    f(self);
    if let Some(children) = self.children.as_deref() {
      for child in children {
        child.visit(f);
      }
    }
  }
}

impl std::fmt::Debug for QuadtreeNode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QuadtreeNode")
      .field("bounds", &self.bounds)
      .field("lod", &self.lod)
      .field("leaf", &self.is_leaf())
      .field("chunk", &self.chunk)
      .finish()
  }
}
