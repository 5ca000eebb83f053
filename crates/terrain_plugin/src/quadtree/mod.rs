//! Quadtree module for viewer-driven LOD.
//!
//! An explicit tree: every node owns its square, up to four children and at
//! most one chunk. Each tick the tree is walked top-down from the root.
//!
//! # LOD Convention
//!
//! LOD 0 = root (coarsest), higher LOD = finer.
//!
//! ```text
//! node side = root side / 2^lod
//!
//! subdivide  ⇔  |viewer.xz − center| < side  &&  lod < max_lod
//! ```
//!
//! A subdivided node keeps its own chunk visible until all four children are
//! covered by ready chunks, so there are no holes while finer chunks load.
//! A node that stops subdividing releases its whole subtree, grandchildren
//! first.
//!
//! # Module Structure
//!
//! - [`bounds`]: `Rect2` - square footprint and quadrant math
//! - [`node`]: `QuadtreeNode` - update, merge, routing and queries

pub mod bounds;
pub mod node;

pub use bounds::Rect2;
pub use node::QuadtreeNode;

use glam::Vec2;

use crate::layers::LayerStack;
use crate::presentation::ChunkPresenter;
use crate::threading::{ChunkCompletion, ChunkGenerator};

/// Services a tree walk needs: where to queue chunks and where to show them.
pub struct TreeContext<'a> {
  pub generator: &'a ChunkGenerator,
  pub presenter: &'a mut dyn ChunkPresenter,
}

pub struct Quadtree {
  root: QuadtreeNode,
  max_lod: u32,
}

impl Quadtree {
  pub fn new(origin: Vec2, size: f32, max_lod: u32) -> Self {
    Self {
      root: QuadtreeNode::new(origin, size, 0),
      max_lod,
    }
  }

  pub fn root(&self) -> &QuadtreeNode {
    &self.root
  }

  pub fn max_lod(&self) -> u32 {
    self.max_lod
  }

  /// One LOD pass for a viewer at world `(x, z)`.
  #[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "quadtree::update"))]
  pub fn update(&mut self, viewer: Vec2, ctx: &mut TreeContext<'_>) {
    self.root.update(viewer, self.max_lod, ctx);
  }

  /// Subdivide everything to `max_lod` and queue a chunk at every node.
  pub fn pre_generate(&mut self, ctx: &mut TreeContext<'_>) {
    self.root.pre_generate(self.max_lod, ctx);
  }

  /// Show or hide chunks from what is ready, keeping the current shape.
  pub fn refresh_visibility(&mut self, presenter: &mut dyn ChunkPresenter) {
    self.root.refresh_visibility(presenter);
  }

  pub fn find_leaf(&self, world: Vec2) -> &QuadtreeNode {
    self.root.find_leaf(world)
  }

  /// Height from the leaf chunk under `world`, if it is ready.
  pub fn try_height_at(&self, world: Vec2) -> Option<f32> {
    self.find_leaf(world).chunk()?.height_at(world)
  }

  /// Height at `world`, falling back to direct sampling of the layer stack.
  pub fn height_at(&self, world: Vec2, stack: &LayerStack) -> f32 {
    self
      .try_height_at(world)
      .unwrap_or_else(|| stack.sample_height(world))
  }

  /// Hand a worker result to its node. Returns false if it was discarded.
  pub fn apply_completion(
    &mut self,
    completion: ChunkCompletion,
    presenter: &mut dyn ChunkPresenter,
  ) -> bool {
    let ChunkCompletion {
      id,
      origin,
      lod,
      payload,
      ..
    } = completion;
    let delivered = self.root.deliver(id, origin, lod, payload, presenter);
    if !delivered {
      tracing::debug!(?id, ?origin, lod, "discard completion for released chunk");
    }
    delivered
  }

  /// Tear down every chunk.
  pub fn release(self, presenter: &mut dyn ChunkPresenter) {
    self.root.release(presenter);
  }

  /// Visit nodes depth-first, parents first.
  pub fn visit<F: FnMut(&QuadtreeNode)>(&self, mut f: F) {
    self.root.visit(&mut f);
  }

  pub fn node_count(&self) -> usize {
    let mut count = 0;
    self.visit(|_| count += 1);
    count
  }

  pub fn leaf_count(&self) -> usize {
    let mut count = 0;
    self.visit(|n| count += n.is_leaf() as usize);
    count
  }

  /// Chunks that exist but have not been completed yet.
  pub fn pending_chunks(&self) -> usize {
    let mut count = 0;
    self.visit(|n| {
      if n.chunk().is_some_and(|c| !c.is_generation_complete()) {
        count += 1;
      }
    });
    count
  }

  /// Every leaf owns a ready chunk.
  pub fn all_leaves_ready(&self) -> bool {
    let mut ready = true;
    self.visit(|n| {
      if n.is_leaf() && !n.chunk().is_some_and(|c| c.is_generation_complete()) {
        ready = false;
      }
    });
    ready
  }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
