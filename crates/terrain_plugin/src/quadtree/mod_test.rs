use std::sync::Arc;

use super::*;
use crate::layers::{NoiseLayerConfig, PerlinNoiseLayer, TerrainLayer};
use crate::presentation::TrackingPresenter;
use crate::threading::ExecutionMode;

const WORLD: f32 = 1024.0;
const FAR: Vec2 = Vec2::new(5000.0, 5000.0);

struct Harness {
  tree: Quadtree,
  generator: ChunkGenerator,
  presenter: TrackingPresenter,
}

impl Harness {
  fn new(max_lod: u32) -> Self {
    let stack = LayerStack::new(vec![
      Box::new(PerlinNoiseLayer::new(NoiseLayerConfig::default())) as Box<dyn TerrainLayer>
    ]);
    Self {
      tree: Quadtree::new(Vec2::ZERO, WORLD, max_lod),
      generator: ChunkGenerator::new(Arc::new(stack), 4, ExecutionMode::Inline),
      presenter: TrackingPresenter::new(),
    }
  }

  fn update(&mut self, viewer: Vec2) {
    let mut ctx = TreeContext {
      generator: &self.generator,
      presenter: &mut self.presenter,
    };
    self.tree.update(viewer, &mut ctx);
  }

  /// Apply queued completions; returns (delivered, discarded).
  fn deliver(&mut self) -> (usize, usize) {
    let mut delivered = 0;
    let mut discarded = 0;
    for completion in self.generator.drain() {
      if self.tree.apply_completion(completion, &mut self.presenter) {
        delivered += 1;
      } else {
        discarded += 1;
      }
    }
    (delivered, discarded)
  }

  fn settle(&mut self, viewer: Vec2) {
    self.update(viewer);
    self.deliver();
    self.update(viewer);
  }

  fn leaves_by_lod(&self) -> Vec<usize> {
    let mut counts = vec![0; self.tree.max_lod() as usize + 1];
    self.tree.visit(|n| {
      if n.is_leaf() {
        counts[n.lod() as usize] += 1;
      }
    });
    counts
  }
}

/// Every node either has children (own chunk absent or hidden) or shows a
/// ready chunk.
fn assert_displayed_invariant(tree: &Quadtree) {
  tree.visit(|n| match n.children() {
    Some(_) => {
      if let Some(chunk) = n.chunk() {
        assert!(!chunk.is_visible(), "subdivided node shows its chunk: {n:?}");
      }
    }
    None => {
      let chunk = n.chunk().expect("leaf without chunk");
      assert!(chunk.is_visible(), "hidden leaf chunk: {n:?}");
      assert!(chunk.is_generation_complete(), "leaf not ready: {n:?}");
    }
  });
}

#[test]
fn test_leaf_count_for_viewer_at_origin() {
  let mut h = Harness::new(3);
  h.update(Vec2::ZERO);

  assert_eq!(h.tree.leaf_count(), 10);
  assert_eq!(h.leaves_by_lod(), vec![0, 3, 3, 4]);
  assert_eq!(h.tree.pending_chunks(), 10);
}

#[test]
fn test_children_follow_quadrant_order() {
  let mut h = Harness::new(1);
  h.update(Vec2::ZERO);

  let children = h.tree.root().children().expect("subdivided");
  let origins: Vec<Vec2> = children.iter().map(|c| c.origin()).collect();
  assert_eq!(
    origins,
    vec![
      Vec2::new(0.0, 0.0),
      Vec2::new(512.0, 0.0),
      Vec2::new(0.0, 512.0),
      Vec2::new(512.0, 512.0),
    ]
  );
  assert!(children.iter().all(|c| c.size() == 512.0 && c.lod() == 1));
}

#[test]
fn test_settled_tree_upholds_invariant() {
  let mut h = Harness::new(3);
  h.settle(Vec2::ZERO);

  assert_displayed_invariant(&h.tree);
  assert!(h.tree.all_leaves_ready());
  assert_eq!(h.presenter.visible_count(), 10);
  assert_eq!(h.presenter.len(), 10);
}

#[test]
fn test_max_lod_zero_keeps_single_chunk() {
  let mut h = Harness::new(0);
  h.settle(Vec2::new(512.0, 512.0));

  assert_eq!(h.tree.node_count(), 1);
  assert!(h.tree.root().is_leaf());
  assert_eq!(h.presenter.visible_count(), 1);
}

#[test]
fn test_viewer_leaving_merges_subtree() {
  let mut h = Harness::new(3);
  h.settle(Vec2::ZERO);
  h.settle(FAR);

  assert_eq!(h.tree.node_count(), 1);
  assert_eq!(h.presenter.detached_total(), 10);
  assert_eq!(h.presenter.len(), 1);
  assert_displayed_invariant(&h.tree);
}

#[test]
fn test_parent_visible_until_children_ready() {
  let mut h = Harness::new(1);
  h.settle(FAR);
  let root_id = h.tree.root().chunk().expect("root chunk").id();

  h.update(Vec2::ZERO);
  assert!(!h.tree.root().is_leaf());
  assert!(h.presenter.get(root_id).expect("attached").visible);

  h.deliver();
  h.update(Vec2::ZERO);
  assert!(!h.presenter.get(root_id).expect("attached").visible);
  assert_eq!(h.presenter.visible_count(), 4);
  assert_displayed_invariant(&h.tree);

  // Back out again: the kept root chunk is shown, children detached.
  h.update(FAR);
  assert!(h.presenter.get(root_id).expect("attached").visible);
  assert_eq!(h.presenter.len(), 1);
}

#[test]
fn test_completions_for_released_chunks_are_discarded() {
  let mut h = Harness::new(3);
  h.update(Vec2::ZERO);
  h.update(FAR);

  let (delivered, discarded) = h.deliver();
  assert_eq!(delivered, 1, "only the new root chunk survives");
  assert_eq!(discarded, 10);
  assert_eq!(h.presenter.len(), 1);
}

#[test]
fn test_pre_generate_fills_every_level() {
  let mut h = Harness::new(3);
  {
    let mut ctx = TreeContext {
      generator: &h.generator,
      presenter: &mut h.presenter,
    };
    h.tree.pre_generate(&mut ctx);
  }

  assert_eq!(h.tree.node_count(), 1 + 4 + 16 + 64);
  assert_eq!(h.tree.pending_chunks(), 85);

  let (delivered, discarded) = h.deliver();
  assert_eq!((delivered, discarded), (85, 0));
  assert_eq!(h.presenter.len(), 85);

  h.tree.refresh_visibility(&mut h.presenter);
  assert_eq!(h.presenter.visible_count(), 64);
  assert_displayed_invariant(&h.tree);
}

#[test]
fn test_pre_generated_root_shows_before_children_land() {
  let mut h = Harness::new(2);
  {
    let mut ctx = TreeContext {
      generator: &h.generator,
      presenter: &mut h.presenter,
    };
    h.tree.pre_generate(&mut ctx);
  }

  let root = h
    .generator
    .drain()
    .into_iter()
    .find(|c| c.lod == 0)
    .expect("root completion");
  assert!(h.tree.apply_completion(root, &mut h.presenter));
  h.tree.refresh_visibility(&mut h.presenter);

  let root_id = h.tree.root().chunk().expect("root chunk").id();
  assert!(h.tree.root().chunk().expect("root chunk").is_generation_complete());
  assert!(h.presenter.get(root_id).expect("attached").visible);
  assert_eq!(h.presenter.len(), 1);
  assert_eq!(h.presenter.visible_count(), 1);
}

#[test]
fn test_pre_generated_parent_hides_once_children_cover_it() {
  let mut h = Harness::new(1);
  {
    let mut ctx = TreeContext {
      generator: &h.generator,
      presenter: &mut h.presenter,
    };
    h.tree.pre_generate(&mut ctx);
  }

  let mut completions = h.generator.drain();
  completions.sort_by_key(|c| c.lod);
  let mut completions = completions.into_iter();
  let root = completions.next().expect("root completion");
  assert!(h.tree.apply_completion(root, &mut h.presenter));

  // Three of four children ready: the root still fills the gap.
  for child in completions.by_ref().take(3) {
    assert!(h.tree.apply_completion(child, &mut h.presenter));
  }
  h.tree.refresh_visibility(&mut h.presenter);
  let root_id = h.tree.root().chunk().expect("root chunk").id();
  assert!(h.presenter.get(root_id).expect("attached").visible);

  for child in completions {
    assert!(h.tree.apply_completion(child, &mut h.presenter));
  }
  h.tree.refresh_visibility(&mut h.presenter);
  assert!(!h.presenter.get(root_id).expect("attached").visible);
  assert_eq!(h.presenter.visible_count(), 4);
  assert_displayed_invariant(&h.tree);
}

#[test]
fn test_find_leaf_descends_to_deepest_node() {
  let mut h = Harness::new(3);
  h.update(Vec2::ZERO);

  let leaf = h.tree.find_leaf(Vec2::new(10.0, 10.0));
  assert_eq!(leaf.lod(), 3);
  assert!(leaf.bounds().contains(Vec2::new(10.0, 10.0)));

  let coarse = h.tree.find_leaf(Vec2::new(900.0, 900.0));
  assert_eq!(coarse.lod(), 1);
}

#[test]
fn test_height_falls_back_until_ready() {
  let mut h = Harness::new(2);
  h.update(Vec2::ZERO);
  let p = Vec2::new(32.0, 64.0);
  let direct = h.generator.stack().sample_height(p);

  assert_eq!(h.tree.try_height_at(p), None);
  assert_eq!(h.tree.height_at(p, h.generator.stack()), direct);

  h.deliver();
  // Lod 2 chunks are 256 wide with 4 cells: (32, 64) is interpolated.
  let from_chunk = h.tree.try_height_at(p).expect("ready");
  assert!(from_chunk.is_finite());

  let vertex = Vec2::new(64.0, 128.0);
  let at_vertex = h.tree.height_at(vertex, h.generator.stack());
  assert!((at_vertex - h.generator.stack().sample_height(vertex)).abs() < 1e-4);
}

#[test]
fn test_release_detaches_everything() {
  let mut h = Harness::new(2);
  h.settle(Vec2::ZERO);
  assert!(!h.presenter.is_empty());

  let Harness {
    tree, mut presenter, ..
  } = h;
  tree.release(&mut presenter);
  assert!(presenter.is_empty());
}
