use super::*;
use crate::city::CityConfig;
use crate::layers::{LayerConfig, NoiseLayerConfig};
use crate::presentation::{NullPresenter, TrackingPresenter};
use crate::threading::ExecutionMode;

fn small_config() -> TerrainConfig {
  TerrainConfig {
    width: 1024.0,
    depth: 1024.0,
    chunk_resolution: 8,
    max_lod: 3,
    execution: ExecutionMode::Inline,
    city: CityConfig {
      max_radius: 1000.0,
      ..Default::default()
    },
    ..Default::default()
  }
}

fn terrain(config: TerrainConfig) -> Terrain<TrackingPresenter> {
  let mut terrain = Terrain::from_config(config, TrackingPresenter::new()).expect("valid layers");
  terrain.init().expect("init");
  terrain
}

/// Two ticks: the first queues (inline jobs finish immediately), the second
/// delivers and settles visibility.
fn settle(terrain: &mut Terrain<TrackingPresenter>) {
  terrain.update(0.016);
  terrain.update(0.016);
}

#[test]
fn test_generation_finishes_and_fires_once() {
  let mut terrain = terrain(small_config());
  terrain.set_viewer(Some(Vec3::new(0.0, 50.0, 0.0)));

  terrain.update(0.016);
  assert!(!terrain.is_generation_finished());
  assert!(terrain.take_events().is_empty());

  terrain.update(0.016);
  assert!(terrain.is_generation_finished());
  assert_eq!(terrain.take_events(), vec![TerrainEvent::GenerationFinished]);

  terrain.update(0.016);
  assert!(terrain.take_events().is_empty(), "event must not repeat");
  assert_eq!(terrain.presenter().visible_count(), 10);
}

#[test]
fn test_event_fires_again_after_viewer_moves() {
  let mut terrain = terrain(small_config());
  terrain.set_viewer(Some(Vec3::ZERO));
  settle(&mut terrain);
  terrain.take_events();

  terrain.set_viewer(Some(Vec3::new(1000.0, 0.0, 1000.0)));
  terrain.update(0.016);
  assert!(!terrain.is_generation_finished());
  terrain.update(0.016);
  assert_eq!(terrain.take_events(), vec![TerrainEvent::GenerationFinished]);
}

#[test]
fn test_no_viewer_skips_lod() {
  let mut terrain = terrain(small_config());
  terrain.update(0.016);
  terrain.update(0.016);

  let tree = terrain.quadtree().expect("initialized");
  assert_eq!(tree.node_count(), 1);
  assert!(tree.root().chunk().is_none());
  assert!(terrain.presenter().is_empty());
}

#[test]
fn test_invalid_config_skips_generation() {
  let mut terrain = Terrain::from_config(
    TerrainConfig {
      width: -5.0,
      ..small_config()
    },
    NullPresenter,
  )
  .expect("layers are valid");

  assert!(matches!(
    terrain.init(),
    Err(TerrainError::InvalidDimensions { .. })
  ));
  assert!(!terrain.is_initialized());

  terrain.set_viewer(Some(Vec3::ZERO));
  terrain.update(0.016);
  assert!(terrain.quadtree().is_none());
  assert!(!terrain.is_generation_finished());
}

#[test]
fn test_empty_stack_is_rejected() {
  let mut terrain = Terrain::new(
    small_config(),
    LayerStack::default(),
    Arc::new(CityLayout::empty()),
    NullPresenter,
  );
  assert!(matches!(terrain.init(), Err(TerrainError::NoLayers)));
}

#[test]
fn test_invalid_layer_fails_construction() {
  let result = Terrain::from_config(
    TerrainConfig {
      layers: vec![LayerConfig::PerlinNoise(NoiseLayerConfig {
        scale: -1.0,
        ..Default::default()
      })],
      ..small_config()
    },
    NullPresenter,
  );
  assert!(matches!(result, Err(TerrainError::InvalidLayer { .. })));
}

#[test]
fn test_root_uses_origin_and_larger_side() {
  let terrain = terrain(TerrainConfig {
    width: 512.0,
    depth: 2048.0,
    world_origin: Vec2::new(-100.0, 40.0),
    ..small_config()
  });
  let root = terrain.quadtree().expect("initialized").root();
  assert_eq!(root.origin(), Vec2::new(-100.0, 40.0));
  assert_eq!(root.size(), 2048.0);
}

#[test]
fn test_height_query_prefers_chunks() {
  let mut terrain = terrain(small_config());
  terrain.set_viewer(Some(Vec3::ZERO));

  // Before any chunk exists the query samples the stack directly.
  let direct = terrain.height_at(16.0, 16.0);
  assert_eq!(direct, terrain.layers().sample_height(Vec2::new(16.0, 16.0)));
  assert_eq!(terrain.metrics().fallback_height_queries, 1);

  settle(&mut terrain);
  // lod 3 leaves are 128 wide with 8 cells: (16, 16) is a vertex.
  let from_chunk = terrain.height_at(16.0, 16.0);
  assert!((from_chunk - direct).abs() < 1e-3);
  assert_eq!(terrain.metrics().fallback_height_queries, 1);
}

#[test]
fn test_height_before_layer() {
  let terrain = terrain(small_config());
  assert_eq!(terrain.height_before_layer(30.0, 40.0, 0), 0.0);

  let all = terrain.layers().len();
  assert_eq!(
    terrain.height_before_layer(30.0, 40.0, all),
    terrain.layers().sample_height(Vec2::new(30.0, 40.0))
  );
}

#[test]
fn test_regenerate_releases_and_rebuilds() {
  let mut terrain = terrain(small_config());
  terrain.set_viewer(Some(Vec3::ZERO));
  settle(&mut terrain);
  terrain.take_events();
  assert_eq!(terrain.presenter().len(), 10);

  terrain.regenerate().expect("regenerate");
  assert!(terrain.presenter().is_empty());
  assert_eq!(terrain.presenter().detached_total(), 10);
  assert_eq!(terrain.quadtree().expect("rebuilt").node_count(), 1);

  settle(&mut terrain);
  assert_eq!(terrain.presenter().len(), 10);
  assert_eq!(terrain.take_events(), vec![TerrainEvent::GenerationFinished]);
}

#[test]
fn test_pre_generate_then_finish_without_viewer() {
  let mut terrain = terrain(TerrainConfig {
    max_lod: 2,
    ..small_config()
  });
  terrain.pre_generate().expect("initialized");
  terrain.update(0.016);

  assert!(terrain.is_generation_finished());
  assert_eq!(terrain.presenter().len(), 1 + 4 + 16);
  assert_eq!(terrain.presenter().visible_count(), 16);
  assert_eq!(terrain.take_events(), vec![TerrainEvent::GenerationFinished]);
}

#[test]
fn test_pre_generate_requires_init() {
  let mut terrain = Terrain::from_config(small_config(), NullPresenter).expect("valid");
  assert!(matches!(
    terrain.pre_generate(),
    Err(TerrainError::NotInitialized)
  ));
}

#[test]
fn test_background_mode_flush() {
  let mut terrain = terrain(TerrainConfig {
    execution: ExecutionMode::Background,
    max_lod: 2,
    ..small_config()
  });
  terrain.set_viewer(Some(Vec3::ZERO));
  terrain.update(0.016);
  terrain.flush(Duration::from_secs(30));
  terrain.update(0.016);

  assert!(terrain.is_generation_finished());
  assert_eq!(terrain.take_events(), vec![TerrainEvent::GenerationFinished]);
}

#[test]
fn test_background_city_heights_match_inline() {
  let settled = |execution: ExecutionMode| {
    let mut terrain = terrain(TerrainConfig {
      execution,
      ..small_config()
    });
    terrain.set_viewer(Some(Vec3::ZERO));
    terrain.update(0.016);
    terrain.flush(Duration::from_secs(30));
    terrain.update(0.016);
    assert!(terrain.is_generation_finished());
    terrain
  };
  let background = settled(ExecutionMode::Background);
  let inline = settled(ExecutionMode::Inline);

  // Samples inside the square around the origin city, read from chunks.
  for &(x, z) in &[(0.0, 0.0), (60.0, 35.0), (90.0, 90.0), (15.5, 72.25)] {
    let a = background.height_at(x, z);
    let b = inline.height_at(x, z);
    assert!((a - b).abs() < 1e-4, "({x}, {z}): {a} vs {b}");
  }
  assert_eq!(background.metrics().fallback_height_queries, 0);
  assert_eq!(inline.metrics().fallback_height_queries, 0);
}

#[test]
fn test_buildings_sit_on_terrain() {
  let mut terrain = terrain(small_config());
  terrain.set_viewer(Some(Vec3::ZERO));
  settle(&mut terrain);

  let placements = terrain.plan_buildings(&BuildingConfig {
    density: 1.0,
    ..Default::default()
  });
  assert!(!placements.is_empty());
  for b in &placements {
    let ground = terrain.height_at(b.center.x, b.center.z);
    assert!((b.center.y - b.size.y / 2.0 - ground).abs() < 1e-3);
  }
}

/// Counts attach/detach calls through shared counters so they survive drop.
#[derive(Default)]
struct CountingPresenter {
  attached: Arc<AtomicU64>,
  detached: Arc<AtomicU64>,
}

impl ChunkPresenter for CountingPresenter {
  fn attach_chunk(
    &mut self,
    _id: crate::chunk::ChunkId,
    _origin: Vec2,
    _mesh: &crate::types::ChunkMesh,
    _collider: &crate::types::TrimeshCollider,
    _visible: bool,
  ) {
    self.attached.fetch_add(1, Ordering::Relaxed);
  }

  fn set_chunk_visible(&mut self, _id: crate::chunk::ChunkId, _visible: bool) {}

  fn detach_chunk(&mut self, _id: crate::chunk::ChunkId) {
    self.detached.fetch_add(1, Ordering::Relaxed);
  }
}

#[test]
fn test_drop_detaches_chunks() {
  let presenter = CountingPresenter::default();
  let attached = Arc::clone(&presenter.attached);
  let detached = Arc::clone(&presenter.detached);

  let mut terrain = Terrain::from_config(small_config(), presenter).expect("valid");
  terrain.init().expect("init");
  terrain.set_viewer(Some(Vec3::ZERO));
  terrain.update(0.016);
  terrain.update(0.016);
  assert_eq!(attached.load(Ordering::Relaxed), 10);

  drop(terrain);
  assert_eq!(detached.load(Ordering::Relaxed), 10);
}
