//! Terrain - the host-facing object tying layers, quadtree and chunks together.
//!
//! # Lifecycle
//!
//! ```text
//! new() ─► init() ─► [set_viewer() ─► update(dt)]*  ─► drop
//!            │                 │
//!            │                 ├─ drain worker completions → chunks attach
//!            │                 ├─ quadtree LOD pass (no viewer: visibility refresh only)
//!            │                 └─ GenerationFinished when every leaf is ready
//!            │
//!            └─ regenerate(): release all chunks, clear layer caches, rebuild root
//! ```
//!
//! All methods run on the host thread. Only the chunk jobs leave it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glam::{Vec2, Vec3};
use web_time::Instant;

use crate::city::{self, BuildingConfig, BuildingPlacement, CityLayout};
use crate::config::TerrainConfig;
use crate::error::{Result, TerrainError};
use crate::layers::LayerStack;
use crate::metrics::TerrainMetrics;
use crate::presentation::ChunkPresenter;
use crate::quadtree::{Quadtree, TreeContext};
use crate::threading::{ChunkCompletion, ChunkGenerator};

/// Notifications drained with [`Terrain::take_events`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerrainEvent {
  /// Every displayed chunk is ready. Fires again after the next change that
  /// leaves some chunk pending.
  GenerationFinished,
}

pub struct Terrain<P: ChunkPresenter> {
  config: TerrainConfig,
  cities: Arc<CityLayout>,
  generator: ChunkGenerator,
  presenter: P,
  tree: Option<Quadtree>,
  viewer: Option<Vec3>,
  warned_no_viewer: bool,
  finished: bool,
  elapsed: f64,
  events: Vec<TerrainEvent>,
  metrics: TerrainMetrics,
  fallback_queries: AtomicU64,
}

impl<P: ChunkPresenter> Terrain<P> {
  /// Assemble a terrain from parts. Nothing is generated until [`Terrain::init`].
  pub fn new(
    config: TerrainConfig,
    layers: LayerStack,
    cities: Arc<CityLayout>,
    presenter: P,
  ) -> Self {
    let generator = ChunkGenerator::new(Arc::new(layers), config.chunk_resolution, config.execution);
    Self {
      config,
      cities,
      generator,
      presenter,
      tree: None,
      viewer: None,
      warned_no_viewer: false,
      finished: false,
      elapsed: 0.0,
      events: Vec::new(),
      metrics: TerrainMetrics::new(),
      fallback_queries: AtomicU64::new(0),
    }
  }

  /// Build cities and layers from `config`.
  pub fn from_config(config: TerrainConfig, presenter: P) -> Result<Self> {
    let cities = Arc::new(CityLayout::generate(&config.city));
    let layers = LayerStack::from_configs(&config.layers, &cities)?;
    tracing::info!(
      cities = cities.len(),
      layers = ?layers.names(),
      "built terrain layers"
    );
    Ok(Self::new(config, layers, cities, presenter))
  }

  /// Validate and build the quadtree root.
  ///
  /// On error nothing is generated and `update` stays a no-op.
  pub fn init(&mut self) -> Result<()> {
    let validation = if self.generator.stack().is_empty() {
      Err(TerrainError::NoLayers)
    } else {
      self.config.validate_world()
    };
    if let Err(err) = validation {
      tracing::error!(%err, "invalid terrain configuration, generation skipped");
      return Err(err);
    }

    self.generator.stack().begin_generation();
    let size = self.config.root_size();
    self.tree = Some(Quadtree::new(self.config.world_origin, size, self.config.max_lod));
    self.finished = false;
    self.elapsed = 0.0;

    tracing::info!(
      origin = ?self.config.world_origin,
      size,
      max_lod = self.config.max_lod,
      resolution = self.config.chunk_resolution,
      mode = ?self.config.execution,
      "terrain initialized"
    );
    Ok(())
  }

  pub fn is_initialized(&self) -> bool {
    self.tree.is_some()
  }

  /// World position driving LOD. `None` pauses LOD updates.
  pub fn set_viewer(&mut self, viewer: Option<Vec3>) {
    self.viewer = viewer;
  }

  pub fn viewer(&self) -> Option<Vec3> {
    self.viewer
  }

  /// Per-frame tick.
  pub fn update(&mut self, delta_seconds: f32) {
    if self.tree.is_none() {
      return;
    }
    self.elapsed += delta_seconds as f64;

    for completion in self.generator.drain() {
      self.deliver(completion);
    }

    let Some(viewer) = self.viewer else {
      if !self.warned_no_viewer {
        tracing::warn!("no viewer assigned, skipping LOD update");
        self.warned_no_viewer = true;
      }
      if let Some(tree) = self.tree.as_mut() {
        tree.refresh_visibility(&mut self.presenter);
      }
      self.refresh_state();
      return;
    };
    self.warned_no_viewer = false;

    if let Some(tree) = self.tree.as_mut() {
      let start = Instant::now();
      let mut ctx = TreeContext {
        generator: &self.generator,
        presenter: &mut self.presenter,
      };
      tree.update(Vec2::new(viewer.x, viewer.z), &mut ctx);
      self.metrics.record_update_timing(start.elapsed().as_micros() as u64);
    }
    self.refresh_state();
  }

  fn deliver(&mut self, completion: ChunkCompletion) {
    let Some(tree) = self.tree.as_mut() else {
      return;
    };
    let elapsed_us = completion.elapsed_us;
    if tree.apply_completion(completion, &mut self.presenter) {
      self.metrics.record_generation(elapsed_us);
    } else {
      self.metrics.record_discard();
    }
  }

  fn refresh_state(&mut self) {
    let Some(tree) = self.tree.as_ref() else {
      return;
    };
    self
      .metrics
      .update_from_tree(tree, self.config.triangles_per_chunk());

    let ready = tree.all_leaves_ready();
    if ready && !self.finished {
      tracing::info!(
        leaves = tree.leaf_count(),
        elapsed_s = self.elapsed,
        "terrain generation finished"
      );
      self.events.push(TerrainEvent::GenerationFinished);
    }
    self.finished = ready;
  }

  /// Queue chunks for every node down to `max_lod`.
  pub fn pre_generate(&mut self) -> Result<()> {
    let Some(tree) = self.tree.as_mut() else {
      return Err(TerrainError::NotInitialized);
    };
    let mut ctx = TreeContext {
      generator: &self.generator,
      presenter: &mut self.presenter,
    };
    tree.pre_generate(&mut ctx);
    tracing::info!(chunks = tree.node_count(), "pre-generating terrain");
    Ok(())
  }

  /// Tear down every chunk and rebuild from scratch.
  pub fn regenerate(&mut self) -> Result<()> {
    if let Some(tree) = self.tree.take() {
      tree.release(&mut self.presenter);
    }
    tracing::info!("regenerating terrain");
    self.init()
  }

  /// Block until queued chunk jobs report (or `timeout`), then deliver them.
  ///
  /// Returns the number of completions processed.
  pub fn flush(&mut self, timeout: Duration) -> usize {
    let completions = self.generator.wait_idle(timeout);
    let count = completions.len();
    for completion in completions {
      self.deliver(completion);
    }
    self.refresh_state();
    count
  }

  /// Final terrain height at world `(x, z)`.
  ///
  /// Answered from the ready leaf chunk when possible, otherwise by running
  /// the layer stack for this point.
  pub fn height_at(&self, x: f32, z: f32) -> f32 {
    let world = Vec2::new(x, z);
    if let Some(h) = self.tree.as_ref().and_then(|t| t.try_height_at(world)) {
      return h;
    }
    self.fallback_queries.fetch_add(1, Ordering::Relaxed);
    self.generator.stack().sample_height(world)
  }

  /// Height at `(x, z)` as produced by layers `[0, layer_index)`.
  pub fn height_before_layer(&self, x: f32, z: f32, layer_index: usize) -> f32 {
    self.generator.stack().height_before(Vec2::new(x, z), layer_index)
  }

  pub fn is_generation_finished(&self) -> bool {
    self.tree.as_ref().is_some_and(Quadtree::all_leaves_ready)
  }

  pub fn take_events(&mut self) -> Vec<TerrainEvent> {
    std::mem::take(&mut self.events)
  }

  /// Building placements on the current terrain.
  pub fn plan_buildings(&self, config: &BuildingConfig) -> Vec<BuildingPlacement> {
    city::plan_buildings(&self.cities, config, |p| self.height_at(p.x, p.y))
  }

  /// Snapshot of the current statistics.
  pub fn metrics(&self) -> TerrainMetrics {
    let mut metrics = self.metrics.clone();
    metrics.fallback_height_queries = self.fallback_queries.load(Ordering::Relaxed);
    metrics
  }

  pub fn config(&self) -> &TerrainConfig {
    &self.config
  }

  pub fn cities(&self) -> &Arc<CityLayout> {
    &self.cities
  }

  pub fn layers(&self) -> &LayerStack {
    self.generator.stack()
  }

  pub fn quadtree(&self) -> Option<&Quadtree> {
    self.tree.as_ref()
  }

  pub fn presenter(&self) -> &P {
    &self.presenter
  }

  pub fn presenter_mut(&mut self) -> &mut P {
    &mut self.presenter
  }
}

impl<P: ChunkPresenter> Drop for Terrain<P> {
  fn drop(&mut self) {
    if let Some(tree) = self.tree.take() {
      tree.release(&mut self.presenter);
    }
  }
}

#[cfg(test)]
#[path = "terrain_test.rs"]
mod terrain_test;
