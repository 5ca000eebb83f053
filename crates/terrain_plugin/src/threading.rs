//! Background chunk generation using rayon.
//!
//! Jobs run on rayon's pool via `rayon::spawn` and report back over a
//! crossbeam channel. The host drains the channel once per frame; nothing on
//! the worker side touches the quadtree or the presenter.
//!
//! ```text
//!   main thread                      rayon workers
//!   ───────────                      ─────────────
//!   queue(id, origin, size, lod) ──► layers → mesh → collider
//!                                          │
//!   drain() ◄──── crossbeam channel ◄──────┘  ChunkCompletion
//! ```
//!
//! `ExecutionMode::Inline` runs the job on the calling thread and still
//! routes the result through the channel, so consumers see one code path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::chunk::build::{build_collider, build_mesh, generate_chunk_data};
use crate::chunk::ChunkId;
use crate::layers::LayerStack;
use crate::types::{ChunkMesh, TerrainData, TrimeshCollider};

/// Where chunk jobs execute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
  /// rayon thread pool.
  #[default]
  Background,
  /// Synchronously on the queuing thread.
  Inline,
}

/// Everything a finished chunk needs on the main thread.
#[derive(Clone, Debug)]
pub struct ChunkPayload {
  pub data: TerrainData,
  /// World distance between samples.
  pub step: f32,
  pub mesh: ChunkMesh,
  pub collider: TrimeshCollider,
}

/// Worker → main thread message.
#[derive(Clone, Debug)]
pub struct ChunkCompletion {
  pub id: ChunkId,
  pub origin: Vec2,
  pub lod: u32,
  pub payload: ChunkPayload,
  /// Wall time spent in the job.
  pub elapsed_us: u64,
}

/// Runs the full chunk job: layer stack, mesh, collider.
pub fn build_chunk(
  stack: &LayerStack,
  resolution: u32,
  id: ChunkId,
  origin: Vec2,
  size: f32,
  lod: u32,
) -> ChunkCompletion {
  let start = Instant::now();
  let resolution = resolution.max(1);
  let step = size / resolution as f32;

  let data = generate_chunk_data(stack, origin, size, lod, resolution);
  let mesh = build_mesh(&data, step, origin);
  let collider = build_collider(&mesh);

  ChunkCompletion {
    id,
    origin,
    lod,
    payload: ChunkPayload {
      data,
      step,
      mesh,
      collider,
    },
    elapsed_us: start.elapsed().as_micros() as u64,
  }
}

/// Queues chunk jobs and collects their results.
pub struct ChunkGenerator {
  stack: Arc<LayerStack>,
  resolution: u32,
  mode: ExecutionMode,
  sender: Sender<ChunkCompletion>,
  receiver: Receiver<ChunkCompletion>,
  in_flight: Arc<AtomicUsize>,
}

impl ChunkGenerator {
  pub fn new(stack: Arc<LayerStack>, resolution: u32, mode: ExecutionMode) -> Self {
    let (sender, receiver) = crossbeam_channel::unbounded();
    Self {
      stack,
      resolution: resolution.max(1),
      mode,
      sender,
      receiver,
      in_flight: Arc::new(AtomicUsize::new(0)),
    }
  }

  pub fn stack(&self) -> &Arc<LayerStack> {
    &self.stack
  }

  /// Cells per chunk side.
  pub fn resolution(&self) -> u32 {
    self.resolution
  }

  pub fn mode(&self) -> ExecutionMode {
    self.mode
  }

  /// Submit a chunk job (non-blocking in background mode).
  pub fn queue(&self, id: ChunkId, origin: Vec2, size: f32, lod: u32) {
    self.in_flight.fetch_add(1, Ordering::AcqRel);

    let stack = Arc::clone(&self.stack);
    let sender = self.sender.clone();
    let in_flight = Arc::clone(&self.in_flight);
    let resolution = self.resolution;

    let job = move || {
      let completion = build_chunk(&stack, resolution, id, origin, size, lod);
      // The receiver lives as long as the generator; a send error only
      // happens during teardown and the result is unwanted then.
      let _ = sender.send(completion);
      in_flight.fetch_sub(1, Ordering::AcqRel);
    };

    match self.mode {
      ExecutionMode::Background => rayon::spawn(job),
      ExecutionMode::Inline => job(),
    }
  }

  /// Take every completion that has arrived so far.
  pub fn drain(&self) -> Vec<ChunkCompletion> {
    self.receiver.try_iter().collect()
  }

  /// Jobs queued but not yet sent back.
  pub fn in_flight(&self) -> usize {
    self.in_flight.load(Ordering::Acquire)
  }

  /// Block until every queued job has reported, or `timeout` elapses.
  ///
  /// Returns whatever arrived in the meantime.
  pub fn wait_idle(&self, timeout: Duration) -> Vec<ChunkCompletion> {
    let deadline = Instant::now() + timeout;
    let mut out = Vec::new();

    loop {
      out.extend(self.receiver.try_iter());
      if self.in_flight() == 0 {
        out.extend(self.receiver.try_iter());
        break;
      }

      let remaining = deadline.saturating_duration_since(Instant::now());
      if remaining.is_zero() {
        tracing::warn!(in_flight = self.in_flight(), "timed out waiting for chunk jobs");
        break;
      }
      match self.receiver.recv_timeout(remaining.min(Duration::from_millis(10))) {
        Ok(completion) => out.push(completion),
        Err(RecvTimeoutError::Timeout) => {}
        Err(RecvTimeoutError::Disconnected) => break,
      }
    }
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::layers::{NoiseLayerConfig, PerlinNoiseLayer, TerrainLayer};

  fn generator(mode: ExecutionMode) -> ChunkGenerator {
    let stack = LayerStack::new(vec![
      Box::new(PerlinNoiseLayer::new(NoiseLayerConfig::default())) as Box<dyn TerrainLayer>
    ]);
    ChunkGenerator::new(Arc::new(stack), 8, mode)
  }

  #[test]
  fn test_inline_completes_before_drain() {
    let generator = generator(ExecutionMode::Inline);
    let id = ChunkId::next();
    generator.queue(id, Vec2::new(32.0, 0.0), 64.0, 1);

    assert_eq!(generator.in_flight(), 0);
    let completions = generator.drain();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].id, id);
    assert_eq!(completions[0].origin, Vec2::new(32.0, 0.0));
    assert_eq!(completions[0].lod, 1);
    assert_eq!(completions[0].payload.step, 8.0);
    assert_eq!(completions[0].payload.mesh.vertices.len(), 81);
    assert!(generator.drain().is_empty());
  }

  #[test]
  fn test_background_jobs_all_report() {
    let generator = generator(ExecutionMode::Background);
    let ids: Vec<_> = (0..10).map(|_| ChunkId::next()).collect();
    for (i, id) in ids.iter().enumerate() {
      generator.queue(*id, Vec2::new(i as f32 * 64.0, 0.0), 64.0, 0);
    }

    let completions = generator.wait_idle(Duration::from_secs(30));
    assert_eq!(completions.len(), 10);
    assert_eq!(generator.in_flight(), 0);
    for id in ids {
      assert!(completions.iter().any(|c| c.id == id));
    }
  }

  #[test]
  fn test_modes_produce_identical_chunks() {
    let inline = generator(ExecutionMode::Inline);
    let background = generator(ExecutionMode::Background);
    let origin = Vec2::new(-128.0, 64.0);

    inline.queue(ChunkId::next(), origin, 128.0, 2);
    background.queue(ChunkId::next(), origin, 128.0, 2);

    let a = inline.drain().pop().expect("inline result");
    let b = background
      .wait_idle(Duration::from_secs(30))
      .pop()
      .expect("background result");
    assert_eq!(a.payload.data, b.payload.data);
  }

  #[test]
  fn test_execution_mode_from_toml() {
    #[derive(Deserialize)]
    struct Doc {
      execution: ExecutionMode,
    }
    let doc: Doc = toml::from_str("execution = \"inline\"").expect("parse");
    assert_eq!(doc.execution, ExecutionMode::Inline);
  }
}
