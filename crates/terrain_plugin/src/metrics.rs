//! Engine-agnostic terrain statistics.
//!
//! Feature-gated and runtime-toggled to ensure zero overhead when disabled.
//!
//! # Usage
//!
//! ```ignore
//! use terrain_plugin::metrics::COLLECT_METRICS;
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! let m = terrain.metrics();
//! println!("{} chunks, avg {:.0}us", m.total_chunks_generated, m.avg_generation_us());
//! ```

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;

use crate::quadtree::Quadtree;

/// Slots in the per-LOD arrays; deeper levels share the last slot.
pub const LOD_SLOTS: usize = 16;

/// Runtime toggle for metrics collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
    #[cfg(feature = "metrics")]
    {
        COLLECT_METRICS.load(Ordering::Relaxed)
    }
    #[cfg(not(feature = "metrics"))]
    {
        false
    }
}

/// Fixed-capacity window of recent samples.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Push a new value, evicting the oldest if at capacity.
    pub fn push(&mut self, value: T) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    pub fn last(&self) -> Option<&T> {
        self.buffer.back()
    }
}

impl RollingWindow<u64> {
    pub fn sum(&self) -> u64 {
        self.buffer.iter().sum()
    }

    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum() as f64 / self.buffer.len() as f64
        }
    }

    pub fn min_max(&self) -> Option<(u64, u64)> {
        let min = self.buffer.iter().min()?;
        let max = self.buffer.iter().max()?;
        Some((*min, *max))
    }
}

impl Default for RollingWindow<u64> {
    fn default() -> Self {
        Self::new(128) // ~2 seconds at 60fps
    }
}

/// Terrain statistics, refreshed by `Terrain::update`.
#[derive(Debug, Clone, Default)]
pub struct TerrainMetrics {
    // Tree snapshot
    /// Ready chunks per LOD (index = LOD).
    pub chunks_per_lod: [u32; LOD_SLOTS],
    /// Leaves per LOD.
    pub leaves_per_lod: [u32; LOD_SLOTS],
    /// Chunks queued but not yet delivered.
    pub pending_chunks: u32,
    /// Ready chunks currently shown.
    pub visible_chunks: u32,
    /// Triangles across visible chunks.
    pub visible_triangles: u64,

    // Timing
    /// Worker time per chunk job in microseconds.
    pub generation_timings: RollingWindow<u64>,
    /// Quadtree update time per frame in microseconds.
    pub update_timings: RollingWindow<u64>,
    pub last_generation_us: u64,

    // Totals
    pub total_chunks_generated: u64,
    /// Completions that arrived after their chunk was released.
    pub discarded_completions: u64,
    /// Height queries answered by sampling the layer stack directly.
    pub fallback_height_queries: u64,
}

impl TerrainMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset everything except the cumulative totals.
    pub fn reset(&mut self) {
        self.chunks_per_lod.fill(0);
        self.leaves_per_lod.fill(0);
        self.pending_chunks = 0;
        self.visible_chunks = 0;
        self.visible_triangles = 0;
        self.generation_timings.clear();
        self.update_timings.clear();
        self.last_generation_us = 0;
    }

    /// Record one delivered chunk job.
    pub fn record_generation(&mut self, elapsed_us: u64) {
        if is_enabled() {
            self.generation_timings.push(elapsed_us);
            self.last_generation_us = elapsed_us;
            self.total_chunks_generated += 1;
        }
    }

    pub fn record_discard(&mut self) {
        if is_enabled() {
            self.discarded_completions += 1;
        }
    }

    pub fn record_update_timing(&mut self, elapsed_us: u64) {
        if is_enabled() {
            self.update_timings.push(elapsed_us);
        }
    }

    /// Recount the tree. `triangles_per_chunk` is `2 * resolution²`.
    pub fn update_from_tree(&mut self, tree: &Quadtree, triangles_per_chunk: u64) {
        if !is_enabled() {
            return;
        }

        self.chunks_per_lod.fill(0);
        self.leaves_per_lod.fill(0);
        self.pending_chunks = 0;
        self.visible_chunks = 0;

        tree.visit(|node| {
            let slot = (node.lod() as usize).min(LOD_SLOTS - 1);
            if node.is_leaf() {
                self.leaves_per_lod[slot] += 1;
            }
            if let Some(chunk) = node.chunk() {
                if chunk.is_generation_complete() {
                    self.chunks_per_lod[slot] += 1;
                    if chunk.is_visible() {
                        self.visible_chunks += 1;
                    }
                } else {
                    self.pending_chunks += 1;
                }
            }
        });
        self.visible_triangles = self.visible_chunks as u64 * triangles_per_chunk;
    }

    pub fn total_chunks(&self) -> u32 {
        self.chunks_per_lod.iter().sum()
    }

    pub fn total_leaves(&self) -> u32 {
        self.leaves_per_lod.iter().sum()
    }

    pub fn avg_generation_us(&self) -> f64 {
        self.generation_timings.average()
    }

    pub fn avg_update_us(&self) -> f64 {
        self.update_timings.average()
    }
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_window() {
        let mut window = RollingWindow::new(3);
        assert!(window.is_empty());

        window.push(10u64);
        window.push(20);
        window.push(30);
        assert_eq!(window.sum(), 60);
        assert_eq!(window.average(), 20.0);

        // Oldest is evicted
        window.push(40);
        assert_eq!(window.len(), 3);
        assert_eq!(window.min_max(), Some((20, 40)));
        assert_eq!(window.last(), Some(&40));
    }

    #[test]
    fn test_generation_recording() {
        let mut metrics = TerrainMetrics::new();
        metrics.record_generation(1000);
        metrics.record_generation(3000);
        metrics.record_discard();

        assert_eq!(metrics.total_chunks_generated, 2);
        assert_eq!(metrics.avg_generation_us(), 2000.0);
        assert_eq!(metrics.last_generation_us, 3000);
        assert_eq!(metrics.discarded_completions, 1);

        metrics.reset();
        assert!(metrics.generation_timings.is_empty());
        assert_eq!(metrics.total_chunks_generated, 2);
    }

    #[test]
    fn test_empty_window_has_no_range() {
        let window = RollingWindow::<u64>::default();
        assert_eq!(window.min_max(), None);
        assert_eq!(window.average(), 0.0);
    }
}
