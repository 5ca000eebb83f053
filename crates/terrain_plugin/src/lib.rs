//! terrain_plugin - Engine independent procedural terrain with quadtree LOD
//!
//! This crate generates heightmap terrain around a moving viewer. Heights come
//! from an ordered stack of layers; the world is split by a quadtree whose
//! leaves are meshed as fixed-resolution chunks on background threads.
//!
//! # Features
//!
//! - **Layer pipeline**: fBm Perlin noise, city square flattening and roads
//!   between cities, each layer able to query the terrain as it was before it
//! - **Quadtree LOD**: distance-based subdivision with hole-free transitions
//! - **Chunk meshing**: smooth normals, world-space UVs, RGBA splat weights and
//!   a matching collision trimesh
//! - **Cities**: deterministic ring layout and building placement
//!
//! # Example
//!
//! ```ignore
//! use terrain_plugin::{NullPresenter, Terrain, TerrainConfig};
//!
//! let config = TerrainConfig::load("terrain.toml")?;
//! let mut terrain = Terrain::from_config(config, NullPresenter)?;
//! terrain.init()?;
//!
//! terrain.set_viewer(Some(glam::Vec3::new(0.0, 20.0, 0.0)));
//! loop {
//!     terrain.update(dt);
//!     let ground = terrain.height_at(x, z);
//! }
//! ```

pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use constants::{grid_index, MAX_TEXTURES};
pub use error::{Result, TerrainError};
pub use types::{
  normalize_blend, BlendWeights, ChunkMesh, MinMaxAABB, SampleRegion, TerrainData, TerrainVertex,
  TrimeshCollider,
};

// City layout and building placement
pub mod city;
pub use city::{
  plan_buildings, BuildingConfig, BuildingPlacement, CityConfig, CityKey, CityLayout,
};

// Height synthesis
pub mod layers;
pub use layers::{
  CitySquareConfig, CitySquareLayer, LayerConfig, LayerContext, LayerStack, NoiseLayerConfig,
  PerlinNoiseLayer, RoadConfig, RoadGenerationLayer, RoadSegment, TerrainLayer, TextureBlend,
};

// Chunk generation and meshing
pub mod chunk;
pub use chunk::{ChunkId, ChunkState, TerrainChunk};

// Background execution
pub mod threading;
pub use threading::{ChunkCompletion, ChunkGenerator, ChunkPayload, ExecutionMode};

// Quadtree LOD
pub mod quadtree;
pub use quadtree::{Quadtree, QuadtreeNode, Rect2};

// Scene integration
pub mod presentation;
pub use presentation::{ChunkPresenter, NullPresenter, TrackingPresenter};

pub mod config;
pub use config::TerrainConfig;

pub mod metrics;
pub use metrics::TerrainMetrics;

pub mod terrain;
pub use terrain::{Terrain, TerrainEvent};
