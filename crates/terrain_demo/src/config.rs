//! Demo configuration: terrain, buildings and the scripted viewer path.

use std::path::Path;

use anyhow::{Context, Result};
use glam::{Vec2, Vec3};
use serde::Deserialize;
use terrain_plugin::{BuildingConfig, TerrainConfig};

/// Root configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
	pub terrain: TerrainConfig,
	pub buildings: BuildingConfig,
	pub viewer: ViewerPath,
}

/// Straight-line fly-over at a fixed height above the ground.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ViewerPath {
	/// Start position (y is ignored, the viewer follows the ground).
	pub start: Vec3,
	/// Horizontal velocity in world units per second (x, z).
	pub velocity: Vec2,
	/// Height kept above the terrain.
	pub altitude: f32,
}

impl Default for ViewerPath {
	fn default() -> Self {
		Self {
			start: Vec3::ZERO,
			velocity: Vec2::new(40.0, 25.0),
			altitude: 20.0,
		}
	}
}

impl ViewerPath {
	/// Horizontal position after `t` seconds.
	pub fn position_at(&self, t: f32) -> Vec2 {
		Vec2::new(self.start.x, self.start.z) + self.velocity * t
	}
}

impl DemoConfig {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		let config: DemoConfig =
			toml::from_str(&content).with_context(|| "Failed to parse config TOML")?;

		config
			.terrain
			.validate()
			.with_context(|| format!("Invalid terrain section in {}", path.display()))?;
		Ok(config)
	}
}
