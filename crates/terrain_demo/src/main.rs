//! Headless terrain fly-over.
//!
//! Drives a `Terrain` along a straight viewer path at a fixed time step,
//! recording scene changes with a `TrackingPresenter`, then plans city
//! buildings on the finished terrain.
//!
//! ```text
//! RUST_LOG=terrain_plugin=debug terrain_demo --config crates/terrain_demo/terrain.toml
//! ```

mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec3;
use terrain_plugin::{ExecutionMode, Terrain, TerrainEvent, TrackingPresenter};
use tracing_subscriber::EnvFilter;

use config::DemoConfig;

/// Headless procedural terrain demo.
#[derive(Parser, Debug)]
#[command(name = "terrain_demo")]
#[command(about = "Flies a viewer over procedural terrain and reports LOD statistics")]
struct Args {
	/// Path to configuration TOML file (defaults are used when omitted).
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Number of simulated frames.
	#[arg(short, long, default_value_t = 600)]
	frames: u32,

	/// Simulated frame rate.
	#[arg(long, default_value_t = 60.0)]
	fps: f32,

	/// Queue every LOD level before the first frame.
	#[arg(long)]
	pre_generate: bool,

	/// Run chunk jobs on the main thread.
	#[arg(long)]
	inline: bool,

	/// Override the city seed.
	#[arg(long)]
	seed: Option<u64>,

	/// Log statistics every N frames (0 disables).
	#[arg(long, default_value_t = 60)]
	report_every: u32,
}

fn init_logging() {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new("info,terrain_plugin=info"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(true)
		.init();
}

fn main() -> Result<()> {
	init_logging();
	let args = Args::parse();

	let mut config = match &args.config {
		Some(path) => {
			tracing::info!(path = %path.display(), "loading config");
			DemoConfig::load(path)?
		}
		None => DemoConfig::default(),
	};
	if args.inline {
		config.terrain.execution = ExecutionMode::Inline;
	}
	if let Some(seed) = args.seed {
		config.terrain.city.seed = seed;
	}

	let mut terrain = Terrain::from_config(config.terrain.clone(), TrackingPresenter::new())
		.context("Failed to build terrain layers")?;
	terrain.init().context("Failed to initialize terrain")?;
	if args.pre_generate {
		terrain.pre_generate()?;
	}

	let dt = 1.0 / args.fps.max(1.0);
	let path = &config.viewer;

	for frame in 0..args.frames {
		let t = frame as f32 * dt;
		let xz = path.position_at(t);
		let ground = terrain.height_at(xz.x, xz.y);
		terrain.set_viewer(Some(Vec3::new(xz.x, ground + path.altitude, xz.y)));
		terrain.update(dt);

		for event in terrain.take_events() {
			match event {
				TerrainEvent::GenerationFinished => {
					tracing::info!(frame, t, "all displayed chunks ready");
				}
			}
		}

		if args.report_every > 0 && frame % args.report_every == 0 {
			report(&terrain, frame);
		}
	}

	// Let outstanding jobs land so the final numbers describe a settled tree.
	let late = terrain.flush(Duration::from_secs(60));
	terrain.update(dt);
	tracing::info!(late, "flushed outstanding chunk jobs");
	report(&terrain, args.frames);

	let buildings = terrain.plan_buildings(&config.buildings);
	let tallest = buildings.iter().map(|b| b.size.y).fold(0.0f32, f32::max);
	tracing::info!(
		buildings = buildings.len(),
		cities = terrain.cities().len(),
		tallest,
		"planned city buildings"
	);

	let metrics = terrain.metrics();
	println!(
		"chunks generated: {}, discarded: {}, avg job: {:.0}us, fallback height queries: {}",
		metrics.total_chunks_generated,
		metrics.discarded_completions,
		metrics.avg_generation_us(),
		metrics.fallback_height_queries,
	);
	Ok(())
}

fn report(terrain: &Terrain<TrackingPresenter>, frame: u32) {
	let metrics = terrain.metrics();
	let presenter = terrain.presenter();
	tracing::info!(
		frame,
		leaves = metrics.total_leaves(),
		pending = metrics.pending_chunks,
		visible = presenter.visible_count(),
		attached = presenter.len(),
		triangles = presenter.visible_triangles(),
		avg_job_us = metrics.avg_generation_us() as u64,
		"terrain stats"
	);
}
