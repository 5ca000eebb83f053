//! Chunk generation benchmarks.
//!
//! Measures each stage of a chunk job separately:
//! - **layers**: noise only vs. the full noise → city → road stack
//! - **mesh**: vertex/normal/index construction
//! - **collider**: trimesh copy
//! - **quadtree**: one LOD pass with inline generation

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec2;
use terrain_plugin::{
  chunk::{build_collider, build_mesh, generate_chunk_data},
  config::default_layers,
  quadtree::TreeContext,
  ChunkGenerator, CityConfig, CityLayout, ExecutionMode, LayerConfig, LayerStack,
  NoiseLayerConfig, NullPresenter, Quadtree,
};

fn noise_only() -> LayerStack {
  LayerStack::from_configs(
    &[LayerConfig::PerlinNoise(NoiseLayerConfig::default())],
    &Arc::new(CityLayout::empty()),
  )
  .expect("valid layers")
}

fn full_stack() -> LayerStack {
  let cities = Arc::new(CityLayout::generate(&CityConfig {
    max_radius: 2000.0,
    ..Default::default()
  }));
  LayerStack::from_configs(&default_layers(), &cities).expect("valid layers")
}

fn bench_layers(c: &mut Criterion) {
  let mut group = c.benchmark_group("layers");
  let stacks = [("noise", noise_only()), ("full", full_stack())];

  for resolution in [32u32, 64, 128] {
    for (name, stack) in &stacks {
      // Warm the city/road caches so the loop measures steady state.
      generate_chunk_data(stack, Vec2::ZERO, 256.0, 2, 8);

      group.bench_with_input(BenchmarkId::new(*name, resolution), &resolution, |b, &r| {
        b.iter(|| {
          black_box(generate_chunk_data(
            stack,
            black_box(Vec2::new(-128.0, -128.0)),
            256.0,
            2,
            r,
          ))
        })
      });
    }
  }
  group.finish();
}

fn bench_mesh(c: &mut Criterion) {
  let mut group = c.benchmark_group("mesh");
  let stack = noise_only();

  for resolution in [32u32, 64, 128] {
    let data = generate_chunk_data(&stack, Vec2::ZERO, 256.0, 2, resolution);
    let step = 256.0 / resolution as f32;

    group.bench_with_input(BenchmarkId::new("build_mesh", resolution), &data, |b, data| {
      b.iter(|| black_box(build_mesh(data, step, Vec2::ZERO)))
    });

    let mesh = build_mesh(&data, step, Vec2::ZERO);
    group.bench_with_input(BenchmarkId::new("build_collider", resolution), &mesh, |b, mesh| {
      b.iter(|| black_box(build_collider(mesh)))
    });
  }
  group.finish();
}

fn bench_quadtree_update(c: &mut Criterion) {
  let generator = ChunkGenerator::new(Arc::new(noise_only()), 16, ExecutionMode::Inline);
  let mut presenter = NullPresenter;

  c.bench_function("quadtree::update (max_lod 4, cold)", |b| {
    b.iter(|| {
      let mut tree = Quadtree::new(Vec2::ZERO, 1024.0, 4);
      let mut ctx = TreeContext {
        generator: &generator,
        presenter: &mut presenter,
      };
      tree.update(black_box(Vec2::new(300.0, 300.0)), &mut ctx);
      generator.drain();
      black_box(tree.leaf_count())
    })
  });
}

criterion_group!(benches, bench_layers, bench_mesh, bench_quadtree_update);
criterion_main!(benches);
