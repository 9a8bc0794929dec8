//! Surface sampler benchmarks

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use spirit_core::{MeshSource, SurfaceSampler};
use std::hint::black_box;

/// Subdivided unit grid with `n × n` quads and one morph target
fn grid_mesh(n: u32) -> MeshSource {
    let mut positions = Vec::new();
    for i in 0..=n {
        for j in 0..=n {
            positions.push(Vec3::new(j as f32 / n as f32, i as f32 / n as f32, 0.0));
        }
    }

    let stride = n + 1;
    let mut indices = Vec::new();
    for i in 0..n {
        for j in 0..n {
            let a = i * stride + j;
            indices.extend_from_slice(&[a, a + 1, a + stride, a + 1, a + stride + 1, a + stride]);
        }
    }

    let deltas = vec![Vec3::new(0.0, 0.0, 1.0); positions.len()];
    let mut mesh = MeshSource::new(positions)
        .with_indices(indices)
        .with_morph_target(deltas);
    mesh.set_influences(&[0.5]);
    mesh
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampler_construction");

    for &n in &[16u32, 64, 256] {
        let mesh = grid_mesh(n);
        group.bench_with_input(
            BenchmarkId::new("faces", 2 * n * n),
            &mesh,
            |b, mesh| {
                b.iter(|| SurfaceSampler::new(black_box(mesh.clone())));
            },
        );
    }

    group.finish();
}

fn bench_sampling(c: &mut Criterion) {
    let sampler = match SurfaceSampler::new(grid_mesh(128)) {
        Ok(sampler) => sampler,
        Err(err) => panic!("benchmark mesh rejected: {}", err),
    };
    let mut group = c.benchmark_group("sampler_sample");

    for &count in &[4_096usize, 65_536, 250_000] {
        let mut out = vec![0.0f32; count * 4];
        let mut rng = StdRng::seed_from_u64(1);
        group.bench_with_input(BenchmarkId::new("points", count), &count, |b, _| {
            b.iter(|| sampler.sample_into(black_box(&mut out), &mut rng));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_construction, bench_sampling);
criterion_main!(benches);
