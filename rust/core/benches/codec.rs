// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Benchmark for scene encoding and decoding.
//!
//! Compares:
//! 1. Instance encode/decode (base64 typed buffers)
//! 2. Full SCENE frame round trip with shared instances
//!
//! Run with: cargo bench -p cadview-core --bench codec

use cadview_core::{Instance, Message, Part, Scene, Transform};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

/// Generate a synthetic instance with `vertices` vertices.
fn generate_instance(vertices: usize) -> Instance {
    let positions: Vec<f32> = (0..vertices * 3).map(|j| (j as f32) * 0.001).collect();
    let normals: Vec<f32> = (0..vertices * 3)
        .map(|j| if j % 3 == 2 { 1.0 } else { 0.0 })
        .collect();
    let triangles: Vec<u32> = (0..(vertices / 3) * 3).map(|j| (j % vertices) as u32).collect();
    let edges: Vec<u32> = (0..(vertices / 2) * 2).map(|j| (j % vertices) as u32).collect();
    Instance::new(positions, normals, triangles, edges)
}

/// Scene with `parts` leaves cycling over `unique` instances.
fn generate_scene(parts: usize, unique: usize, vertices: usize) -> Scene {
    let instances: Vec<Arc<Instance>> = (0..unique.max(1))
        .map(|_| Arc::new(generate_instance(vertices)))
        .collect();
    let children = (0..parts)
        .map(|i| {
            Part::shape(
                format!("/bench/part_{}", i),
                instances[i % instances.len()].clone(),
                Transform::from_translation(i as f64, 0.0, 0.0),
            )
        })
        .collect();
    Scene::new(Part::group("/bench", children))
}

fn bench_instance(c: &mut Criterion) {
    let mut group = c.benchmark_group("instance");
    for vertices in [1_000usize, 10_000, 100_000] {
        let instance = generate_instance(vertices);
        let encoded = instance.encode();
        group.throughput(Throughput::Bytes((vertices * 3 * 4 * 2) as u64));

        group.bench_with_input(BenchmarkId::new("encode", vertices), &instance, |b, i| {
            b.iter(|| black_box(i.encode()))
        });
        group.bench_with_input(BenchmarkId::new("decode", vertices), &encoded, |b, e| {
            b.iter(|| black_box(Instance::decode(e).unwrap()))
        });
    }
    group.finish();
}

fn bench_scene_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("scene_frame");
    for (parts, unique) in [(100usize, 100usize), (100, 10), (1_000, 10)] {
        let scene = generate_scene(parts, unique, 2_000);
        let wire = Message::Scene(Box::new(scene.encode())).encode().unwrap();
        let label = format!("{}parts_{}unique", parts, unique);

        group.throughput(Throughput::Bytes(wire.len() as u64));
        group.bench_with_input(BenchmarkId::new("decode", &label), &wire, |b, w| {
            b.iter(|| {
                let Message::Scene(payload) = Message::decode(w).unwrap() else {
                    unreachable!()
                };
                black_box(Scene::decode(&payload).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_instance, bench_scene_frame);
criterion_main!(benches);
