// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Scalar vs batched mitochondrial kernels
//!
//! Fixed inputs, no I/O. Used to pick `accelerator_threshold`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hypergraph_npu_neural::MitoParams;
use hypergraph_npu_region_engine::{BatchedBackend, MitoBackend, ScalarBackend};

fn inputs(n: usize) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
    let activity = (0..n).map(|i| (i % 17) as f32 / 16.0).collect();
    (vec![0.6; n], vec![0.9; n], activity)
}

fn bench_backends(c: &mut Criterion) {
    let params = MitoParams::default();
    let mut group = c.benchmark_group("mito_step");

    for &n in &[100usize, 1_000, 10_000, 100_000] {
        group.throughput(Throughput::Elements(n as u64));
        let backends: [(&str, Box<dyn MitoBackend>); 2] = [
            ("scalar", Box::new(ScalarBackend)),
            ("batched", Box::new(BatchedBackend::default())),
        ];
        for (name, backend) in backends.iter() {
            group.bench_with_input(BenchmarkId::new(*name, n), &n, |b, &n| {
                let (mut energy, mut health, activity) = inputs(n);
                b.iter(|| {
                    backend
                        .step(
                            black_box(&mut energy),
                            black_box(&mut health),
                            black_box(&activity),
                            &params,
                        )
                        .ok()
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_backends);
criterion_main!(benches);
