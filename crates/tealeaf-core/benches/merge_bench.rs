// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — Merge Benchmark
// © 1998–2026 Miroslav Šotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::Array1;
use std::hint::black_box;
use tealeaf_core::assemble::merge_iteration;
use tealeaf_core::diff::compute_difference;
use tealeaf_types::config::BoundaryPolicy;
use tealeaf_types::state::{CellFields, ChunkData, ChunkKey};

/// `gx * gy` chunks of `n * n` cells each, unit spacing.
fn make_chunks(gx: usize, gy: usize, n: usize) -> Vec<ChunkData> {
    let mut chunks = Vec::with_capacity(gx * gy);
    for y in 0..gy {
        for x in 0..gx {
            let xs = Array1::from_iter((0..=n).map(|i| (x * n + i) as f64));
            let ys = Array1::from_iter((0..=n).map(|j| (y * n + j) as f64));
            let cells = n * n;
            let density: Vec<f64> = (0..cells).map(|c| (c + x + y) as f64).collect();
            let fields = CellFields::from_vecs(density.clone(), density.clone(), density);
            chunks.push(ChunkData::new(ChunkKey::new(x, y), 0, xs, ys, fields).unwrap());
        }
    }
    chunks
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_iteration");

    for &(gx, gy, n) in &[(2, 2, 64), (4, 4, 64), (8, 8, 32)] {
        let chunks = make_chunks(gx, gy, n);
        let label = format!("{}x{}_chunks_{}cells", gx, gy, n);
        group.bench_function(&label, |b| {
            b.iter(|| {
                let grid = merge_iteration(0, &chunks, BoundaryPolicy::Strict)
                    .expect("merge should succeed");
                black_box(grid.cell_count());
            })
        });
    }

    group.finish();
}

fn bench_difference(c: &mut Criterion) {
    let chunks = make_chunks(4, 4, 64);
    let a = merge_iteration(0, &chunks, BoundaryPolicy::Strict).unwrap();
    let mut b = a.clone();
    b.fields.temperature.mapv_inplace(|v| v * 1.001);

    c.bench_function("difference_256x256", |bench| {
        bench.iter(|| {
            let d = compute_difference(black_box(&a), black_box(&b)).expect("grids match");
            black_box(d.fields().temperature[0]);
        })
    });
}

criterion_group!(benches, bench_merge, bench_difference);
criterion_main!(benches);
