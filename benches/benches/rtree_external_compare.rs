// Copyright 2025 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg(feature = "compare_rstar")]

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use parcel_bound::Aabb;
use parcel_index::{RTreeIndex, SpatialPredicate};

use rstar::{AABB, RTree};

type Entry = (Aabb<f64, 3>, u32);

fn gen_grid_points(n: usize, cell: f64) -> Vec<[f64; 3]> {
    let mut out = Vec::with_capacity(n * n * n);
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                out.push([x as f64 * cell, y as f64 * cell, z as f64 * cell]);
            }
        }
    }
    out
}

fn bench_rtree_external_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_external_compare");
    for &n in &[8usize, 16] {
        let points = gen_grid_points(n, 10.0);
        let window = Aabb::new([15.0, 15.0, 15.0], [95.0, 95.0, 95.0]);
        group.throughput(Throughput::Elements((n * n * n) as u64));

        group.bench_function(format!("parcel_build_query_n{}", n), |b| {
            b.iter_batched(
                RTreeIndex::<Entry, f64, 3>::new,
                |mut tree| {
                    for (i, p) in points.iter().copied().enumerate() {
                        tree.insert((Aabb::point(p), i as u32));
                    }
                    let mut hits = Vec::new();
                    let count = tree.query(&SpatialPredicate::contained_by(window), &mut hits);
                    black_box(count);
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("rstar_build_query_n{}", n), |b| {
            b.iter_batched(
                || points.clone(),
                |points| {
                    let tree = RTree::bulk_load(points);
                    let envelope =
                        AABB::from_corners([15.0, 15.0, 15.0], [95.0, 95.0, 95.0]);
                    let hits: usize = tree.locate_in_envelope(&envelope).count();
                    black_box(hits);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rtree_external_compare);
criterion_main!(benches);
