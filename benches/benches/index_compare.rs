// Copyright 2025 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use parcel_bound::Aabb;
use parcel_index::{
    DistancePredicate, ExhaustiveIndex, Linear, RTreeIndex, SpatialPredicate,
};

type Entry = (Aabb<f64, 3>, u32);

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_random_points(count: usize, extent: f64) -> Vec<Entry> {
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    (0..count)
        .map(|i| {
            let p = [
                rng.next_f64() * extent,
                rng.next_f64() * extent,
                rng.next_f64() * extent,
            ];
            (Aabb::point(p), i as u32)
        })
        .collect()
}

fn gen_clustered_points(n_clusters: usize, per_cluster: usize, spread: f64) -> Vec<Entry> {
    let mut rng = Rng::new(0xC1A5_7E55_9999_ABCD);
    let mut out = Vec::with_capacity(n_clusters * per_cluster);
    let centers: Vec<(f64, f64, f64)> = (0..n_clusters)
        .map(|_| {
            (
                rng.next_f64() * 2000.0,
                rng.next_f64() * 2000.0,
                rng.next_f64() * 2000.0,
            )
        })
        .collect();
    for (cx, cy, cz) in centers {
        for _ in 0..per_cluster {
            let p = [
                cx + (rng.next_f64() - 0.5) * spread,
                cy + (rng.next_f64() - 0.5) * spread,
                cz + (rng.next_f64() - 0.5) * spread,
            ];
            out.push((Aabb::point(p), out.len() as u32));
        }
    }
    out
}

fn probe(extent: f64) -> Aabb<f64, 3> {
    Aabb::new(
        [extent * 0.25, extent * 0.25, extent * 0.25],
        [extent * 0.75, extent * 0.75, extent * 0.75],
    )
}

fn bench_build_and_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_query");
    for &count in &[1024usize, 4096] {
        let entries = gen_random_points(count, 1000.0);
        let pred = SpatialPredicate::contained_by_non_inclusive(probe(1000.0));
        group.throughput(Throughput::Elements(count as u64));

        group.bench_function(format!("rtree_quadratic_n{}", count), |b| {
            b.iter_batched(
                RTreeIndex::<Entry, f64, 3>::new,
                |mut tree| {
                    tree.extend(entries.iter().cloned());
                    let mut hits = Vec::new();
                    black_box(tree.query(&pred, &mut hits));
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("rtree_linear_n{}", count), |b| {
            b.iter_batched(
                RTreeIndex::<Entry, f64, 3, Linear<10, 4>>::new,
                |mut tree| {
                    tree.extend(entries.iter().cloned());
                    let mut hits = Vec::new();
                    black_box(tree.query(&pred, &mut hits));
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("exhaustive_n{}", count), |b| {
            b.iter_batched(
                ExhaustiveIndex::<Entry, f64, 3>::new,
                |mut index| {
                    index.extend(entries.iter().cloned());
                    let mut hits = Vec::new();
                    black_box(index.query(&pred, &mut hits));
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_query_heavy(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_heavy");
    let entries = gen_random_points(8192, 1000.0);

    let mut tree: RTreeIndex<Entry, f64, 3> = RTreeIndex::new();
    tree.extend(entries.iter().cloned());
    let mut exhaustive: ExhaustiveIndex<Entry, f64, 3> = ExhaustiveIndex::new();
    exhaustive.extend(entries.iter().cloned());

    group.bench_function("rtree_many_windows", |b| {
        b.iter(|| {
            let mut total = 0usize;
            for q in 0..64 {
                let x = (q % 8) as f64 * 125.0;
                let y = (q / 8) as f64 * 125.0;
                let window = Aabb::new([x, y, 0.0], [x + 200.0, y + 200.0, 1000.0]);
                let mut hits = Vec::new();
                total += tree.query(&SpatialPredicate::intersects(window), &mut hits);
            }
            black_box(total);
        })
    });

    group.bench_function("exhaustive_many_windows", |b| {
        b.iter(|| {
            let mut total = 0usize;
            for q in 0..64 {
                let x = (q % 8) as f64 * 125.0;
                let y = (q / 8) as f64 * 125.0;
                let window = Aabb::new([x, y, 0.0], [x + 200.0, y + 200.0, 1000.0]);
                let mut hits = Vec::new();
                total += exhaustive.query(&SpatialPredicate::intersects(window), &mut hits);
            }
            black_box(total);
        })
    });
    group.finish();
}

fn bench_nearest(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest");
    let entries = gen_clustered_points(16, 512, 128.0);

    let mut tree: RTreeIndex<Entry, f64, 3> = RTreeIndex::new();
    tree.extend(entries.iter().cloned());
    let mut exhaustive: ExhaustiveIndex<Entry, f64, 3> = ExhaustiveIndex::new();
    exhaustive.extend(entries.iter().cloned());

    for &k in &[1usize, 16] {
        let pred = DistancePredicate::nearest(Aabb::point([1000.0, 1000.0, 1000.0]), k);
        group.bench_function(format!("rtree_k{}", k), |b| {
            b.iter(|| {
                let mut hits = Vec::new();
                black_box(tree.query_nearest(&pred, &mut hits));
            })
        });
        group.bench_function(format!("exhaustive_k{}", k), |b| {
            b.iter(|| {
                let mut hits = Vec::new();
                black_box(exhaustive.query_nearest(&pred, &mut hits));
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_and_query, bench_query_heavy, bench_nearest);
criterion_main!(benches);
