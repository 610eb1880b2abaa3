// Copyright 2025 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A short walk through the index surface: build a tree over a point grid,
//! then run containment and nearest-neighbor queries against it.

use parcel_bound::Aabb;
use parcel_index::{DistancePredicate, RTreeIndex, SpatialPredicate};

type Entry = (Aabb<f64, 2>, u32);

fn main() {
    let mut tree: RTreeIndex<Entry, f64, 2> = RTreeIndex::new();
    for i in 0..10u32 {
        for j in 0..10u32 {
            tree.insert((Aabb::point([f64::from(i), f64::from(j)]), i * 10 + j));
        }
    }
    println!("indexed {} points, bounds {:?}", tree.len(), tree.bounds());

    // Which points fall in the lower-left quadrant? The max-exclusive
    // containment leaves the points on the quadrant's upper faces out.
    let quadrant = Aabb::new([0.0, 0.0], [5.0, 5.0]);
    let mut hits: Vec<Entry> = Vec::new();
    let count = tree.query(
        &SpatialPredicate::contained_by_non_inclusive(quadrant),
        &mut hits,
    );
    println!("{count} points strictly inside {quadrant:?}");

    // The five points nearest to (4.3, 6.8), closest first.
    let probe = Aabb::point([4.3, 6.8]);
    let pred = DistancePredicate::nearest(probe, 5);
    hits.clear();
    tree.query_nearest(&pred, &mut hits);
    for (bound, key) in &hits {
        println!("key {key} at squared distance {}", pred.leaf_rank(bound));
    }
}
