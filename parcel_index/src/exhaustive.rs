// Copyright 2025 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linear-scan index with the same surface as the tree.

use alloc::vec::Vec;

use parcel_bound::{Aabb, Scalar};

use crate::Bounded;
use crate::predicate::{DistancePredicate, SpatialPredicate};
use crate::truncated::TruncatedMultiset;

/// Linear-scan index over values with extractable bounds.
///
/// A drop-in alternative to [`RTreeIndex`](crate::RTreeIndex): every query
/// visits every value. Slow at scale, but trivially correct, which makes it
/// the ground-truth oracle in the tree's tests. It also accepts distance
/// predicates the tree cannot prune (centroid/furthest leaf metrics).
#[derive(Clone, Debug)]
pub struct ExhaustiveIndex<V, T: Scalar, const N: usize> {
    values: Vec<V>,
    bound: Aabb<T, N>,
}

impl<V, T, const N: usize> Default for ExhaustiveIndex<V, T, N>
where
    V: Bounded<T, N>,
    T: Scalar,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, T, const N: usize> ExhaustiveIndex<V, T, N>
where
    V: Bounded<T, N>,
    T: Scalar,
{
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            bound: Aabb::empty(),
        }
    }

    /// Number of values stored.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if no values are stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The bound enclosing every stored value, or `None` when empty.
    pub fn bounds(&self) -> Option<Aabb<T, N>> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.bound)
        }
    }

    /// Insert a value, stretching the cached bound.
    pub fn insert(&mut self, value: V) {
        self.bound.stretch(&value.bound());
        self.values.push(value);
    }

    /// Insert every value from an iterator.
    pub fn extend<I: IntoIterator<Item = V>>(&mut self, values: I) {
        for value in values {
            self.insert(value);
        }
    }

    /// Remove every stored value equal to `example`, then restretch.
    pub fn remove(&mut self, example: &V)
    where
        V: PartialEq,
    {
        self.values.retain(|v| v != example);
        self.restretch();
    }

    /// Remove every value yielded by an iterator.
    pub fn remove_all<'a, I: IntoIterator<Item = &'a V>>(&mut self, examples: I)
    where
        V: PartialEq + 'a,
    {
        for example in examples {
            self.values.retain(|v| v != example);
        }
        self.restretch();
    }

    /// Drop every value.
    pub fn clear(&mut self) {
        self.values.clear();
        self.bound.reset();
    }

    /// Iterate over the stored values in insertion order.
    pub fn iter(&self) -> core::slice::Iter<'_, V> {
        self.values.iter()
    }

    /// Run a spatial query, appending matching values to `out`.
    ///
    /// Returns the number of values appended. Every value is tested with the
    /// predicate's leaf operation.
    pub fn query(&self, pred: &SpatialPredicate<T, N>, out: &mut Vec<V>) -> usize
    where
        V: Clone,
    {
        let mut count = 0;
        for value in &self.values {
            if pred.test_leaf(&value.bound()) {
                out.push(value.clone());
                count += 1;
            }
        }
        count
    }

    /// Run a k-nearest query, appending the results to `out` in ascending
    /// distance order. Returns the number of values appended.
    ///
    /// Any leaf metric is accepted; there is no pruning to invalidate.
    pub fn query_nearest(&self, pred: &DistancePredicate<T, N>, out: &mut Vec<V>) -> usize
    where
        V: Clone,
    {
        let mut kept: TruncatedMultiset<T, &V> =
            TruncatedMultiset::with_capacity_limit(pred.count());
        for value in &self.values {
            kept.insert(pred.leaf_rank(&value.bound()), value);
        }
        let count = kept.len();
        for (_, value) in kept {
            out.push(value.clone());
        }
        count
    }

    fn restretch(&mut self) {
        self.bound.reset();
        for value in &self.values {
            self.bound.stretch(&value.bound());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{DistancePredicate, SpatialPredicate};

    type Entry = (Aabb<f64, 2>, u32);

    #[test]
    fn bound_tracks_inserts_and_removes() {
        let mut index: ExhaustiveIndex<Entry, f64, 2> = ExhaustiveIndex::new();
        assert_eq!(index.bounds(), None);

        let near = (Aabb::new([0.0, 0.0], [1.0, 1.0]), 0);
        let far = (Aabb::new([10.0, 10.0], [11.0, 11.0]), 1);
        index.insert(near.clone());
        index.insert(far.clone());
        assert_eq!(index.bounds(), Some(Aabb::new([0.0, 0.0], [11.0, 11.0])));

        index.remove(&far);
        assert_eq!(index.bounds(), Some(near.0));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn spatial_query_scans_leaves() {
        let mut index: ExhaustiveIndex<Entry, f64, 2> = ExhaustiveIndex::new();
        for i in 0..10u32 {
            index.insert((Aabb::point([f64::from(i), 0.0]), i));
        }
        let probe = Aabb::new([2.0, -1.0], [6.0, 1.0]);
        let mut hits = Vec::new();
        let count = index.query(&SpatialPredicate::contained_by(probe), &mut hits);
        assert_eq!(count, 5);
    }

    #[test]
    fn nearest_query_accepts_the_centroid_metric() {
        let mut index: ExhaustiveIndex<Entry, f64, 2> = ExhaustiveIndex::new();
        index.insert((Aabb::new([0.0, 0.0], [4.0, 4.0]), 0)); // center (2, 2)
        index.insert((Aabb::new([5.0, 5.0], [6.0, 6.0]), 1)); // center (5.5, 5.5)

        let pred = DistancePredicate::centroid(Aabb::point([5.0, 5.0]), 1);
        let mut hits = Vec::new();
        assert_eq!(index.query_nearest(&pred, &mut hits), 1);
        assert_eq!(hits[0].1, 1);
    }

    #[test]
    fn nearest_query_reports_emitted_count() {
        let mut index: ExhaustiveIndex<Entry, f64, 2> = ExhaustiveIndex::new();
        index.insert((Aabb::point([0.0, 0.0]), 0));
        let pred = DistancePredicate::nearest(Aabb::point([1.0, 1.0]), 5);
        let mut hits = Vec::new();
        assert_eq!(index.query_nearest(&pred, &mut hits), 1);
    }
}
