// Copyright 2025 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The recursive coordinate bisection engine.

use std::cmp::Ordering;

use log::{debug, info};
use parcel_bound::{Aabb, Scalar, cmp_min_corner};
use parcel_index::{RTreeIndex, SpatialPredicate};
use thiserror::Error;

use crate::comm::Communicator;
use crate::points::PointSet;

/// Failure of a partitioner call.
#[derive(Debug, Error)]
pub enum RcbError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Every rank entered the partitioner with zero points, so no domain
    /// exists to partition.
    #[error("no points to partition on any rank")]
    EmptyDomain,
    /// A method needing the computed partition ran before `init`.
    #[error("partition has not been computed")]
    NotPartitioned,
    /// The transport failed a collective; the partition state is unusable.
    #[error("collective operation failed: {0}")]
    Collective(#[from] E),
}

/// Weight distribution over the computed partition, identical on every rank.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Balance<T> {
    /// Number of partition cells (the communicator size).
    pub partitions: usize,
    /// Smallest per-cell weight sum.
    pub min_weight: T,
    /// Largest per-cell weight sum.
    pub max_weight: T,
    /// `(max - min) / total`.
    pub ratio: T,
    /// `max / min`.
    pub imbalance: T,
}

/// Recursive coordinate bisection over a communicator.
///
/// [`init`](Rcb::init) consumes a local [`PointSet`] on every rank and
/// computes the same ordered list of cells everywhere: one axis-aligned box
/// per rank, covering the inflated global domain, with per-cell point
/// weights approximately balanced. Each bisection level splits every pending
/// cell along its longest axis at a weight-averaged median agreed through a
/// single `all_reduce`.
///
/// Cell boundaries use max-exclusive containment, so a point sitting exactly
/// on a shared face belongs to exactly one cell.
pub struct Rcb<C, T, const N: usize> {
    comm: C,
    bounds: Vec<Aabb<T, N>>,
}

type LocalIndex<T, const N: usize> = RTreeIndex<(Aabb<T, N>, usize), T, N>;

fn gt<T: PartialOrd>(a: T, b: T) -> bool {
    matches!(a.partial_cmp(&b), Some(Ordering::Greater))
}

impl<C, T, const N: usize> Rcb<C, T, N>
where
    C: Communicator,
    T: Scalar + Send + 'static,
{
    /// Create a partitioner over `comm`. No partition exists until
    /// [`init`](Rcb::init) runs.
    pub fn new(comm: C) -> Self {
        Self {
            comm,
            bounds: Vec::new(),
        }
    }

    /// The communicator this partitioner runs over.
    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// The computed cells in their canonical order (lexicographic by min
    /// corner). Empty until [`init`](Rcb::init) has run.
    pub fn bounds(&self) -> &[Aabb<T, N>] {
        &self.bounds
    }

    /// Compute the partition from each rank's local points.
    ///
    /// Collective: every rank must call this with its own point set. On
    /// success `bounds()` holds exactly `comm.size()` cells, identical on
    /// every rank.
    pub fn init(&mut self, points: &PointSet<'_, T, N>) -> Result<(), RcbError<C::Error>> {
        let (tree, weights) = Self::build_index(points);

        // Union the per-rank bounds into the global domain, then inflate it
        // one float step so every point is strictly interior. Empty ranks
        // contribute the empty box, the union identity.
        let local_bound = tree.bounds().unwrap_or_else(Aabb::empty);
        let bounds_by_rank = self.comm.all_gather(&local_bound)?;
        let mut global_box = Aabb::empty();
        for bound in &bounds_by_rank {
            global_box.stretch(bound);
        }
        if global_box.is_empty() {
            return Err(RcbError::EmptyDomain);
        }
        global_box.next_larger();

        let total_partitions = self.comm.size();
        let mut to_split: Vec<(Aabb<T, N>, usize)> = Vec::new();
        let mut done: Vec<Aabb<T, N>> = Vec::new();
        if total_partitions == 1 {
            done.push(global_box);
        } else {
            to_split.push((global_box, total_partitions));
        }

        while !to_split.is_empty() {
            // One candidate per pending cell: the local weighted median
            // along the cell's longest axis, packed as
            // (median * local_weight, local_weight) so ranks combine by sum.
            let mut local_candidates: Vec<(T, T)> = Vec::with_capacity(to_split.len());
            for (cell, parts) in &to_split {
                let small = parts / 2;
                let ratio = T::div(T::from_usize(small), T::from_usize(*parts));
                let long_dim = cell.longest_dimension();

                let mut contained: Vec<(Aabb<T, N>, usize)> = Vec::new();
                tree.query(
                    &SpatialPredicate::contained_by_non_inclusive(*cell),
                    &mut contained,
                );
                if contained.is_empty() {
                    local_candidates.push((T::zero(), T::zero()));
                    continue;
                }
                contained.sort_by(|a, b| {
                    a.0.center(long_dim)
                        .partial_cmp(&b.0.center(long_dim))
                        .unwrap_or(Ordering::Equal)
                });

                let mut prefix: Vec<T> = Vec::with_capacity(contained.len());
                let mut acc = T::zero();
                for entry in &contained {
                    acc = T::add(acc, weights[entry.1]);
                    prefix.push(acc);
                }
                let total_weight = acc;
                let target = T::mul(ratio, total_weight);
                let median_index = prefix
                    .partition_point(|w| !gt(*w, target))
                    .min(contained.len() - 1);
                let median_value = contained[median_index].0.center(long_dim);
                local_candidates.push((T::mul(median_value, total_weight), total_weight));
            }

            let global_candidates = self
                .comm
                .all_reduce(&local_candidates, |a, b| (T::add(a.0, b.0), T::add(a.1, b.1)))?;

            let mut next_round: Vec<(Aabb<T, N>, usize)> = Vec::new();
            for ((cell, parts), (weighted_sum, weight_total)) in
                to_split.iter().zip(&global_candidates)
            {
                let long_dim = cell.longest_dimension();
                // A cell no rank has points in splits at its center.
                let split_coord = if gt(*weight_total, T::zero()) {
                    T::div(*weighted_sum, *weight_total)
                } else {
                    cell.center(long_dim)
                };

                let mut low = *cell;
                let mut low_max = low.max_corner();
                low_max[long_dim] = split_coord;
                low.set(low.min_corner(), low_max);

                let mut high = *cell;
                let mut high_min = high.min_corner();
                high_min[long_dim] = split_coord;
                high.set(high_min, high.max_corner());

                let small = parts / 2;
                let large = parts - small;
                if small == 1 {
                    done.push(low);
                } else {
                    next_round.push((low, small));
                }
                if large == 1 {
                    done.push(high);
                } else {
                    next_round.push((high, large));
                }
            }
            debug!(
                "bisection level done: {} cells settled, {} still splitting",
                done.len(),
                next_round.len()
            );
            to_split = next_round;
        }

        done.sort_by(cmp_min_corner);
        self.bounds = done;
        Ok(())
    }

    /// Recompute the per-cell weight sums and report the balance.
    ///
    /// Collective: every rank must call this with its own point set. The
    /// returned value is identical on every rank; rank 0 also logs it.
    pub fn report(&self, points: &PointSet<'_, T, N>) -> Result<Balance<T>, RcbError<C::Error>> {
        if self.bounds.is_empty() {
            return Err(RcbError::NotPartitioned);
        }
        let (tree, weights) = Self::build_index(points);

        let mut local_totals: Vec<T> = Vec::with_capacity(self.bounds.len());
        for cell in &self.bounds {
            let mut contained: Vec<(Aabb<T, N>, usize)> = Vec::new();
            tree.query(
                &SpatialPredicate::contained_by_non_inclusive(*cell),
                &mut contained,
            );
            let total = contained
                .iter()
                .fold(T::zero(), |acc, entry| T::add(acc, weights[entry.1]));
            local_totals.push(total);
        }

        let global_totals = self
            .comm
            .all_reduce(&local_totals, |a, b| T::add(*a, *b))?;

        let mut min_weight = global_totals[0];
        let mut max_weight = global_totals[0];
        let mut sum = T::zero();
        for &w in &global_totals {
            if gt(min_weight, w) {
                min_weight = w;
            }
            if gt(w, max_weight) {
                max_weight = w;
            }
            sum = T::add(sum, w);
        }

        let balance = Balance {
            partitions: global_totals.len(),
            min_weight,
            max_weight,
            ratio: T::div(T::sub(max_weight, min_weight), sum),
            imbalance: T::div(max_weight, min_weight),
        };
        if self.comm.rank() == 0 {
            info!(
                "partition balance over {} cells: min {:?}, max {:?}, ratio {:?}, imbalance {:?}",
                balance.partitions,
                balance.min_weight,
                balance.max_weight,
                balance.ratio,
                balance.imbalance
            );
        }
        self.comm.barrier()?;
        Ok(balance)
    }

    fn build_index(points: &PointSet<'_, T, N>) -> (LocalIndex<T, N>, Vec<T>) {
        let mut weights = Vec::with_capacity(points.len());
        let mut tree = LocalIndex::new();
        for i in 0..points.len() {
            weights.push(points.weight(i));
            tree.insert((Aabb::point(points.point(i)), i));
        }
        (tree, weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{SoloComm, ThreadComm};
    use crate::points::Strided;
    use parcel_bound::contains_non_inclusive;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;
    use std::thread;

    fn run_on_ranks<R, F>(size: usize, f: F) -> Vec<R>
    where
        R: Send + 'static,
        F: Fn(ThreadComm) -> R + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let handles: Vec<_> = ThreadComm::split(size)
            .into_iter()
            .map(|comm| {
                let f = Arc::clone(&f);
                thread::spawn(move || f(comm))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    }

    fn owners<const N: usize>(bounds: &[Aabb<f64, N>], p: [f64; N]) -> usize {
        let point = Aabb::point(p);
        bounds
            .iter()
            .filter(|cell| contains_non_inclusive(cell, &point))
            .count()
    }

    #[test]
    fn single_rank_gets_the_whole_domain() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [5.0, 6.0, 7.0];
        let points =
            PointSet::<f64, 2>::new(3, [Strided::new(&xs, 1), Strided::new(&ys, 1)]);
        let mut rcb = Rcb::new(SoloComm);
        rcb.init(&points).unwrap();

        assert_eq!(rcb.bounds().len(), 1);
        for i in 0..3 {
            assert_eq!(owners(rcb.bounds(), [xs[i], ys[i]]), 1);
        }

        let balance = rcb.report(&points).unwrap();
        assert_eq!(balance.partitions, 1);
        assert_eq!(balance.min_weight, 3.0);
        assert_eq!(balance.max_weight, 3.0);
        assert_eq!(balance.ratio, 0.0);
        assert_eq!(balance.imbalance, 1.0);
    }

    #[test]
    fn empty_domain_is_an_error() {
        let xs: [f64; 0] = [];
        let points = PointSet::<f64, 1>::new(0, [Strided::new(&xs, 1)]);
        let mut rcb = Rcb::new(SoloComm);
        assert!(matches!(rcb.init(&points), Err(RcbError::EmptyDomain)));
        assert!(matches!(rcb.report(&points), Err(RcbError::NotPartitioned)));
    }

    #[test]
    fn empty_domain_is_agreed_across_ranks() {
        let results = run_on_ranks(3, |comm| {
            let xs: [f64; 0] = [];
            let points = PointSet::<f64, 1>::new(0, [Strided::new(&xs, 1)]);
            let mut rcb = Rcb::new(comm);
            matches!(rcb.init(&points), Err(RcbError::EmptyDomain))
        });
        assert!(results.into_iter().all(|failed| failed));
    }

    #[test]
    fn two_ranks_split_at_the_weighted_median() {
        let results = run_on_ranks(2, |comm| {
            let rank = comm.rank();
            let (xs, ws): ([f64; 2], [f64; 2]) = if rank == 0 {
                ([0.0, 1.0], [1.0, 1.0])
            } else {
                ([2.0, 3.0], [1.0, 5.0])
            };
            let points = PointSet::<f64, 1>::new(2, [Strided::new(&xs, 1)])
                .with_weights(Strided::new(&ws, 1));
            let mut rcb = Rcb::new(comm);
            rcb.init(&points).unwrap();
            let balance = rcb.report(&points).unwrap();
            (rcb.bounds().to_vec(), balance)
        });

        let (bounds, balance) = &results[0];
        assert_eq!(results[1].0, *bounds);
        assert_eq!(results[1].1, *balance);

        // Rank 0 offers median 1 with weight 2, rank 1 offers median 3 with
        // weight 6; the agreed cut is (1*2 + 3*6) / 8 = 2.5.
        assert_eq!(bounds.len(), 2);
        assert_eq!(bounds[0].max(0), 2.5);
        assert_eq!(bounds[1].min(0), 2.5);

        // Weights land 3 low (points 0, 1, 2) and 5 high (point 3).
        assert_eq!(balance.min_weight, 3.0);
        assert_eq!(balance.max_weight, 5.0);
        assert_eq!(balance.ratio, 0.25);
        assert_eq!(balance.imbalance, 5.0 / 3.0);
    }

    #[test]
    fn point_on_the_cut_has_exactly_one_owner() {
        let results = run_on_ranks(2, |comm| {
            // Both ranks hold the same coincident points, so the cut lands
            // exactly on them.
            let xs = [1.0, 1.0];
            let points = PointSet::<f64, 1>::new(2, [Strided::new(&xs, 1)]);
            let mut rcb = Rcb::new(comm);
            rcb.init(&points).unwrap();
            let bounds = rcb.bounds().to_vec();
            owners(&bounds, [1.0])
        });
        assert_eq!(results, [1, 1]);
    }

    #[test]
    fn a_rank_without_points_still_participates() {
        let results = run_on_ranks(2, |comm| {
            let rank = comm.rank();
            let xs: Vec<f64> = if rank == 0 {
                Vec::new()
            } else {
                (0..8).map(f64::from).collect()
            };
            let points = PointSet::<f64, 1>::new(xs.len(), [Strided::new(&xs, 1)]);
            let mut rcb = Rcb::new(comm);
            rcb.init(&points).unwrap();
            let bounds = rcb.bounds().to_vec();
            xs.iter().map(|&x| owners(&bounds, [x])).collect::<Vec<_>>()
        });
        assert!(results[0].is_empty());
        assert!(results[1].iter().all(|&n| n == 1));
    }

    #[test]
    fn four_ranks_partition_random_points() {
        let per_rank = 250;
        let results = run_on_ranks(4, move |comm| {
            let mut rng = SmallRng::seed_from_u64(42 + comm.rank() as u64);
            let xyz: Vec<f64> = (0..per_rank * 3)
                .map(|_| rng.gen_range(-100.0..100.0))
                .collect();
            let points = PointSet::<f64, 3>::from_interleaved(&xyz);
            let mut rcb = Rcb::new(comm);
            rcb.init(&points).unwrap();
            let bounds = rcb.bounds().to_vec();
            let owner_counts: Vec<usize> = (0..points.len())
                .map(|i| owners(&bounds, points.point(i)))
                .collect();
            (bounds, owner_counts)
        });

        let bounds = &results[0].0;
        assert_eq!(bounds.len(), 4);
        for (other, owner_counts) in &results {
            assert_eq!(other, bounds);
            assert!(owner_counts.iter().all(|&n| n == 1));
        }
    }

    #[test]
    fn balance_tightens_with_many_points() {
        let per_rank = 2000;
        let results = run_on_ranks(4, move |comm| {
            let mut rng = SmallRng::seed_from_u64(7 + comm.rank() as u64);
            let xyz: Vec<f64> = (0..per_rank * 3)
                .map(|_| rng.gen_range(-100.0..100.0))
                .collect();
            let points = PointSet::<f64, 3>::from_interleaved(&xyz);
            let mut rcb = Rcb::new(comm);
            rcb.init(&points).unwrap();
            rcb.report(&points).unwrap()
        });

        let balance = results[0];
        assert_eq!(balance.partitions, 4);
        for other in &results {
            assert_eq!(*other, balance);
        }
        assert!(
            balance.imbalance < 1.10,
            "cell weights too uneven: {balance:?}"
        );
    }
}
