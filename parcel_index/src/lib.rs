// Copyright 2025 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parcel Index: in-memory bounding-volume indexes.
//!
//! Two indexes over user values with extractable bounds:
//!
//! - [`RTreeIndex`]: a Guttman R-tree with the node split strategy as a type
//!   parameter ([`Linear`] or [`Quadratic`]), supporting insertion, removal,
//!   predicate queries, and k-nearest-neighbor retrieval via best-first
//!   search.
//! - [`ExhaustiveIndex`]: the same surface over a linear scan. Small, simple,
//!   and useful as a ground-truth oracle when testing the tree.
//!
//! Queries come in two families (see [`predicate`]): spatial predicates pair
//! a page test with a leaf test and drive a breadth-first traversal; distance
//! predicates carry a result count `k` and drive a branch-and-bound search
//! pruned through a [`TruncatedMultiset`].
//!
//! # Example
//!
//! ```rust
//! use parcel_bound::Aabb;
//! use parcel_index::{RTreeIndex, SpatialPredicate};
//!
//! let mut tree: RTreeIndex<(Aabb<f64, 2>, u32), f64, 2> = RTreeIndex::new();
//! tree.insert((Aabb::new([0.0, 0.0], [1.0, 1.0]), 0));
//! tree.insert((Aabb::new([2.0, 2.0], [3.0, 3.0]), 1));
//!
//! let mut hits = Vec::new();
//! let probe = Aabb::new([0.5, 0.5], [2.5, 2.5]);
//! tree.query(&SpatialPredicate::intersects(probe), &mut hits);
//! assert_eq!(hits.len(), 2);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod exhaustive;
pub mod predicate;
pub mod rtree;
pub mod split;
pub mod truncated;

pub use exhaustive::ExhaustiveIndex;
pub use parcel_bound::{Aabb, Scalar};
pub use predicate::{DistanceMetric, DistancePredicate, SpatialOp, SpatialPredicate};
pub use rtree::{RTreeIndex, TreeStats};
pub use split::{Linear, Quadratic, Side, SplitStrategy};
pub use truncated::TruncatedMultiset;

/// Extracts the bounding box of a stored value.
///
/// Indexes are generic over the value type; this trait is the seam through
/// which they learn a value's bound. It must be pure: the same value always
/// yields the same box.
pub trait Bounded<T: Scalar, const N: usize> {
    /// The bounding box of this value.
    fn bound(&self) -> Aabb<T, N>;
}

impl<T: Scalar, const N: usize> Bounded<T, N> for Aabb<T, N> {
    fn bound(&self) -> Aabb<T, N> {
        *self
    }
}

/// The usual stored shape: a bound paired with a caller-side key.
impl<T: Scalar, const N: usize, K> Bounded<T, N> for (Aabb<T, N>, K) {
    fn bound(&self) -> Aabb<T, N> {
        self.0
    }
}
