// Copyright 2025 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node split strategies for the R-tree.
//!
//! When a page exceeds its child capacity it is split in two: a strategy
//! first picks two *seed* children to anchor the halves, then repeatedly
//! picks the next child and the half it should join. The two classic Guttman
//! strategies are provided; the tree algorithm depends only on this trait.

use core::cmp::Ordering;

use parcel_bound::{Aabb, Scalar, increase_to_hold, union_aabb};

/// Which split half a child is assigned to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    /// The half anchored by the first seed.
    A,
    /// The half anchored by the second seed.
    B,
}

/// A node split strategy: capacity constants plus the seed and placement
/// choices used while rebalancing.
///
/// Implementations must guarantee `pick_seeds` returns two distinct indexes
/// into `children`, and are only called with more than `MAX_CHILDREN`
/// children. `MIN_CHILDREN` must satisfy `1 < MIN_CHILDREN <= MAX_CHILDREN/2`.
pub trait SplitStrategy {
    /// Largest number of children a page may hold.
    const MAX_CHILDREN: usize;
    /// Smallest number of children a non-root page may hold.
    const MIN_CHILDREN: usize;

    /// Choose two distinct seed children from an overfull page.
    fn pick_seeds<T: Scalar, const N: usize>(
        parent: &Aabb<T, N>,
        children: &[Aabb<T, N>],
    ) -> (usize, usize);

    /// Choose the next remaining child to place and the half to place it in.
    fn pick_next<T: Scalar, const N: usize>(
        remaining: &[Aabb<T, N>],
        a: &Aabb<T, N>,
        b: &Aabb<T, N>,
    ) -> (usize, Side);
}

fn lt<T: PartialOrd>(a: T, b: T) -> bool {
    matches!(a.partial_cmp(&b), Some(Ordering::Less))
}

fn gt<T: PartialOrd>(a: T, b: T) -> bool {
    matches!(a.partial_cmp(&b), Some(Ordering::Greater))
}

/// Guttman's linear split: O(n) seed selection along the most spread axis,
/// children placed in stored order.
#[derive(Copy, Clone, Debug, Default)]
pub struct Linear<const MAX: usize, const MIN: usize>;

impl<const MAX: usize, const MIN: usize> SplitStrategy for Linear<MAX, MIN> {
    const MAX_CHILDREN: usize = MAX;
    const MIN_CHILDREN: usize = MIN;

    fn pick_seeds<T: Scalar, const N: usize>(
        parent: &Aabb<T, N>,
        children: &[Aabb<T, N>],
    ) -> (usize, usize) {
        let mut best: Option<(usize, usize)> = None;
        let mut max_scaled_length = T::neg_infinity();

        for dim in 0..N {
            // The child whose min is highest and the child whose max is
            // lowest bound the spread of this axis.
            let mut maximum_min = T::neg_infinity();
            let mut maximum_min_child = 0;
            let mut minimum_max = T::infinity();
            let mut minimum_max_child = 0;
            for (i, child) in children.iter().enumerate() {
                if gt(child.min(dim), maximum_min) {
                    maximum_min = child.min(dim);
                    maximum_min_child = i;
                }
                if lt(child.max(dim), minimum_max) {
                    minimum_max = child.max(dim);
                    minimum_max_child = i;
                }
            }

            let scaled_length = T::div(T::abs(T::sub(minimum_max, maximum_min)), parent.length(dim));
            if gt(scaled_length, max_scaled_length) {
                max_scaled_length = scaled_length;
                best = Some((minimum_max_child, maximum_min_child));
            }
        }

        // Every axis can produce an undefined ratio when the parent is
        // degenerate; fall back to the outermost children.
        let (first, mut second) = best.unwrap_or((0, children.len() - 1));

        // The textbook selection can pick the same child twice on
        // Cartesian-aligned data; swap in an arbitrary distinct sibling.
        if first == second {
            second = if first == 0 { children.len() - 1 } else { 0 };
        }
        (first, second)
    }

    fn pick_next<T: Scalar, const N: usize>(
        remaining: &[Aabb<T, N>],
        a: &Aabb<T, N>,
        b: &Aabb<T, N>,
    ) -> (usize, Side) {
        let next = &remaining[0];
        let a_increase = increase_to_hold(a, next);
        let b_increase = increase_to_hold(b, next);
        let side = if lt(a_increase, b_increase) {
            Side::A
        } else {
            Side::B
        };
        (0, side)
    }
}

/// Guttman's quadratic split: O(n²) seed selection maximizing wasted area,
/// children placed most-constrained first.
#[derive(Copy, Clone, Debug, Default)]
pub struct Quadratic<const MAX: usize, const MIN: usize>;

impl<const MAX: usize, const MIN: usize> SplitStrategy for Quadratic<MAX, MIN> {
    const MAX_CHILDREN: usize = MAX;
    const MIN_CHILDREN: usize = MIN;

    fn pick_seeds<T: Scalar, const N: usize>(
        _parent: &Aabb<T, N>,
        children: &[Aabb<T, N>],
    ) -> (usize, usize) {
        let mut ans = (0, 1);
        let mut max_wasted_area = T::neg_infinity();

        for (i, ci) in children.iter().enumerate() {
            let i_area = ci.area();
            for (j, cj) in children.iter().enumerate().skip(i + 1) {
                let pair_area = union_aabb(ci, cj).area();
                let wasted_area = T::sub(T::sub(pair_area, i_area), cj.area());
                if gt(wasted_area, max_wasted_area) {
                    max_wasted_area = wasted_area;
                    ans = (i, j);
                }
            }
        }
        ans
    }

    fn pick_next<T: Scalar, const N: usize>(
        remaining: &[Aabb<T, N>],
        a: &Aabb<T, N>,
        b: &Aabb<T, N>,
    ) -> (usize, Side) {
        let mut next = 0;
        let mut side = Side::B;
        let mut max_difference = T::neg_infinity();

        for (i, child) in remaining.iter().enumerate() {
            let a_increase = increase_to_hold(a, child);
            let b_increase = increase_to_hold(b, child);
            let difference = T::abs(T::sub(a_increase, b_increase));
            if gt(difference, max_difference) {
                max_difference = difference;
                next = i;
                side = if lt(a_increase, b_increase) {
                    Side::A
                } else {
                    Side::B
                };
            }
        }
        (next, side)
    }
}
