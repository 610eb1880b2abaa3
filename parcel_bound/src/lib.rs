// Copyright 2025 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parcel Bound: N-dimensional axis-aligned bounding boxes.
//!
//! This crate provides the geometric vocabulary the rest of the workspace is
//! built on: an [`Aabb`] with a const-generic dimension, the boolean
//! predicates between two boxes (disjoint/intersects/overlaps/contains/
//! covers), squared-distance metrics usable as comparable ranks, and the
//! union/stretch operations indexes need to maintain cached bounds.
//!
//! It is generic over the scalar type `T` through the [`Scalar`] trait,
//! implemented for `f32` and `f64`.
//!
//! # Example
//!
//! ```rust
//! use parcel_bound::{Aabb, contains, union_aabb};
//!
//! let a = Aabb::new([0.0, 0.0], [2.0, 2.0]);
//! let b = Aabb::new([1.0, 1.0], [3.0, 3.0]);
//!
//! let u = union_aabb(&a, &b);
//! assert!(contains(&u, &a));
//! assert!(contains(&u, &b));
//! assert_eq!(u.area(), 9.0);
//! ```
//!
//! Boxes may be *empty* (inverted): [`Aabb::empty`] returns the box with
//! `+inf` minima and `-inf` maxima, chosen so that stretching it by any valid
//! box yields that box. Empty boxes are the identity of [`union_aabb`].
//!
//! This crate is `no_std`.

#![no_std]

pub mod aabb;
pub mod scalar;

pub use aabb::{
    Aabb, centroid_sq, cmp_min_corner, contains, contains_non_inclusive, covers, disjoint,
    furthest_sq, increase_to_hold, intersects, nearest_sq, overlaps, union_aabb,
};
pub use scalar::Scalar;
