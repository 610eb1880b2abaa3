// Copyright 2025 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parcel RCB: distributed recursive coordinate bisection.
//!
//! Given weighted points scattered across a group of cooperating ranks, this
//! crate computes an axis-aligned partition of the global bounding volume:
//! one contiguous box per rank, with the total point weight inside each box
//! approximately balanced. The partition is computed by recursive coordinate
//! bisection — each cell splits along its longest axis at the weighted
//! median of the points it contains — with split decisions agreed across
//! ranks through collective reductions.
//!
//! The message-passing runtime is abstracted behind [`Communicator`]; the
//! crate ships a size-1 [`SoloComm`] and an in-process [`ThreadComm`] whose
//! ranks are threads. Local point lookup goes through an R-tree from
//! [`parcel_index`].
//!
//! # Example
//!
//! ```rust
//! use parcel_rcb::{PointSet, Rcb, SoloComm, Strided};
//!
//! let xs = [0.0, 1.0, 2.0, 3.0];
//! let ys = [0.0, 1.0, 0.0, 1.0];
//! let points = PointSet::<f64, 2>::new(4, [Strided::new(&xs, 1), Strided::new(&ys, 1)]);
//!
//! let mut rcb = Rcb::new(SoloComm);
//! rcb.init(&points).unwrap();
//! assert_eq!(rcb.bounds().len(), 1);
//! ```

pub mod comm;
pub mod points;
pub mod rcb;
pub mod targets;

pub use comm::{CommError, Communicator, SoloComm, ThreadComm};
pub use points::{PointSet, Strided};
pub use rcb::{Balance, Rcb, RcbError};
pub use targets::{TargetError, TargetFile, read_target_file, write_target_file};
