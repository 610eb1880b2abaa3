// Copyright 2025 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Partition random points across an in-process rank group.
//!
//! Each rank is a thread holding its own slice of uniformly random points in
//! `[-100, 100]^3`. The group agrees on one box per rank, reports the weight
//! balance, and rank 0 writes the points it owns to a target file and reads
//! them back.
//!
//! Set `RUST_LOG=debug` to watch the bisection levels.

use std::thread;

use parcel_bound::{Aabb, contains_non_inclusive};
use parcel_rcb::{
    Communicator, PointSet, Rcb, TargetFile, ThreadComm, read_target_file, write_target_file,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const RANKS: usize = 4;
const POINTS_PER_RANK: usize = 2500;

fn main() {
    env_logger::init();

    let handles: Vec<_> = ThreadComm::split(RANKS)
        .into_iter()
        .map(|comm| thread::spawn(move || run_rank(comm)))
        .collect();
    for handle in handles {
        handle.join().expect("rank thread panicked");
    }
}

fn run_rank(comm: ThreadComm) {
    let rank = comm.rank();
    let mut rng = SmallRng::seed_from_u64(0xB15EC7 + rank as u64);
    let xyz: Vec<f64> = (0..POINTS_PER_RANK * 3)
        .map(|_| rng.gen_range(-100.0..100.0))
        .collect();
    let points = PointSet::<f64, 3>::from_interleaved(&xyz);

    let mut rcb = Rcb::new(comm);
    rcb.init(&points).expect("partitioning failed");
    let balance = rcb.report(&points).expect("balance report failed");

    if rank == 0 {
        for (i, cell) in rcb.bounds().iter().enumerate() {
            println!("rank {i}: {cell:?}");
        }
        println!(
            "weights: min {} max {} imbalance {:.4}",
            balance.min_weight, balance.max_weight, balance.imbalance
        );
    }

    // Round-trip this rank's owned points through a target file.
    let own_cell = rcb.bounds()[rank];
    let owned: Vec<f64> = (0..points.len())
        .filter(|&i| contains_non_inclusive(&own_cell, &Aabb::point(points.point(i))))
        .flat_map(|i| points.point(i))
        .collect();
    let target = TargetFile {
        ndim: 3,
        npoints: owned.len() / 3,
        nvar: 0,
        coordinates: owned,
        variables: Vec::new(),
    };

    let mut path = std::env::temp_dir();
    path.push(format!("parcel_rank{rank}_{}.txt", std::process::id()));
    write_target_file(&path, &target).expect("target write failed");
    let read_back = read_target_file(&path).expect("target read failed");
    std::fs::remove_file(&path).ok();
    assert_eq!(read_back.npoints, target.npoints);
    println!("rank {rank} owns {} of its local points", target.npoints);
}
