// Copyright 2025 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collective communication between cooperating ranks.
//!
//! The partitioner needs very little from its transport: rank identity, a
//! barrier, an all-gather, and an all-reduce with a caller-supplied
//! combiner. [`Communicator`] captures exactly that surface so an MPI
//! binding can slot in underneath; the implementations here cover the
//! degenerate single-rank case ([`SoloComm`]) and in-process groups whose
//! ranks are threads ([`ThreadComm`]), which is what the tests and demos
//! run on.

use std::any::Any;
use std::convert::Infallible;
use std::sync::{Arc, Condvar, Mutex};

use thiserror::Error;

/// The collective operations the partitioner requires.
///
/// Every rank of a group must enter the same collectives in the same order
/// with the same element counts. All operations block until the whole group
/// has participated.
pub trait Communicator {
    /// Transport failure type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// This rank's index within the group, in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Block until every rank has arrived.
    fn barrier(&self) -> Result<(), Self::Error>;

    /// Gather one value from every rank, returning them in rank order on
    /// every rank.
    fn all_gather<T>(&self, value: &T) -> Result<Vec<T>, Self::Error>
    where
        T: Clone + Send + 'static;

    /// Combine equal-length vectors elementwise across ranks.
    ///
    /// The default gathers every rank's vector and folds them in rank order,
    /// so the result is bitwise identical on every rank as long as the
    /// combiner is deterministic. The combiner need not be commutative.
    fn all_reduce<T, F>(&self, local: &[T], combine: F) -> Result<Vec<T>, Self::Error>
    where
        T: Clone + Send + 'static,
        F: Fn(&T, &T) -> T,
    {
        let rows = self.all_gather(&local.to_vec())?;
        let mut rows = rows.into_iter();
        let mut acc = rows.next().expect("a communicator has at least one rank");
        for row in rows {
            debug_assert_eq!(
                row.len(),
                acc.len(),
                "ranks reduced differing element counts"
            );
            acc = acc
                .iter()
                .zip(row.iter())
                .map(|(a, b)| combine(a, b))
                .collect();
        }
        Ok(acc)
    }
}

/// The trivial single-rank communicator.
#[derive(Copy, Clone, Debug, Default)]
pub struct SoloComm;

impl Communicator for SoloComm {
    type Error = Infallible;

    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn all_gather<T>(&self, value: &T) -> Result<Vec<T>, Self::Error>
    where
        T: Clone + Send + 'static,
    {
        Ok(vec![value.clone()])
    }
}

/// Failure of an in-process collective.
#[derive(Debug, Error)]
pub enum CommError {
    /// Another rank panicked while a collective was in flight.
    #[error("communicator state poisoned by a failed rank")]
    Poisoned,
    /// Ranks entered the same collective with different value types.
    #[error("collective type mismatch across ranks")]
    TypeMismatch,
}

struct Round {
    slots: Vec<Option<Box<dyn Any + Send>>>,
    arrived: usize,
    departed: usize,
    draining: bool,
}

struct Shared {
    size: usize,
    round: Mutex<Round>,
    turnstile: Condvar,
}

/// In-process communicator whose ranks are threads.
///
/// [`ThreadComm::split`] produces one handle per rank; move each into its
/// own thread. Collectives rendezvous on a shared slot table: every rank
/// deposits its value, the last arrival opens the exchange, and the last
/// departure resets it for the next collective.
///
/// A rank that panics outside a collective leaves the rest of the group
/// blocked, exactly as a crashed process would under a real transport.
pub struct ThreadComm {
    rank: usize,
    shared: Arc<Shared>,
}

impl ThreadComm {
    /// Create a group of `size` connected communicators, one per rank.
    pub fn split(size: usize) -> Vec<Self> {
        assert!(size > 0, "a communicator group needs at least one rank");
        let shared = Arc::new(Shared {
            size,
            round: Mutex::new(Round {
                slots: (0..size).map(|_| None).collect(),
                arrived: 0,
                departed: 0,
                draining: false,
            }),
            turnstile: Condvar::new(),
        });
        (0..size)
            .map(|rank| Self {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    fn exchange<T>(&self, value: &T) -> Result<Vec<T>, CommError>
    where
        T: Clone + Send + 'static,
    {
        let shared = &*self.shared;
        let mut round = shared.round.lock().map_err(|_| CommError::Poisoned)?;

        // Wait for the previous collective to finish draining.
        while round.draining {
            round = shared.turnstile.wait(round).map_err(|_| CommError::Poisoned)?;
        }

        round.slots[self.rank] = Some(Box::new(value.clone()));
        round.arrived += 1;
        if round.arrived == shared.size {
            round.draining = true;
            shared.turnstile.notify_all();
        } else {
            while !round.draining {
                round = shared.turnstile.wait(round).map_err(|_| CommError::Poisoned)?;
            }
        }

        let mut out = Vec::with_capacity(shared.size);
        for slot in &round.slots {
            let any = slot.as_ref().ok_or(CommError::Poisoned)?;
            let v = any.downcast_ref::<T>().ok_or(CommError::TypeMismatch)?;
            out.push(v.clone());
        }

        round.departed += 1;
        if round.departed == shared.size {
            for slot in &mut round.slots {
                *slot = None;
            }
            round.arrived = 0;
            round.departed = 0;
            round.draining = false;
            shared.turnstile.notify_all();
        }
        Ok(out)
    }
}

impl Communicator for ThreadComm {
    type Error = CommError;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn barrier(&self) -> Result<(), Self::Error> {
        self.exchange(&()).map(|_| ())
    }

    fn all_gather<T>(&self, value: &T) -> Result<Vec<T>, Self::Error>
    where
        T: Clone + Send + 'static,
    {
        self.exchange(value)
    }
}
