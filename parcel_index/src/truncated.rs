// Copyright 2025 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A sorted multiset truncated to a fixed capacity.

use alloc::vec::Vec;
use core::cmp::Ordering;

/// A multiset of `(rank, value)` pairs kept in ascending rank order and
/// truncated to a capacity fixed at construction.
///
/// After every insertion the set holds exactly the `capacity` smallest ranks
/// ever inserted; entries beyond that are silently dropped. Entries with
/// equal ranks keep their insertion order. The default capacity is unbounded,
/// in which case the set doubles as a min-first priority queue via
/// [`pop_first`](TruncatedMultiset::pop_first).
#[derive(Clone, Debug)]
pub struct TruncatedMultiset<K, V> {
    entries: Vec<(K, V)>,
    capacity: usize,
}

impl<K: PartialOrd, V> TruncatedMultiset<K, V> {
    /// Create an unbounded set.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            capacity: usize::MAX,
        }
    }

    /// Create a set keeping at most the `capacity` smallest entries.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Number of entries currently kept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entries are kept.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The capacity this set truncates to.
    pub fn capacity_limit(&self) -> usize {
        self.capacity
    }

    /// Insert a pair, then drop trailing entries beyond the capacity.
    pub fn insert(&mut self, rank: K, value: V) {
        let pos = self.entries.partition_point(|(k, _)| {
            !matches!(k.partial_cmp(&rank), Some(Ordering::Greater))
        });
        self.entries.insert(pos, (rank, value));
        if self.entries.len() > self.capacity {
            self.entries.truncate(self.capacity);
        }
    }

    /// The largest kept rank, if any.
    pub fn last_rank(&self) -> Option<&K> {
        self.entries.last().map(|(k, _)| k)
    }

    /// Remove and return the smallest entry.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Iterate over kept entries in ascending rank order.
    pub fn iter(&self) -> impl Iterator<Item = &(K, V)> {
        self.entries.iter()
    }
}

impl<K: PartialOrd, V> Default for TruncatedMultiset<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> IntoIterator for TruncatedMultiset<K, V> {
    type Item = (K, V);
    type IntoIter = alloc::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
