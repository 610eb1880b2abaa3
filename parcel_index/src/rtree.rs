// Copyright 2025 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Guttman R-tree over a slab arena.
//!
//! Nodes live in a `Vec` arena addressed by index handles; a node is either a
//! leaf holding one user value or a page holding an ordered child list and a
//! cached bound equal to the union of its children's bounds. Parents are
//! back-indices, so the child list is the only ownership edge. The split
//! strategy is a type parameter; the algorithms below depend only on its
//! capacity constants and its seed/placement choices.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::marker::PhantomData;

use parcel_bound::{Aabb, Scalar, increase_to_hold};

use crate::Bounded;
use crate::predicate::{DistancePredicate, SpatialPredicate};
use crate::split::{Quadratic, Side, SplitStrategy};
use crate::truncated::TruncatedMultiset;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct NodeId(usize);

impl NodeId {
    const fn new(i: usize) -> Self {
        Self(i)
    }

    const fn get(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
enum NodeKind<V> {
    Leaf(V),
    Page(Vec<NodeId>),
}

#[derive(Clone, Debug)]
struct Node<V, T, const N: usize> {
    kind: NodeKind<V>,
    // Leaf: the extracted bound of the value. Page: union of child bounds.
    bound: Aabb<T, N>,
    parent: Option<NodeId>,
}

/// Shape summary of a tree, from [`RTreeIndex::stats`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of leaves (stored values).
    pub leaves: usize,
    /// Number of pages.
    pub pages: usize,
    /// Longest root-to-node path, in nodes. Zero for an unrooted tree.
    pub depth: usize,
    /// `page_sizes[n]` pages hold exactly `n` children.
    pub page_sizes: Vec<usize>,
}

/// R-tree index over values with extractable bounds.
///
/// `S` selects the node split strategy; the default is the quadratic Guttman
/// split with at most 10 and at least 4 children per page.
///
/// Insertion and removal keep every non-root page within the strategy's
/// occupancy bounds. Removal matches by equality against an example value
/// (every stored leaf whose bound and value equal it is removed); removing a
/// value that is not present is a caller contract violation checked by a
/// debug assertion.
pub struct RTreeIndex<V, T: Scalar, const N: usize, S: SplitStrategy = Quadratic<10, 4>> {
    nodes: Vec<Option<Node<V, T, N>>>,
    free_list: Vec<usize>,
    root: Option<NodeId>,
    len: usize,
    _strategy: PhantomData<S>,
}

impl<V, T, const N: usize, S> Default for RTreeIndex<V, T, N, S>
where
    V: Bounded<T, N>,
    T: Scalar,
    S: SplitStrategy,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, T, const N: usize, S> core::fmt::Debug for RTreeIndex<V, T, N, S>
where
    T: Scalar,
    S: SplitStrategy,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("RTreeIndex")
            .field("len", &self.len)
            .field("arena_nodes", &total)
            .field("alive", &alive)
            .field("has_root", &self.root.is_some())
            .finish_non_exhaustive()
    }
}

impl<V, T, const N: usize, S> RTreeIndex<V, T, N, S>
where
    V: Bounded<T, N>,
    T: Scalar,
    S: SplitStrategy,
{
    /// Create an empty tree.
    pub fn new() -> Self {
        debug_assert!(
            S::MIN_CHILDREN > 1 && S::MIN_CHILDREN <= S::MAX_CHILDREN / 2,
            "split strategy occupancy out of range"
        );
        Self {
            nodes: Vec::new(),
            free_list: Vec::new(),
            root: None,
            len: 0,
            _strategy: PhantomData,
        }
    }

    /// Number of values stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no values are stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bound enclosing every stored value, or `None` when empty.
    pub fn bounds(&self) -> Option<Aabb<T, N>> {
        if self.len == 0 {
            return None;
        }
        self.root.map(|r| self.bound(r))
    }

    /// Insert a value.
    pub fn insert(&mut self, value: V) {
        let bound = value.bound();
        let leaf = self.alloc(Node {
            kind: NodeKind::Leaf(value),
            bound,
            parent: None,
        });
        self.root = Some(self.attach_and_expand(self.root, leaf));
        self.len += 1;
    }

    /// Insert every value from an iterator.
    pub fn extend<I: IntoIterator<Item = V>>(&mut self, values: I) {
        for value in values {
            self.insert(value);
        }
    }

    /// Remove every stored value equal to `example` (bound and value).
    pub fn remove(&mut self, example: &V)
    where
        V: PartialEq,
    {
        let Some(root) = self.root else {
            return;
        };
        let bound = example.bound();
        let mut page = self.descend(root, &bound);
        let mut matches = self.matching_leaves_in(page, &bound, example);
        if matches.is_empty() {
            // Overlapping sibling pages can misroute the descent away from
            // the owner; fall back to a containment search.
            let Some(owner) = self.find_owner_page(root, &bound, example) else {
                debug_assert!(false, "remove of a value that is not stored");
                return;
            };
            page = owner;
            matches = self.matching_leaves_in(page, &bound, example);
        }

        for &m in &matches {
            self.page_remove(page, m, false);
            self.free(m);
        }
        self.len -= matches.len();
        self.restretch(page);
        self.root = Some(self.condense_tree(page));
    }

    /// Remove every value yielded by an iterator.
    pub fn remove_all<'a, I: IntoIterator<Item = &'a V>>(&mut self, examples: I)
    where
        V: PartialEq + 'a,
    {
        for example in examples {
            self.remove(example);
        }
    }

    /// Drop every value.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free_list.clear();
        self.root = None;
        self.len = 0;
    }

    /// Run a spatial query, appending matching values to `out`.
    ///
    /// Returns the number of values appended. Traversal is breadth-first:
    /// pages are tested with the predicate's page operation and descended on
    /// success, leaves with its leaf operation and emitted on success.
    pub fn query(&self, pred: &SpatialPredicate<T, N>, out: &mut Vec<V>) -> usize
    where
        V: Clone,
    {
        let Some(root) = self.root else {
            return 0;
        };
        let mut count = 0;
        let mut pending = VecDeque::new();
        pending.push_back(root);
        while let Some(id) = pending.pop_front() {
            let node = self.node(id);
            match &node.kind {
                NodeKind::Leaf(value) => {
                    if pred.test_leaf(&node.bound) {
                        out.push(value.clone());
                        count += 1;
                    }
                }
                NodeKind::Page(children) => {
                    if pred.test_page(&node.bound) {
                        pending.extend(children.iter().copied());
                    }
                }
            }
        }
        count
    }

    /// Run a k-nearest query, appending the results to `out` in ascending
    /// distance order. Returns the number of values appended.
    ///
    /// Best-first branch and bound: candidates are drawn smallest-distance
    /// first, and the search stops once the next candidate is further than
    /// the worst of the `k` leaves kept so far. The predicate must be
    /// prunable (its page ranking a lower bound on its leaf ranking); see
    /// [`DistancePredicate::is_prunable`].
    pub fn query_nearest(&self, pred: &DistancePredicate<T, N>, out: &mut Vec<V>) -> usize
    where
        V: Clone,
    {
        debug_assert!(
            pred.is_prunable(),
            "distance predicate cannot drive a pruned tree search"
        );
        let Some(root) = self.root else {
            return 0;
        };
        if pred.count() == 0 {
            return 0;
        }

        let mut candidates: TruncatedMultiset<T, NodeId> = TruncatedMultiset::new();
        let mut kept: TruncatedMultiset<T, NodeId> =
            TruncatedMultiset::with_capacity_limit(pred.count());
        let mut threshold = T::infinity();

        candidates.insert(self.rank(pred, root), root);
        while let Some((dist, id)) = candidates.pop_first() {
            // Candidates pop in ascending order, so the first one past the
            // threshold ends the search.
            if matches!(dist.partial_cmp(&threshold), Some(Ordering::Greater)) {
                break;
            }
            match &self.node(id).kind {
                NodeKind::Leaf(_) => {
                    kept.insert(dist, id);
                    if kept.len() >= pred.count() {
                        threshold = *kept.last_rank().expect("kept is non-empty");
                    }
                }
                NodeKind::Page(children) => {
                    for &child in children {
                        candidates.insert(self.rank(pred, child), child);
                    }
                }
            }
        }

        let count = kept.len();
        for (_, id) in kept.into_iter() {
            match &self.node(id).kind {
                NodeKind::Leaf(value) => out.push(value.clone()),
                NodeKind::Page(_) => unreachable!(),
            }
        }
        count
    }

    /// Walk the whole tree and summarize its shape.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            leaves: 0,
            pages: 0,
            depth: 0,
            page_sizes: alloc::vec![0; S::MAX_CHILDREN + 1],
        };
        let Some(root) = self.root else {
            return stats;
        };
        let mut pending = VecDeque::new();
        pending.push_back((root, 1usize));
        while let Some((id, depth)) = pending.pop_front() {
            stats.depth = stats.depth.max(depth);
            match &self.node(id).kind {
                NodeKind::Leaf(_) => stats.leaves += 1,
                NodeKind::Page(children) => {
                    stats.pages += 1;
                    if children.len() < stats.page_sizes.len() {
                        stats.page_sizes[children.len()] += 1;
                    }
                    for &child in children {
                        pending.push_back((child, depth + 1));
                    }
                }
            }
        }
        stats
    }

    // ---- arena plumbing ----

    fn alloc(&mut self, node: Node<V, T, N>) -> NodeId {
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx] = Some(node);
            NodeId::new(idx)
        } else {
            self.nodes.push(Some(node));
            NodeId::new(self.nodes.len() - 1)
        }
    }

    fn alloc_page(&mut self) -> NodeId {
        self.alloc(Node {
            kind: NodeKind::Page(Vec::new()),
            bound: Aabb::empty(),
            parent: None,
        })
    }

    fn free(&mut self, id: NodeId) {
        self.nodes[id.get()] = None;
        self.free_list.push(id.get());
    }

    fn node(&self, id: NodeId) -> &Node<V, T, N> {
        self.nodes[id.get()].as_ref().expect("stale node id")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<V, T, N> {
        self.nodes[id.get()].as_mut().expect("stale node id")
    }

    fn bound(&self, id: NodeId) -> Aabb<T, N> {
        self.node(id).bound
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    fn is_leaf(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Leaf(_))
    }

    fn page_children(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::Page(children) => children,
            NodeKind::Leaf(_) => unreachable!("expected a page"),
        }
    }

    fn page_len(&self, id: NodeId) -> usize {
        self.page_children(id).len()
    }

    fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        match &mut self.node_mut(id).kind {
            NodeKind::Page(children) => core::mem::take(children),
            NodeKind::Leaf(_) => unreachable!("expected a page"),
        }
    }

    // ---- node operations ----

    /// Append `child` to `page`, adopting it and stretching the page bound.
    fn page_insert(&mut self, page: NodeId, child: NodeId) {
        let child_bound = self.bound(child);
        self.node_mut(child).parent = Some(page);
        let node = self.node_mut(page);
        match &mut node.kind {
            NodeKind::Page(children) => children.push(child),
            NodeKind::Leaf(_) => unreachable!("expected a page"),
        }
        node.bound.stretch(&child_bound);
    }

    /// Remove `child` from `page` by identity.
    ///
    /// With `restretch == false` the page bound is left stale; the caller
    /// must restretch before the tree is observable again.
    fn page_remove(&mut self, page: NodeId, child: NodeId, restretch: bool) {
        match &mut self.node_mut(page).kind {
            NodeKind::Page(children) => {
                if let Some(pos) = children.iter().position(|&c| c == child) {
                    children.remove(pos);
                }
            }
            NodeKind::Leaf(_) => unreachable!("expected a page"),
        }
        if restretch {
            self.restretch(page);
        }
    }

    /// Recompute a page bound as the union of its children's bounds.
    fn restretch(&mut self, page: NodeId) {
        let mut bound = Aabb::empty();
        for &child in self.page_children(page) {
            bound.stretch(&self.bound(child));
        }
        self.node_mut(page).bound = bound;
    }

    // ---- tree algorithm ----

    /// One level of descent: the child costing the least area growth to
    /// enclose `bbox`. Ties prefer the smaller area, then the smaller child
    /// count.
    fn find_best_fit_in_node(&self, bbox: &Aabb<T, N>, page: NodeId) -> NodeId {
        let mut best: Option<NodeId> = None;
        let mut best_increase = T::infinity();
        for &child in self.page_children(page) {
            let increase = increase_to_hold(&self.bound(child), bbox);
            match increase.partial_cmp(&best_increase) {
                Some(Ordering::Less) => {
                    best_increase = increase;
                    best = Some(child);
                }
                Some(Ordering::Equal) => {
                    let Some(current) = best else {
                        best = Some(child);
                        continue;
                    };
                    let smaller_area = matches!(
                        self.bound(child).area().partial_cmp(&self.bound(current).area()),
                        Some(Ordering::Less)
                    );
                    let smaller_count = self.child_count(child) < self.child_count(current);
                    if smaller_area || smaller_count {
                        best = Some(child);
                    }
                }
                _ => {}
            }
        }
        best.expect("page has children")
    }

    fn child_count(&self, id: NodeId) -> usize {
        match &self.node(id).kind {
            NodeKind::Page(children) => children.len(),
            NodeKind::Leaf(_) => 0,
        }
    }

    /// Descend from `start` to the page a leaf with bound `bbox` should
    /// attach to: the first page whose children are leaves (or an empty
    /// page).
    fn descend(&self, start: NodeId, bbox: &Aabb<T, N>) -> NodeId {
        let mut current = start;
        loop {
            match &self.node(current).kind {
                NodeKind::Page(children) => {
                    if children.is_empty() || self.is_leaf(children[0]) {
                        return current;
                    }
                    current = self.find_best_fit_in_node(bbox, current);
                }
                // A mixed page can route the descent onto a leaf; its parent
                // is the attachment page.
                NodeKind::Leaf(_) => return self.parent(current).expect("leaf at the root"),
            }
        }
    }

    /// Attach `node` below `root` (allocating a root page when there is
    /// none), then expand upward. Returns the possibly new root.
    fn attach_and_expand(&mut self, root: Option<NodeId>, node: NodeId) -> NodeId {
        let bbox = self.bound(node);
        let attach = match root {
            None => self.alloc_page(),
            Some(r) => self.descend(r, &bbox),
        };
        self.page_insert(attach, node);
        self.expand_tree(attach)
    }

    /// Walk upward from `start`, restretching ancestors and splitting every
    /// page that exceeds capacity. Returns the possibly new root.
    fn expand_tree(&mut self, start: NodeId) -> NodeId {
        let start_bound = self.bound(start);
        let mut current = start;
        while let Some(parent) = self.parent(current) {
            if self.page_len(current) > S::MAX_CHILDREN {
                let (a, b) = self.split_node(current);
                self.page_remove(parent, current, false);
                self.free(current);
                self.page_insert(parent, a);
                self.page_insert(parent, b);
            }
            current = parent;
            self.node_mut(current).bound.stretch(&start_bound);
        }

        if self.page_len(current) > S::MAX_CHILDREN {
            let (a, b) = self.split_node(current);
            self.free(current);
            let new_root = self.alloc_page();
            self.page_insert(new_root, a);
            self.page_insert(new_root, b);
            current = new_root;
        }
        current
    }

    /// Split an overfull page into two fresh pages covering exactly its
    /// children, each within occupancy bounds. The emptied page is left for
    /// the caller to unlink and free.
    fn split_node(&mut self, page: NodeId) -> (NodeId, NodeId) {
        let parent_bound = self.bound(page);
        let mut remaining = self.take_children(page);

        let bounds: Vec<Aabb<T, N>> = remaining.iter().map(|&c| self.bound(c)).collect();
        let (s1, s2) = S::pick_seeds(&parent_bound, &bounds);
        debug_assert_ne!(s1, s2, "split seeds must be distinct");

        let seed_a = remaining[s1];
        let seed_b = remaining[s2];
        // Remove the higher index first so the lower one stays valid; the
        // stored order of the rest is preserved for pick_next.
        remaining.remove(s1.max(s2));
        remaining.remove(s1.min(s2));

        let a = self.alloc_page();
        let b = self.alloc_page();
        self.page_insert(a, seed_a);
        self.page_insert(b, seed_b);

        // Place children until the remainder is forced wholesale into one
        // side to meet its minimum occupancy.
        while !remaining.is_empty()
            && remaining.len() + self.page_len(a) > S::MIN_CHILDREN
            && remaining.len() + self.page_len(b) > S::MIN_CHILDREN
        {
            let rem_bounds: Vec<Aabb<T, N>> = remaining.iter().map(|&c| self.bound(c)).collect();
            let (idx, side) = S::pick_next(&rem_bounds, &self.bound(a), &self.bound(b));
            let child = remaining.remove(idx);
            match side {
                Side::A => self.page_insert(a, child),
                Side::B => self.page_insert(b, child),
            }
        }

        if !remaining.is_empty() {
            let target = if self.page_len(a) < S::MIN_CHILDREN { a } else { b };
            for child in remaining {
                self.page_insert(target, child);
            }
        }

        debug_assert!(self.page_len(a) >= S::MIN_CHILDREN);
        debug_assert!(self.page_len(b) >= S::MIN_CHILDREN);
        debug_assert!(self.page_len(a) <= S::MAX_CHILDREN);
        debug_assert!(self.page_len(b) <= S::MAX_CHILDREN);
        (a, b)
    }

    /// Walk upward from `start`, dissolving every undersized page into an
    /// orphan list and restretching ancestors; reinsert the orphans at the
    /// end and collapse a single-page root. Returns the possibly new root.
    fn condense_tree(&mut self, start: NodeId) -> NodeId {
        let mut orphans: Vec<NodeId> = Vec::new();
        let mut current = start;
        while let Some(parent) = self.parent(current) {
            if self.page_len(current) < S::MIN_CHILDREN {
                let children = self.take_children(current);
                orphans.extend(children);
                self.page_remove(parent, current, false);
                self.free(current);
            }
            current = parent;
            self.restretch(current);
        }

        let mut root = current;
        for orphan in orphans {
            root = self.attach_and_expand(Some(root), orphan);
        }

        if self.page_len(root) == 1 {
            let child = self.page_children(root)[0];
            if !self.is_leaf(child) {
                self.take_children(root);
                self.free(root);
                self.node_mut(child).parent = None;
                root = child;
            }
        }
        root
    }

    /// The children of `page` that are leaves equal to the example.
    fn matching_leaves_in(&self, page: NodeId, bound: &Aabb<T, N>, example: &V) -> Vec<NodeId>
    where
        V: PartialEq,
    {
        self.page_children(page)
            .iter()
            .copied()
            .filter(|&c| match &self.node(c).kind {
                NodeKind::Leaf(v) => self.node(c).bound == *bound && v == example,
                NodeKind::Page(_) => false,
            })
            .collect()
    }

    /// Breadth-first search for a page holding a leaf equal to the example.
    ///
    /// Only pages whose bound contains the example bound can hold such a
    /// leaf, so the rest are pruned.
    fn find_owner_page(&self, root: NodeId, bound: &Aabb<T, N>, example: &V) -> Option<NodeId>
    where
        V: PartialEq,
    {
        let mut pending = VecDeque::new();
        pending.push_back(root);
        while let Some(id) = pending.pop_front() {
            if self.is_leaf(id) {
                continue;
            }
            if !parcel_bound::contains(&self.bound(id), bound) {
                continue;
            }
            if !self.matching_leaves_in(id, bound, example).is_empty() {
                return Some(id);
            }
            pending.extend(self.page_children(id).iter().copied());
        }
        None
    }

    fn rank(&self, pred: &DistancePredicate<T, N>, id: NodeId) -> T {
        let node = self.node(id);
        match node.kind {
            NodeKind::Leaf(_) => pred.leaf_rank(&node.bound),
            NodeKind::Page(_) => pred.page_rank(&node.bound),
        }
    }
}
