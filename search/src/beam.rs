//! Beam, backup pool, and visited index.
//!
//! All three are owned by a single search run. Ordering everywhere is
//! [`BeamKey`]: descending score, ties by ascending `node_id`.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::node::{BeamKey, SearchNode};

/// The bounded frontier carried between rounds.
///
/// Invariant: `len() <= width()`, nodes sorted by [`BeamKey`].
#[derive(Debug, Clone)]
pub struct Beam<S, A> {
    nodes: Vec<SearchNode<S, A>>,
    width: usize,
}

impl<S, A> Beam<S, A> {
    /// A beam holding only `root`.
    #[must_use]
    pub fn seed(root: SearchNode<S, A>, width: usize) -> Self {
        Self {
            nodes: vec![root],
            width,
        }
    }

    /// Sort `candidates` and keep the best `width`. Returns the beam and the
    /// remaining candidates in ranked order.
    #[must_use]
    pub fn select(
        mut candidates: Vec<SearchNode<S, A>>,
        width: usize,
    ) -> (Self, Vec<SearchNode<S, A>>) {
        candidates.sort_by_key(SearchNode::key);
        let overflow = if candidates.len() > width {
            candidates.split_off(width)
        } else {
            Vec::new()
        };
        (
            Self {
                nodes: candidates,
                width,
            },
            overflow,
        )
    }

    /// A beam refilled from recovered pool entries (already ranked).
    #[must_use]
    pub fn recovered(mut nodes: Vec<SearchNode<S, A>>, width: usize) -> Self {
        nodes.truncate(width);
        Self { nodes, width }
    }

    #[must_use]
    pub fn nodes(&self) -> &[SearchNode<S, A>] {
        &self.nodes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }
}

/// Reservoir of the best discards across the whole run.
///
/// Invariant: `len() <= capacity()`, entries sorted by [`BeamKey`].
#[derive(Debug, Clone)]
pub struct BackupPool<S, A> {
    entries: Vec<SearchNode<S, A>>,
    capacity: usize,
    high_water: usize,
}

impl<S, A> BackupPool<S, A> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            high_water: 0,
        }
    }

    /// Merge ranked discards from one round.
    ///
    /// Only the first `capacity` discards are considered, then the merged
    /// pool is re-sorted and truncated. Returns how many nodes were dropped
    /// (from the discards or from the existing pool).
    pub fn absorb(&mut self, ranked_discards: Vec<SearchNode<S, A>>) -> usize {
        let offered = ranked_discards.len();
        self.entries
            .extend(ranked_discards.into_iter().take(self.capacity));
        self.entries.sort_by_key(SearchNode::key);
        let before = self.entries.len();
        self.entries.truncate(self.capacity);
        let dropped = offered.saturating_sub(self.capacity) + (before - self.entries.len());
        self.high_water = self.high_water.max(self.entries.len());
        dropped
    }

    #[must_use]
    pub fn entries(&self) -> &[SearchNode<S, A>] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Best key currently in the pool.
    #[must_use]
    pub fn best_key(&self) -> Option<BeamKey> {
        self.entries.first().map(SearchNode::key)
    }
}

impl<S: Eq + Hash + Clone, A> BackupPool<S, A> {
    /// Remove and return up to `n` of the best entries for which `eligible`
    /// holds, at most one per state.
    ///
    /// Ineligible entries, and entries repeating a state already taken, met
    /// before `n` nodes are found are removed as stale; their count is
    /// returned alongside the recovered nodes.
    pub fn take_best(
        &mut self,
        n: usize,
        mut eligible: impl FnMut(&SearchNode<S, A>) -> bool,
    ) -> (Vec<SearchNode<S, A>>, usize) {
        let mut taken = Vec::new();
        let mut taken_states = HashSet::new();
        let mut stale = 0;
        let mut kept = Vec::with_capacity(self.entries.len());
        for node in self.entries.drain(..) {
            if taken.len() >= n {
                kept.push(node);
            } else if eligible(&node) && taken_states.insert(node.state.clone()) {
                taken.push(node);
            } else {
                stale += 1;
            }
        }
        self.entries = kept;
        (taken, stale)
    }
}

/// State → shallowest depth at which it was admitted this run.
#[derive(Debug, Clone)]
pub struct VisitedIndex<S> {
    depths: HashMap<S, u32>,
}

impl<S: Eq + Hash + Clone> VisitedIndex<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            depths: HashMap::new(),
        }
    }

    /// Admit `state` at `depth` unless it was already seen at a
    /// shallower-or-equal depth. A shallower rediscovery is admitted and
    /// lowers the recorded depth.
    pub fn admit(&mut self, state: &S, depth: u32) -> bool {
        match self.depths.get_mut(state) {
            Some(seen) if *seen <= depth => false,
            Some(seen) => {
                *seen = depth;
                true
            }
            None => {
                self.depths.insert(state.clone(), depth);
                true
            }
        }
    }

    #[must_use]
    pub fn depth_of(&self, state: &S) -> Option<u32> {
        self.depths.get(state).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.depths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }
}

impl<S: Eq + Hash + Clone> Default for VisitedIndex<S> {
    fn default() -> Self {
        Self::new()
    }
}
