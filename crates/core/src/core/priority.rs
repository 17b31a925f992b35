//! Priority queue for merge candidates.
//!
//! Candidates are ordered by frequency, then by first occurrence in stream
//! scan order, so the queue alone decides which pair is merged next.

use crate::core::merges::Pair;
use ahash::AHashMap;
use dary_heap::OctonaryHeap;
use std::cmp::{Ordering, Reverse};

/// A merge candidate during induction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCandidate {
    /// The pair of tokens to merge
    pub pair: Pair,
    /// Number of adjacent occurrences of the pair
    pub count: u64,
    /// Stream position of the pair's first occurrence
    pub first: usize,
}

impl MergeCandidate {
    /// Create a new merge candidate.
    pub fn new(pair: Pair, count: u64, first: usize) -> Self {
        Self { pair, count, first }
    }
}

// Higher count wins; on equal counts the earlier first occurrence wins.
impl Ord for MergeCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.count
            .cmp(&other.count)
            .then_with(|| Reverse(self.first).cmp(&Reverse(other.first)))
            .then_with(|| Reverse(self.pair).cmp(&Reverse(other.pair)))
    }
}

impl PartialOrd for MergeCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue for merge selection with lazy deletion.
///
/// Uses an 8-ary heap for better cache locality than a binary heap. Updating
/// a pair pushes a fresh entry; the old one is detected as stale when it
/// reaches the top.
pub struct PairPriorityQueue {
    /// The heap storing merge candidates
    heap: OctonaryHeap<MergeCandidate>,
    /// Live (count, first) per pair; anything else in the heap is stale
    current: AHashMap<Pair, (u64, usize)>,
}

impl PairPriorityQueue {
    /// Create a new priority queue with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: OctonaryHeap::with_capacity(capacity),
            current: AHashMap::with_capacity(capacity),
        }
    }

    /// Create a new empty priority queue.
    pub fn new() -> Self {
        Self {
            heap: OctonaryHeap::new(),
            current: AHashMap::new(),
        }
    }

    /// Push a merge candidate, superseding any earlier entry for its pair.
    pub fn push(&mut self, candidate: MergeCandidate) {
        self.current
            .insert(candidate.pair, (candidate.count, candidate.first));
        self.heap.push(candidate);
    }

    /// Record a new (count, first) for a pair.
    pub fn update(&mut self, pair: Pair, count: u64, first: usize) {
        self.push(MergeCandidate::new(pair, count, first));
    }

    /// Forget a pair; its heap entries become stale.
    pub fn remove(&mut self, pair: Pair) {
        self.current.remove(&pair);
    }

    /// Peek at the best live candidate, discarding stale entries on the way.
    pub fn peek(&mut self) -> Option<&MergeCandidate> {
        while let Some(top) = self.heap.peek() {
            if self.is_live(top) {
                break;
            }
            self.heap.pop();
        }
        self.heap.peek()
    }

    /// Pop the best live candidate.
    pub fn pop(&mut self) -> Option<MergeCandidate> {
        while let Some(candidate) = self.heap.pop() {
            if self.is_live(&candidate) {
                self.current.remove(&candidate.pair);
                return Some(candidate);
            }
        }
        None
    }

    #[inline]
    fn is_live(&self, candidate: &MergeCandidate) -> bool {
        self.current.get(&candidate.pair) == Some(&(candidate.count, candidate.first))
    }

    /// Number of live pairs.
    pub fn live_len(&self) -> usize {
        self.current.len()
    }

    /// Get the number of (potentially stale) entries in the heap.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check if the queue holds no live candidate.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

impl Default for PairPriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}
