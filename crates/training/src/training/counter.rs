//! Pair counting for vocabulary induction.
//!
//! [`count_pairs`] is the from-scratch reference: a pure function of the
//! stream. [`PairFrequencyIndex`] is what the engine keeps across merges; it
//! records, for every pair, the stream positions where it currently occurs,
//! so counts and first occurrences can be patched locally after each merge.

use ahash::AHashMap;
use motif_core::{Pair, TokenStream};
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Count adjacent pairs of every sequence.
///
/// Pairs never cross a sequence boundary. With `parallel`, sequences are
/// counted independently and the partial counts reduced.
pub fn count_pairs(stream: &TokenStream, parallel: bool) -> AHashMap<Pair, u64> {
    if parallel {
        count_pairs_parallel(stream)
    } else {
        count_pairs_sequential(stream)
    }
}

fn count_pairs_parallel(stream: &TokenStream) -> AHashMap<Pair, u64> {
    stream
        .sequences()
        .par_iter()
        .map(|seq| {
            let mut pair_counts: AHashMap<Pair, u64> = AHashMap::new();

            for window in seq.windows(2) {
                *pair_counts.entry((window[0], window[1])).or_insert(0) += 1;
            }

            pair_counts
        })
        .reduce(AHashMap::new, |mut acc, pair_counts| {
            for (pair, count) in pair_counts {
                *acc.entry(pair).or_insert(0) += count;
            }
            acc
        })
}

fn count_pairs_sequential(stream: &TokenStream) -> AHashMap<Pair, u64> {
    let mut pair_counts: AHashMap<Pair, u64> = AHashMap::new();

    for seq in stream.sequences() {
        for window in seq.windows(2) {
            *pair_counts.entry((window[0], window[1])).or_insert(0) += 1;
        }
    }

    pair_counts
}

/// Offset of every sequence in the flat position space.
///
/// Position `offsets[s] + i` is token `i` of sequence `s`; positions grow in
/// stream scan order.
pub fn sequence_offsets(stream: &TokenStream) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(stream.num_sequences());
    let mut next = 0;
    for seq in stream.sequences() {
        offsets.push(next);
        next += seq.len();
    }
    offsets
}

/// Incrementally maintained pair -> occurrence positions index.
///
/// A pair occurs at position `p` when the token at `p` and the next live
/// token of the same sequence form it. The frequency of a pair is its number
/// of occurrences; its first occurrence is the smallest position.
#[derive(Debug, Clone, Default)]
pub struct PairFrequencyIndex {
    positions: AHashMap<Pair, BTreeSet<usize>>,
}

impl PairFrequencyIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index for a stream laid out by [`sequence_offsets`].
    pub fn from_stream(stream: &TokenStream, parallel: bool) -> Self {
        let offsets = sequence_offsets(stream);
        let sequences = stream.sequences();

        let occurrences = |s: usize| {
            let mut local: AHashMap<Pair, Vec<usize>> = AHashMap::new();
            for (i, window) in sequences[s].windows(2).enumerate() {
                local
                    .entry((window[0], window[1]))
                    .or_default()
                    .push(offsets[s] + i);
            }
            local
        };

        let merged: AHashMap<Pair, Vec<usize>> = if parallel {
            (0..sequences.len())
                .into_par_iter()
                .map(occurrences)
                .reduce(AHashMap::new, |mut acc, local| {
                    for (pair, mut found) in local {
                        acc.entry(pair).or_default().append(&mut found);
                    }
                    acc
                })
        } else {
            let mut acc: AHashMap<Pair, Vec<usize>> = AHashMap::new();
            for s in 0..sequences.len() {
                for (pair, mut found) in occurrences(s) {
                    acc.entry(pair).or_default().append(&mut found);
                }
            }
            acc
        };

        Self {
            positions: merged
                .into_iter()
                .map(|(pair, found)| (pair, found.into_iter().collect()))
                .collect(),
        }
    }

    /// Record an occurrence of `pair` at `position`.
    pub fn add(&mut self, pair: Pair, position: usize) {
        self.positions.entry(pair).or_default().insert(position);
    }

    /// Forget the occurrence of `pair` at `position`, if recorded.
    pub fn remove(&mut self, pair: Pair, position: usize) {
        if let Some(set) = self.positions.get_mut(&pair) {
            set.remove(&position);
            if set.is_empty() {
                self.positions.remove(&pair);
            }
        }
    }

    /// Remove a pair entirely, returning its positions in scan order.
    pub fn take(&mut self, pair: Pair) -> Vec<usize> {
        self.positions
            .remove(&pair)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default()
    }

    /// Current frequency of a pair.
    #[inline]
    pub fn count(&self, pair: Pair) -> u64 {
        self.positions.get(&pair).map_or(0, |set| set.len() as u64)
    }

    /// Position of the first occurrence of a pair.
    #[inline]
    pub fn first(&self, pair: Pair) -> Option<usize> {
        self.positions.get(&pair).and_then(|set| set.first().copied())
    }

    /// Number of distinct pairs.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterate over `(pair, count, first)`.
    pub fn iter(&self) -> impl Iterator<Item = (Pair, u64, usize)> + '_ {
        self.positions.iter().filter_map(|(&pair, set)| {
            set.first().map(|&first| (pair, set.len() as u64, first))
        })
    }

    /// Snapshot of all counts, comparable with [`count_pairs`].
    pub fn counts(&self) -> AHashMap<Pair, u64> {
        self.iter().map(|(pair, count, _)| (pair, count)).collect()
    }
}
