//! Core merge-tree implementation.
//!
//! This module contains the token model, the vocabulary and the candidate
//! queue, independent of how the induction loop drives them.

pub mod merges;
pub mod priority;
pub mod vocab;

pub use merges::{
    composite_name, merge_in_place, parse_composite_name, MergeRecords, Pair, SymbolId, Token,
    COMPOSITE_PREFIX,
};
pub use priority::{MergeCandidate, PairPriorityQueue};
pub use vocab::{Vocabulary, DEFAULT_FIRST_ID};
