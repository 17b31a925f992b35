//! Vocabulary induction.
//!
//! This module provides the pair counter and the greedy merge engine
//! built on top of it.

pub mod counter;
pub mod trainer;

pub use counter::{count_pairs, sequence_offsets, PairFrequencyIndex};
pub use trainer::{
    induce, induce_with, Induction, InductionConfig, MergeEngine, Step, StopReason,
};
