//! Motif-training - greedy merge-tree induction
//!
//! This crate provides the induction engine: it repeatedly merges the most
//! frequent adjacent pair of a token stream into a new composite token.
//!
//! # Features
//!
//! - Incremental pair index; each merge only touches the neighbours of the
//!   rewritten occurrences
//! - Parallel from-scratch pair counting with rayon
//! - Deterministic tie-break on the first occurrence in scan order
//! - Cooperative cancellation between steps
//!
//! # Example
//!
//! ```rust
//! use motif_core::{SymbolStream, Vocabulary};
//! use motif_training::{induce, StopReason};
//!
//! let stream = SymbolStream::new(["a", "b", "a", "b", "c"], Some("|"));
//! let vocab = Vocabulary::seeded(&stream)?;
//! let induction = induce(&stream, vocab, 2, 1)?;
//!
//! assert_eq!(induction.delta.len(), 1);
//! assert_eq!(induction.stop, StopReason::SingletonPairs);
//! assert_eq!(induction.stream.to_names(&induction.vocabulary), ["t_1", "t_1", "c"]);
//! # Ok::<(), motif_core::InductionError>(())
//! ```

pub use motif_core::{InductionError, Result};

// Induction engine
pub mod training;
pub use training::{
    count_pairs, induce, induce_with, Induction, InductionConfig, MergeEngine, PairFrequencyIndex,
    Step, StopReason,
};
