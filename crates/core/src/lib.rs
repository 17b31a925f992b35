//! Motif-core - data structures for merge-tree vocabulary induction
//!
//! This crate provides the types shared by the induction engine and the
//! checkpoint layer, independent of where symbols come from.
//!
//! # Features
//!
//! - Interned symbol storage using `AHashMap` and compact strings
//! - Append-only vocabulary forming an acyclic binary merge forest
//! - Separator-aware token streams; pairs never straddle a boundary
//! - Lazy-deletion priority queue with a pinned tie-break
//! - Strict parser for the list literals found in checkpoint files
//!
//! # Example
//!
//! ```rust
//! use motif_core::{SymbolStream, Token, Vocabulary};
//!
//! let stream = SymbolStream::new(["a", "b", "|", "a", "b"], Some("|"));
//! let mut vocab = Vocabulary::seeded(&stream)?;
//! let mut tokens = vocab.tokenize(&stream)?;
//!
//! let ab = (Token::Symbol(0), Token::Symbol(1));
//! let id = vocab.push_merge(ab)?;
//! assert_eq!(tokens.apply_merge(ab, Token::Composite(id)), 2);
//! assert_eq!(tokens.to_names(&vocab), vec!["t_1", "|", "t_1"]);
//! # Ok::<(), motif_core::InductionError>(())
//! ```

pub mod error;
pub use error::{InductionError, Result};

// Core merge-tree structures
pub mod core;
pub use core::{
    composite_name, merge_in_place, parse_composite_name, MergeRecords, MergeCandidate, Pair,
    PairPriorityQueue, SymbolId, Token, Vocabulary, COMPOSITE_PREFIX, DEFAULT_FIRST_ID,
};

// Raw and tokenized streams
pub mod stream;
pub use stream::{SymbolStream, TokenStream, DEFAULT_SEPARATOR};

// Checkpoint list literals
pub mod literal;
