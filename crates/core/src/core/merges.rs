//! Tokens, pairs and the pair-substitution rewrite.
//!
//! A token is either a raw symbol (interned by the vocabulary) or a composite
//! minted by a merge. The rewrite in this module is the single definition of
//! what "applying a merge" means; both the induction engine and checkpoint
//! replay are checked against it.

use ahash::AHashMap;
use std::fmt;

/// Interned id of a raw symbol.
pub type SymbolId = u32;

/// Prefix of composite token names (`t_1`, `t_2`, ...).
pub const COMPOSITE_PREFIX: &str = "t_";

/// A single position of a token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Token {
    /// A raw symbol of the input alphabet.
    Symbol(SymbolId),
    /// A composite token minted by a merge.
    Composite(u32),
}

impl Token {
    /// Returns the composite id, if this is a composite.
    #[inline]
    pub fn composite_id(self) -> Option<u32> {
        match self {
            Token::Composite(id) => Some(id),
            Token::Symbol(_) => None,
        }
    }

    #[inline]
    pub fn is_composite(self) -> bool {
        matches!(self, Token::Composite(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Symbol(id) => write!(f, "#{id}"),
            Token::Composite(id) => write!(f, "{COMPOSITE_PREFIX}{id}"),
        }
    }
}

/// An ordered pair of adjacent tokens.
pub type Pair = (Token, Token);

/// Pair frequency observed when each composite was minted, by composite id.
pub type MergeRecords = AHashMap<u32, u64>;

/// Name of a composite token as written to checkpoints.
pub fn composite_name(id: u32) -> String {
    format!("{COMPOSITE_PREFIX}{id}")
}

/// Parse a composite name back to its id.
///
/// Only the canonical spelling is accepted: `t_07` and `t_+7` are rejected.
pub fn parse_composite_name(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(COMPOSITE_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}

/// Replace every non-overlapping occurrence of `pair` in `seq` with `merged`.
///
/// Scans left to right; a match consumes both positions, so overlapping
/// candidates resolve greedily left-first (`a a a` with `(a, a)` gives
/// `T a`). Returns the number of replacements.
pub fn merge_in_place(seq: &mut Vec<Token>, pair: Pair, merged: Token) -> usize {
    let len = seq.len();
    let mut read = 0;
    let mut write = 0;
    let mut replaced = 0;

    while read < len {
        if read + 1 < len && seq[read] == pair.0 && seq[read + 1] == pair.1 {
            seq[write] = merged;
            read += 2;
            replaced += 1;
        } else {
            seq[write] = seq[read];
            read += 1;
        }
        write += 1;
    }

    seq.truncate(write);
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Token = Token::Symbol(0);
    const B: Token = Token::Symbol(1);
    const C: Token = Token::Symbol(2);
    const T: Token = Token::Composite(1);

    #[test]
    fn test_merge_replaces_all_occurrences() {
        let mut seq = vec![A, B, A, B, C];
        assert_eq!(merge_in_place(&mut seq, (A, B), T), 2);
        assert_eq!(seq, vec![T, T, C]);
    }

    #[test]
    fn test_merge_overlap_is_left_first() {
        let mut seq = vec![A, A, A];
        assert_eq!(merge_in_place(&mut seq, (A, A), T), 1);
        assert_eq!(seq, vec![T, A]);

        let mut seq = vec![A, A, A, A];
        assert_eq!(merge_in_place(&mut seq, (A, A), T), 2);
        assert_eq!(seq, vec![T, T]);
    }

    #[test]
    fn test_merge_without_match_is_identity() {
        let mut seq = vec![A, C, B];
        assert_eq!(merge_in_place(&mut seq, (A, B), T), 0);
        assert_eq!(seq, vec![A, C, B]);

        let mut empty = Vec::new();
        assert_eq!(merge_in_place(&mut empty, (A, B), T), 0);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_composite_names() {
        assert_eq!(composite_name(12), "t_12");
        assert_eq!(parse_composite_name("t_12"), Some(12));
        assert_eq!(parse_composite_name("t_0"), Some(0));
        assert_eq!(parse_composite_name("t_012"), None);
        assert_eq!(parse_composite_name("t_"), None);
        assert_eq!(parse_composite_name("t_+1"), None);
        assert_eq!(parse_composite_name("v_1"), None);
    }
}
