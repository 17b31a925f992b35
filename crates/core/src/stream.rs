//! Symbol and token streams.
//!
//! [`SymbolStream`] is the raw input: a flat list of symbol strings with an
//! optional separator between independent sequences. [`TokenStream`] is the
//! working representation: the same content split at separators and mapped
//! to interned [`Token`]s, so that no pair can ever straddle a boundary.

use crate::core::merges::{Pair, Token};
use crate::core::vocab::Vocabulary;
use ahash::AHashSet;
use compact_str::CompactString;

/// Default separator between independent sequences.
pub const DEFAULT_SEPARATOR: &str = "|";

/// Flat, ordered input stream of raw symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolStream {
    symbols: Vec<CompactString>,
    separator: Option<CompactString>,
}

impl SymbolStream {
    /// Create a stream from a flat symbol list.
    ///
    /// Occurrences of `separator` split the stream into independent
    /// sequences.
    pub fn new<I, S>(symbols: I, separator: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            symbols: symbols
                .into_iter()
                .map(|s| CompactString::new(s.as_ref()))
                .collect(),
            separator: separator.map(CompactString::new),
        }
    }

    /// Join several sequences with `separator` between them.
    ///
    /// No separator is placed after the last sequence.
    pub fn from_sequences<I, J, S>(sequences: I, separator: &str) -> Self
    where
        I: IntoIterator<Item = J>,
        J: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sep = CompactString::new(separator);
        let mut symbols = Vec::new();

        for (i, sequence) in sequences.into_iter().enumerate() {
            if i > 0 {
                symbols.push(sep.clone());
            }
            symbols.extend(sequence.into_iter().map(|s| CompactString::new(s.as_ref())));
        }

        Self {
            symbols,
            separator: Some(sep),
        }
    }

    /// The separator, if one is configured.
    #[inline]
    pub fn separator(&self) -> Option<&str> {
        self.separator.as_deref()
    }

    /// All symbols, separators included.
    #[inline]
    pub fn symbols(&self) -> &[CompactString] {
        &self.symbols
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Check whether `symbol` is the separator.
    #[inline]
    pub fn is_separator(&self, symbol: &str) -> bool {
        self.separator.as_deref() == Some(symbol)
    }

    /// Iterate over the independent sequences, in order.
    pub fn sequences(&self) -> impl Iterator<Item = &[CompactString]> + '_ {
        self.symbols.split(move |s| self.is_separator(s))
    }

    /// Distinct non-separator symbols in first-occurrence order.
    pub fn distinct_symbols(&self) -> Vec<&str> {
        let mut seen = AHashSet::new();
        self.symbols
            .iter()
            .map(|s| s.as_str())
            .filter(|s| !self.is_separator(s) && seen.insert(*s))
            .collect()
    }
}

/// Tokenized working stream, one token vector per independent sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStream {
    sequences: Vec<Vec<Token>>,
}

impl TokenStream {
    pub fn new(sequences: Vec<Vec<Token>>) -> Self {
        Self { sequences }
    }

    #[inline]
    pub fn sequences(&self) -> &[Vec<Token>] {
        &self.sequences
    }

    pub fn into_sequences(self) -> Vec<Vec<Token>> {
        self.sequences
    }

    #[inline]
    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    /// Total number of tokens across all sequences.
    pub fn len(&self) -> usize {
        self.sequences.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.iter().all(Vec::is_empty)
    }

    /// Apply one merge to every sequence. Returns the number of replacements.
    pub fn apply_merge(&mut self, pair: Pair, merged: Token) -> usize {
        self.sequences
            .iter_mut()
            .map(|seq| crate::core::merges::merge_in_place(seq, pair, merged))
            .sum()
    }

    /// Render the stream as flat names, separators reinserted between
    /// sequences.
    pub fn to_names(&self, vocab: &Vocabulary) -> Vec<String> {
        let separator = vocab.separator().unwrap_or(DEFAULT_SEPARATOR);
        let mut names = Vec::with_capacity(self.len() + self.sequences.len());

        for (i, seq) in self.sequences.iter().enumerate() {
            if i > 0 {
                names.push(separator.to_string());
            }
            names.extend(seq.iter().map(|&t| vocab.token_name(t).into_owned()));
        }

        names
    }
}
