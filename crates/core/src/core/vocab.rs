//! Append-only vocabulary: raw symbol leaves plus a binary merge forest.
//!
//! Leaves are interned symbol strings. Each composite token has exactly two
//! children, each a leaf or a composite with a strictly smaller id, so the
//! id-to-children graph is acyclic and every expansion terminates.

use crate::core::merges::{composite_name, parse_composite_name, Pair, SymbolId, Token};
use crate::error::{InductionError, Result};
use crate::stream::{SymbolStream, TokenStream};
use ahash::AHashMap;
use compact_str::CompactString;
use std::borrow::Cow;

/// Id assigned to the first composite token unless configured otherwise.
pub const DEFAULT_FIRST_ID: u32 = 1;

/// Forward mapping: symbol string -> symbol id
pub type SymbolIds = AHashMap<CompactString, SymbolId>;

/// Vocabulary of leaves and composite tokens.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// Reverse mapping: symbol id -> symbol string
    symbols: Vec<CompactString>,
    /// Forward mapping: symbol string -> symbol id
    symbol_ids: SymbolIds,
    /// Reserved boundary symbol; never interned
    separator: Option<CompactString>,
    /// Children of composite `first_id + i` at index `i`
    composites: Vec<Pair>,
    /// Id of the first composite token
    first_id: u32,
}

impl Vocabulary {
    /// Create an empty vocabulary.
    pub fn new(separator: Option<&str>) -> Self {
        Self {
            symbols: Vec::new(),
            symbol_ids: SymbolIds::new(),
            separator: separator.map(CompactString::new),
            composites: Vec::new(),
            first_id: DEFAULT_FIRST_ID,
        }
    }

    /// Create a vocabulary seeded with every distinct symbol of `stream` as
    /// its own leaf, in first-occurrence order.
    pub fn seeded(stream: &SymbolStream) -> Result<Self> {
        let distinct = stream.distinct_symbols();
        let mut vocab = Self::new(stream.separator());
        vocab.symbols.reserve(distinct.len());

        for symbol in distinct {
            vocab.intern(symbol)?;
        }

        Ok(vocab)
    }

    /// Set the id of the first composite token.
    ///
    /// Only allowed while no composite has been added.
    pub fn set_first_id(&mut self, first_id: u32) -> Result<()> {
        if !self.composites.is_empty() {
            return Err(InductionError::InvalidConfig(format!(
                "cannot move first composite id to {} after {} merges",
                first_id,
                self.composites.len()
            )));
        }
        self.first_id = first_id;
        Ok(())
    }

    /// Intern a raw symbol, returning its id.
    ///
    /// Interning the separator is an invariant violation.
    pub fn intern(&mut self, symbol: &str) -> Result<SymbolId> {
        if self.separator.as_deref() == Some(symbol) {
            return Err(InductionError::MalformedStream(format!(
                "separator {symbol:?} cannot become a vocabulary symbol"
            )));
        }

        if let Some(&id) = self.symbol_ids.get(symbol) {
            return Ok(id);
        }

        let id = self.symbols.len() as SymbolId;
        let symbol = CompactString::new(symbol);
        self.symbols.push(symbol.clone());
        self.symbol_ids.insert(symbol, id);

        Ok(id)
    }

    /// Append a composite token for `pair`, returning its id.
    ///
    /// Both children must already exist; a composite child must have a
    /// smaller id than the token being minted.
    pub fn push_merge(&mut self, pair: Pair) -> Result<u32> {
        let id = self.next_id();

        for child in [pair.0, pair.1] {
            match child {
                Token::Symbol(sym) if (sym as usize) < self.symbols.len() => {}
                Token::Symbol(sym) => {
                    return Err(InductionError::MalformedStream(format!(
                        "child symbol #{sym} of t_{id} is not in the vocabulary"
                    )));
                }
                Token::Composite(c) if c >= self.first_id && c < id => {}
                Token::Composite(c) => {
                    return Err(InductionError::MalformedStream(format!(
                        "child t_{c} of t_{id} does not precede it"
                    )));
                }
            }
        }

        self.composites.push(pair);
        Ok(id)
    }

    /// Get the children of a composite token.
    #[inline]
    pub fn children(&self, id: u32) -> Option<Pair> {
        let index = id.checked_sub(self.first_id)? as usize;
        self.composites.get(index).copied()
    }

    /// Get the id for a symbol string.
    #[inline]
    pub fn symbol_id(&self, symbol: &str) -> Option<SymbolId> {
        self.symbol_ids.get(symbol).copied()
    }

    /// Get the symbol string for an id.
    #[inline]
    pub fn symbol(&self, id: SymbolId) -> Option<&str> {
        self.symbols.get(id as usize).map(|s| s.as_str())
    }

    /// Human-readable name of a token: the symbol itself, or `t_<id>`.
    pub fn token_name(&self, token: Token) -> Cow<'_, str> {
        match token {
            Token::Symbol(id) => match self.symbol(id) {
                Some(s) => Cow::Borrowed(s),
                None => Cow::Owned(format!("#{id}")),
            },
            Token::Composite(id) => Cow::Owned(composite_name(id)),
        }
    }

    /// Every token a name written by [`Vocabulary::token_name`] can denote.
    ///
    /// A raw symbol spelled like an existing composite yields both readings,
    /// the composite first.
    pub fn readings(&self, name: &str) -> Vec<Token> {
        let mut readings = Vec::with_capacity(2);
        if let Some(id) = parse_composite_name(name) {
            if self.children(id).is_some() {
                readings.push(Token::Composite(id));
            }
        }
        if let Some(sym) = self.symbol_id(name) {
            readings.push(Token::Symbol(sym));
        }
        readings
    }

    /// The separator, if any.
    #[inline]
    pub fn separator(&self) -> Option<&str> {
        self.separator.as_deref()
    }

    /// Id of the first composite token.
    #[inline]
    pub fn first_id(&self) -> u32 {
        self.first_id
    }

    /// Id the next merge will receive.
    #[inline]
    pub fn next_id(&self) -> u32 {
        self.first_id + self.composites.len() as u32
    }

    #[inline]
    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    pub fn num_composites(&self) -> usize {
        self.composites.len()
    }

    /// Total number of entries, leaves included.
    #[inline]
    pub fn len(&self) -> usize {
        self.symbols.len() + self.composites.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over leaves as `(id, symbol)`.
    pub fn leaves(&self) -> impl Iterator<Item = (SymbolId, &str)> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (i as SymbolId, s.as_str()))
    }

    /// Iterate over composites as `(id, children)` in id order.
    pub fn composites(&self) -> impl Iterator<Item = (u32, Pair)> + '_ {
        let first = self.first_id;
        self.composites
            .iter()
            .enumerate()
            .map(move |(i, &pair)| (first + i as u32, pair))
    }

    /// Every token of the vocabulary: leaves first, then composites.
    pub fn tokens(&self) -> impl Iterator<Item = Token> + '_ {
        self.leaves()
            .map(|(id, _)| Token::Symbol(id))
            .chain(self.composites().map(|(id, _)| Token::Composite(id)))
    }

    /// Map a symbol stream to tokens, interning unseen symbols.
    pub fn tokenize(&mut self, stream: &SymbolStream) -> Result<TokenStream> {
        let mut sequences = Vec::new();

        for sequence in stream.sequences() {
            let tokens = sequence
                .iter()
                .map(|s| self.intern(s).map(Token::Symbol))
                .collect::<Result<Vec<_>>>()?;
            sequences.push(tokens);
        }

        Ok(TokenStream::new(sequences))
    }

    /// Replay every composite, in increasing id order, against `stream`.
    ///
    /// Turns a freshly tokenized raw stream into the stream the induction
    /// held right after the last merge of this vocabulary.
    pub fn replay(&self, stream: &mut TokenStream) -> usize {
        self.composites()
            .map(|(id, pair)| stream.apply_merge(pair, Token::Composite(id)))
            .sum()
    }
}

// `symbol_ids` is derived from `symbols`.
impl PartialEq for Vocabulary {
    fn eq(&self, other: &Self) -> bool {
        self.symbols == other.symbols
            && self.separator == other.separator
            && self.composites == other.composites
            && self.first_id == other.first_id
    }
}

impl Eq for Vocabulary {}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(None)
    }
}
