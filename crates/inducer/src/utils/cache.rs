//! Memoized expansion of composite tokens.
//!
//! Expanding a composite means concatenating the leaf expansions of its left
//! and right children. Results are kept in an arena indexed by composite id,
//! so a save or report pass expands every shared subtree once.

use crate::Result;
use motif_core::{InductionError, SymbolId, Token, Vocabulary};
use std::sync::Arc;

/// Arena cache of leaf expansions, keyed by composite id.
///
/// A cache is bound to one vocabulary lineage: the vocabulary may grow
/// between calls, but existing composites must not change.
#[derive(Debug, Default)]
pub struct ExpansionCache {
    /// Expansion of composite `first_id + i` at index `i`
    arena: Vec<Option<Arc<[SymbolId]>>>,
    first_id: u32,
    hits: u64,
    misses: u64,
}

impl ExpansionCache {
    /// Create an empty cache for `vocab`.
    pub fn new(vocab: &Vocabulary) -> Self {
        Self {
            arena: Vec::with_capacity(vocab.num_composites()),
            first_id: vocab.first_id(),
            hits: 0,
            misses: 0,
        }
    }

    fn slot(&self, id: u32) -> Option<&Arc<[SymbolId]>> {
        let index = id.checked_sub(self.first_id)? as usize;
        self.arena.get(index)?.as_ref()
    }

    fn store(&mut self, id: u32, expansion: Arc<[SymbolId]>) {
        let index = (id - self.first_id) as usize;
        if index >= self.arena.len() {
            self.arena.resize(index + 1, None);
        }
        self.arena[index] = Some(expansion);
    }

    /// Expand a token to its leaf symbol ids, left to right.
    pub fn expand(&mut self, vocab: &Vocabulary, token: Token) -> Result<Arc<[SymbolId]>> {
        if vocab.first_id() != self.first_id {
            self.clear();
            self.first_id = vocab.first_id();
        }

        let id = match token {
            Token::Symbol(sym) => {
                if vocab.symbol(sym).is_none() {
                    return Err(InductionError::UnknownSymbol(format!("#{sym}")));
                }
                return Ok(Arc::from(vec![sym]));
            }
            Token::Composite(id) => id,
        };

        if let Some(cached) = self.slot(id).cloned() {
            self.hits += 1;
            return Ok(cached);
        }
        self.misses += 1;

        // Post-order walk with an explicit stack; `true` marks a node whose
        // children are already expanded.
        let mut stack = vec![(id, false)];
        while let Some((current, ready)) = stack.pop() {
            if self.slot(current).is_some() {
                continue;
            }
            let (left, right) = vocab
                .children(current)
                .ok_or(InductionError::UnknownTokenId(current))?;

            if ready {
                let mut expansion = Vec::new();
                for child in [left, right] {
                    match child {
                        Token::Symbol(sym) => expansion.push(sym),
                        Token::Composite(c) => {
                            let part = self
                                .slot(c)
                                .ok_or(InductionError::UnknownTokenId(c))?;
                            expansion.extend_from_slice(part);
                        }
                    }
                }
                self.store(current, Arc::from(expansion));
            } else {
                stack.push((current, true));
                for child in [right, left] {
                    if let Token::Composite(c) = child {
                        if self.slot(c).is_none() {
                            stack.push((c, false));
                        }
                    }
                }
            }
        }

        self.slot(id)
            .cloned()
            .ok_or(InductionError::UnknownTokenId(id))
    }

    /// Expand a token to its leaf symbol strings.
    pub fn expand_symbols(&mut self, vocab: &Vocabulary, token: Token) -> Result<Vec<String>> {
        self.expand(vocab, token)?
            .iter()
            .map(|&sym| {
                vocab
                    .symbol(sym)
                    .map(str::to_string)
                    .ok_or_else(|| InductionError::UnknownSymbol(format!("#{sym}")))
            })
            .collect()
    }

    /// Number of cached composites.
    pub fn len(&self) -> usize {
        self.arena.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.iter().all(Option::is_none)
    }

    /// Drop every cached expansion. Statistics are kept.
    pub fn clear(&mut self) {
        self.arena.clear();
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        CacheStats {
            entries: self.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate: (lookups > 0).then(|| self.hits as f64 / lookups as f64),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    /// Current number of cached composites
    pub entries: usize,
    /// Composite lookups answered from the arena
    pub hits: u64,
    /// Composite lookups that had to be computed
    pub misses: u64,
    /// Hit rate (None before the first composite lookup)
    pub hit_rate: Option<f64>,
}
