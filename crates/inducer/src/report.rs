//! Inspection reports over an induced vocabulary.

use crate::io::CheckpointFile;
use crate::utils::ExpansionCache;
use crate::Result;
use ahash::AHashSet;
use motif_core::{SymbolId, Vocabulary};
use std::f64::consts::FRAC_PI_4;
use std::sync::Arc;

/// Distinct expansions of every vocabulary entry, leaves included.
///
/// Ordered by descending length; equal lengths keep the order in which the
/// expansion first appears (leaves, then composites by id).
pub fn detokenize(vocab: &Vocabulary, cache: &mut ExpansionCache) -> Result<Vec<Vec<String>>> {
    let mut seen: AHashSet<Arc<[SymbolId]>> = AHashSet::with_capacity(vocab.len());
    let mut expansions = Vec::new();

    for token in vocab.tokens() {
        let expansion = cache.expand(vocab, token)?;
        if seen.insert(Arc::clone(&expansion)) {
            expansions.push(expansion);
        }
    }

    expansions.sort_by(|a, b| b.len().cmp(&a.len()));

    Ok(expansions
        .iter()
        .map(|expansion| {
            expansion
                .iter()
                .map(|&sym| vocab.symbol(sym).unwrap_or_default().to_string())
                .collect()
        })
        .collect())
}

/// A checkpoint entry with its ranking score.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedToken {
    pub name: String,
    pub seq_len: usize,
    pub freq: u64,
    pub magnitude: f64,
}

/// Length of `(x, y)` scaled down by its angular distance from the
/// diagonal.
///
/// Points on the diagonal keep their full length; points on either axis
/// score zero.
pub fn scaled_magnitude(x: f64, y: f64) -> f64 {
    let alpha = if x == 0.0 && y == 0.0 {
        0.0
    } else {
        (y.atan2(x) - FRAC_PI_4).abs()
    };
    let scale = 1.0 - alpha / FRAC_PI_4;
    ((x * scale).powi(2) + (y * scale).powi(2)).sqrt()
}

/// Rank checkpoint entries by [`scaled_magnitude`] of `(seq_len, freq)`,
/// highest first. Ties keep file order.
pub fn rank(file: &CheckpointFile) -> Vec<RankedToken> {
    let mut ranked: Vec<RankedToken> = file
        .entries
        .iter()
        .map(|(name, entry)| RankedToken {
            name: name.clone(),
            seq_len: entry.seq_len,
            freq: entry.freq,
            magnitude: scaled_magnitude(entry.seq_len as f64, entry.freq as f64),
        })
        .collect();

    ranked.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
    ranked
}
