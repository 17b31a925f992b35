//! Greedy merge loop.
//!
//! The engine keeps the working stream as a linked arena of nodes, one per
//! original stream position. A merge rewrites the left node of every
//! occurrence in place and unlinks the right one, so node indices stay valid
//! positions in scan order for the whole run and the pair index only has to
//! be patched next to each rewritten occurrence.

use super::counter::PairFrequencyIndex;
use ahash::AHashSet;
use log::{debug, info};
use motif_core::{
    InductionError, MergeCandidate, MergeRecords, Pair, PairPriorityQueue, Result, SymbolStream,
    Token, TokenStream, Vocabulary,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Configuration for vocabulary induction.
#[derive(Debug, Clone)]
pub struct InductionConfig {
    /// Upper bound on the total number of composites
    pub max_merges: usize,
    /// Whether to count pairs in parallel when building the index
    pub parallel: bool,
}

impl Default for InductionConfig {
    fn default() -> Self {
        Self {
            max_merges: 500_000,
            parallel: true,
        }
    }
}

/// Why an induction run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The merge budget was exhausted
    MaxMerges,
    /// No adjacent pair is left
    NoPairs,
    /// The most frequent pair occurs only once
    SingletonPairs,
    /// Cancellation was requested between two steps
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            StopReason::MaxMerges => "merge limit reached",
            StopReason::NoPairs => "no pairs left",
            StopReason::SingletonPairs => "every remaining pair occurs once",
            StopReason::Cancelled => "cancelled",
        };
        f.write_str(reason)
    }
}

/// Outcome of a single engine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A composite was minted
    Merged {
        id: u32,
        pair: Pair,
        /// Pair frequency right before the merge
        count: u64,
        /// Number of rewritten occurrences
        replaced: usize,
    },
    /// A stopping condition fired; nothing changed
    Stopped(StopReason),
}

#[derive(Debug, Clone, Copy)]
struct Node {
    token: Token,
    prev: Option<usize>,
    next: Option<usize>,
    live: bool,
}

/// Incremental greedy merge engine.
pub struct MergeEngine {
    /// One node per original stream position
    nodes: Vec<Node>,
    /// First node of every sequence, `None` for empty sequences
    heads: Vec<Option<usize>>,
    index: PairFrequencyIndex,
    queue: PairPriorityQueue,
    vocab: Vocabulary,
    records: MergeRecords,
    merges_done: usize,
}

impl MergeEngine {
    /// Create an engine over a stream tokenized with `vocab`.
    pub fn new(vocab: Vocabulary, stream: TokenStream, config: &InductionConfig) -> Self {
        let index = PairFrequencyIndex::from_stream(&stream, config.parallel);

        let mut queue = PairPriorityQueue::with_capacity(index.len());
        for (pair, count, first) in index.iter() {
            queue.push(MergeCandidate::new(pair, count, first));
        }

        let mut nodes = Vec::with_capacity(stream.len());
        let mut heads = Vec::with_capacity(stream.num_sequences());

        for seq in stream.into_sequences() {
            let offset = nodes.len();
            let len = seq.len();
            heads.push((len > 0).then_some(offset));

            for (i, token) in seq.into_iter().enumerate() {
                nodes.push(Node {
                    token,
                    prev: (i > 0).then(|| offset + i - 1),
                    next: (i + 1 < len).then(|| offset + i + 1),
                    live: true,
                });
            }
        }

        Self {
            nodes,
            heads,
            index,
            queue,
            vocab,
            records: MergeRecords::new(),
            merges_done: 0,
        }
    }

    /// Right node of an occurrence of `pair` starting at `pos`, if the
    /// occurrence is still there.
    #[inline]
    fn occurrence_at(&self, pos: usize, pair: Pair) -> Option<usize> {
        let node = &self.nodes[pos];
        if !node.live || node.token != pair.0 {
            return None;
        }
        let right = node.next?;
        (self.nodes[right].token == pair.1).then_some(right)
    }

    /// Perform one merge, or report why none is possible.
    pub fn step(&mut self) -> Result<Step> {
        let (pair, count) = match self.queue.peek() {
            None => return Ok(Step::Stopped(StopReason::NoPairs)),
            Some(top) if top.count <= 1 => return Ok(Step::Stopped(StopReason::SingletonPairs)),
            Some(top) => (top.pair, top.count),
        };
        self.queue.pop();

        let id = self.vocab.push_merge(pair)?;
        let merged = Token::Composite(id);

        let mut touched: AHashSet<Pair> = AHashSet::new();
        let mut replaced = 0;

        // Ascending positions give the left-first resolution of overlaps.
        for pos in self.index.take(pair) {
            let Some(right) = self.occurrence_at(pos, pair) else {
                continue;
            };
            let left = self.nodes[pos].prev;
            let after = self.nodes[right].next;

            if let Some(l) = left {
                let left_token = self.nodes[l].token;
                self.index.remove((left_token, pair.0), l);
                self.index.add((left_token, merged), l);
                touched.insert((left_token, pair.0));
                touched.insert((left_token, merged));
            }

            if let Some(r) = after {
                let right_token = self.nodes[r].token;
                self.index.remove((pair.1, right_token), right);
                self.index.add((merged, right_token), pos);
                touched.insert((pair.1, right_token));
                touched.insert((merged, right_token));
                self.nodes[r].prev = Some(pos);
            }

            self.nodes[pos].token = merged;
            self.nodes[pos].next = after;
            self.nodes[right] = Node {
                live: false,
                prev: None,
                next: None,
                ..self.nodes[right]
            };
            replaced += 1;
        }

        if replaced == 0 {
            return Err(InductionError::MalformedStream(format!(
                "pair of t_{id} counted {count} times but never found in the stream"
            )));
        }

        for touched_pair in touched {
            match self.index.first(touched_pair) {
                Some(first) => {
                    let count = self.index.count(touched_pair);
                    self.queue.update(touched_pair, count, first);
                }
                None => self.queue.remove(touched_pair),
            }
        }

        self.records.insert(id, count);
        self.merges_done += 1;

        debug!(
            "merge {}: t_{} = ({}, {}) freq {} replaced {}",
            self.merges_done,
            id,
            self.vocab.token_name(pair.0),
            self.vocab.token_name(pair.1),
            count,
            replaced
        );

        Ok(Step::Merged {
            id,
            pair,
            count,
            replaced,
        })
    }

    /// Merge until `limit` merges were made in this call, a stopping
    /// condition fires, or `cancel` is raised.
    ///
    /// The flag is only checked between steps.
    pub fn run(&mut self, limit: usize, cancel: Option<&AtomicBool>) -> Result<StopReason> {
        let mut done = 0;

        let reason = loop {
            if done >= limit {
                break StopReason::MaxMerges;
            }
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                break StopReason::Cancelled;
            }
            match self.step()? {
                Step::Merged { .. } => done += 1,
                Step::Stopped(reason) => break reason,
            }
        };

        debug!(
            "Merged {} pairs ({}): {} live pairs, {} queued entries",
            done,
            reason,
            self.queue.live_len(),
            self.queue.len()
        );
        Ok(reason)
    }

    /// The vocabulary built so far.
    #[inline]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Pair frequency of every merge made by this engine.
    #[inline]
    pub fn records(&self) -> &MergeRecords {
        &self.records
    }

    /// Number of merges made by this engine.
    #[inline]
    pub fn merges_done(&self) -> usize {
        self.merges_done
    }

    /// Current pair frequencies.
    pub fn pair_counts(&self) -> ahash::AHashMap<Pair, u64> {
        self.index.counts()
    }

    /// Rebuild the current stream from the node arena.
    pub fn stream(&self) -> TokenStream {
        let sequences = self
            .heads
            .iter()
            .map(|head| {
                let mut seq = Vec::new();
                let mut cursor = *head;
                while let Some(pos) = cursor {
                    seq.push(self.nodes[pos].token);
                    cursor = self.nodes[pos].next;
                }
                seq
            })
            .collect();

        TokenStream::new(sequences)
    }

    /// Consume the engine, returning vocabulary, stream and merge records.
    pub fn into_parts(self) -> (Vocabulary, TokenStream, MergeRecords) {
        let stream = self.stream();
        (self.vocab, stream, self.records)
    }
}

/// Result of [`induce`].
#[derive(Debug, Clone)]
pub struct Induction {
    /// The full vocabulary, pre-existing entries included
    pub vocabulary: Vocabulary,
    /// Composites minted by this run, in id order
    pub delta: Vec<(u32, Pair)>,
    /// The stream after the last merge
    pub stream: TokenStream,
    /// Pair frequency of every composite minted by this run
    pub records: MergeRecords,
    pub stop: StopReason,
}

/// Run greedy induction over `stream`.
///
/// Composites already present in `vocabulary` are replayed against the raw
/// stream first, so a vocabulary returned by an earlier call continues where
/// it left off. `starting_token_id` must then equal the vocabulary's next id;
/// on a vocabulary without composites it sets the first composite id. The
/// vocabulary must use the stream's separator.
pub fn induce(
    stream: &SymbolStream,
    vocabulary: Vocabulary,
    max_merges: usize,
    starting_token_id: u32,
) -> Result<Induction> {
    let config = InductionConfig {
        max_merges,
        ..Default::default()
    };
    induce_with(stream, vocabulary, starting_token_id, &config, None)
}

/// [`induce`] with an explicit configuration and cancellation flag.
pub fn induce_with(
    stream: &SymbolStream,
    mut vocabulary: Vocabulary,
    starting_token_id: u32,
    config: &InductionConfig,
    cancel: Option<&AtomicBool>,
) -> Result<Induction> {
    if vocabulary.separator() != stream.separator() {
        return Err(InductionError::InvalidConfig(format!(
            "vocabulary separator {:?} differs from the stream's {:?}",
            vocabulary.separator(),
            stream.separator()
        )));
    }
    if vocabulary.num_composites() == 0 {
        vocabulary.set_first_id(starting_token_id)?;
    } else if vocabulary.next_id() != starting_token_id {
        return Err(InductionError::InvalidConfig(format!(
            "starting token id {} does not follow the vocabulary (next id is {})",
            starting_token_id,
            vocabulary.next_id()
        )));
    }

    let mut tokens = vocabulary.tokenize(stream)?;
    if vocabulary.num_composites() > 0 {
        let replaced = vocabulary.replay(&mut tokens);
        info!(
            "Replayed {} merges ({} replacements)",
            vocabulary.num_composites(),
            replaced
        );
    }

    info!(
        "Inducing up to {} merges over {} tokens in {} sequences",
        config.max_merges,
        tokens.len(),
        tokens.num_sequences()
    );

    let mut engine = MergeEngine::new(vocabulary, tokens, config);
    let stop = engine.run(config.max_merges, cancel)?;

    info!("Stopped after {} merges: {}", engine.merges_done(), stop);

    let (vocabulary, stream, records) = engine.into_parts();
    let delta = vocabulary
        .composites()
        .filter(|&(id, _)| id >= starting_token_id)
        .collect();

    Ok(Induction {
        vocabulary,
        delta,
        stream,
        records,
        stop,
    })
}
