//! Resumable induction sessions.
//!
//! An [`Inducer`] ties the merge engine to a checkpoint directory: it
//! resumes from the newest valid checkpoint, replays its merges against the
//! raw input, keeps merging with a checkpoint every `interval` merges, and
//! writes a final checkpoint when the run ends for any reason.

use crate::io::{CheckpointConfig, CheckpointStore};
use crate::utils::ExpansionCache;
use crate::Result;
use log::{debug, info};
use motif_core::{
    InductionError, MergeRecords, SymbolStream, TokenStream, Vocabulary, DEFAULT_SEPARATOR,
};
use motif_training::{InductionConfig, MergeEngine, StopReason};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Configuration for an induction session.
#[derive(Debug, Clone)]
pub struct InducerConfig {
    pub induction: InductionConfig,
    pub checkpoint: CheckpointConfig,
    /// Boundary symbol between independent sequences
    pub separator: String,
}

impl Default for InducerConfig {
    fn default() -> Self {
        Self {
            induction: InductionConfig::default(),
            checkpoint: CheckpointConfig::default(),
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

/// Builder for creating an inducer.
#[derive(Debug, Clone, Default)]
pub struct InducerBuilder {
    config: InducerConfig,
}

impl InducerBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total number of merges to reach.
    pub fn max_merges(mut self, max_merges: usize) -> Self {
        self.config.induction.max_merges = max_merges;
        self
    }

    /// Enable or disable parallel pair counting.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.induction.parallel = parallel;
        self
    }

    /// Set the checkpoint directory.
    pub fn checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.checkpoint.dir = dir.into();
        self
    }

    /// Set the number of merges between checkpoints.
    pub fn checkpoint_interval(mut self, interval: usize) -> Self {
        self.config.checkpoint.interval = interval;
        self
    }

    /// Set the id of the first composite token.
    pub fn first_id(mut self, first_id: u32) -> Self {
        self.config.checkpoint.first_id = first_id;
        self
    }

    /// Set the sequence separator.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.config.separator = separator.into();
        self
    }

    /// Build the inducer.
    pub fn build(self) -> Result<Inducer> {
        Inducer::new(self.config)
    }
}

/// Result of [`Inducer::run`].
#[derive(Debug, Clone)]
pub struct Outcome {
    pub vocabulary: Vocabulary,
    /// Stream after the last merge
    pub stream: TokenStream,
    /// Pair frequency of every composite, resumed ones included
    pub records: MergeRecords,
    pub stop: StopReason,
    /// Checkpoint the run resumed from
    pub resumed_from: Option<PathBuf>,
    /// Merges made by this run
    pub new_merges: usize,
    /// Checkpoints written by this run, in order
    pub checkpoints: Vec<PathBuf>,
}

impl Outcome {
    /// Total number of composites.
    pub fn merges_done(&self) -> usize {
        self.vocabulary.num_composites()
    }

    /// The final stream as names, separators included.
    pub fn stream_names(&self) -> Vec<String> {
        self.stream.to_names(&self.vocabulary)
    }
}

/// Checkpointed, resumable induction over one directory.
pub struct Inducer {
    config: InducerConfig,
    store: CheckpointStore,
    cancel: Arc<AtomicBool>,
}

impl Inducer {
    /// Create an inducer with the given configuration.
    pub fn new(config: InducerConfig) -> Result<Self> {
        if config.separator.is_empty() {
            return Err(InductionError::InvalidConfig(
                "separator must not be empty".to_string(),
            ));
        }
        let store = CheckpointStore::new(config.checkpoint.clone())?;

        Ok(Self {
            config,
            store,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Create an inducer builder.
    pub fn builder() -> InducerBuilder {
        InducerBuilder::new()
    }

    #[inline]
    pub fn config(&self) -> &InducerConfig {
        &self.config
    }

    #[inline]
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Flag that stops a running session after its current merge.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Request cancellation of the current run, or of the next one when
    /// none is running. The request is consumed when that run stops.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Build an input stream using the configured separator.
    pub fn stream<I, S>(&self, symbols: I) -> SymbolStream
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        SymbolStream::new(symbols, Some(self.config.separator.as_str()))
    }

    /// Resume from the checkpoint directory and induce up to `max_merges`
    /// composites in total.
    pub fn run(&self, input: &SymbolStream) -> Result<Outcome> {
        if input.separator() != Some(self.config.separator.as_str()) {
            return Err(InductionError::InvalidConfig(format!(
                "input separator {:?} differs from the configured {:?}",
                input.separator(),
                self.config.separator
            )));
        }

        let resume = self.store.resume(input)?;
        let already = resume.merges_done();
        let mut records = resume.records;
        let mut vocabulary = resume.vocabulary;

        let mut tokens = vocabulary.tokenize(input)?;
        let replaced = vocabulary.replay(&mut tokens);
        if already > 0 {
            info!("Replayed {already} merges ({replaced} replacements)");
        }

        let max_merges = self.config.induction.max_merges;
        let interval = self.config.checkpoint.interval;
        let mut remaining = max_merges.saturating_sub(already);

        info!(
            "Inducing from {} merges towards {} over {} tokens in {} sequences",
            already,
            max_merges,
            tokens.len(),
            tokens.num_sequences()
        );

        let mut engine = MergeEngine::new(vocabulary, tokens, &self.config.induction);
        let mut cache = ExpansionCache::new(engine.vocabulary());
        let mut checkpoints = Vec::new();
        let mut last_saved = resume.checkpoint.as_ref().map(|_| already);
        let resumed_from = resume.checkpoint;

        let stop = loop {
            if remaining == 0 {
                break StopReason::MaxMerges;
            }

            let total = already + engine.merges_done();
            let next_boundary = (total / interval + 1) * interval;
            let chunk = remaining.min(next_boundary - total);

            let before = engine.merges_done();
            let stop = engine.run(chunk, Some(&*self.cancel))?;
            remaining -= engine.merges_done() - before;

            let total = already + engine.merges_done();
            if stop != StopReason::MaxMerges {
                break stop;
            }
            if total % interval == 0 && last_saved != Some(total) {
                records.extend(engine.records().iter().map(|(&id, &freq)| (id, freq)));
                checkpoints.push(self.store.save(engine.vocabulary(), &records, &mut cache)?);
                last_saved = Some(total);
            }
        };
        self.cancel.store(false, Ordering::Relaxed);

        let total = already + engine.merges_done();
        records.extend(engine.records().iter().map(|(&id, &freq)| (id, freq)));
        if last_saved != Some(total) {
            checkpoints.push(self.store.save(engine.vocabulary(), &records, &mut cache)?);
        }

        let stats = cache.stats();
        debug!(
            "Expansion cache: {} entries, {} hits, {} misses",
            stats.entries, stats.hits, stats.misses
        );
        info!(
            "Induction stopped after {} merges ({} new): {}",
            total,
            engine.merges_done(),
            stop
        );

        let new_merges = engine.merges_done();
        let (vocabulary, stream, _) = engine.into_parts();

        Ok(Outcome {
            vocabulary,
            stream,
            records,
            stop,
            resumed_from,
            new_merges,
            checkpoints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::load::read_checkpoint;
    use motif_core::Token;
    use std::fs;
    use tempfile::TempDir;

    fn pseudo_random(len: usize, seed: u64) -> Vec<&'static str> {
        const ALPHABET: [&str; 5] = ["a", "b", "c", "d", "|"];
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ALPHABET[((state >> 33) % ALPHABET.len() as u64) as usize]
            })
            .collect()
    }

    fn inducer(dir: &TempDir, max_merges: usize, interval: usize) -> Inducer {
        Inducer::builder()
            .checkpoint_dir(dir.path())
            .checkpoint_interval(interval)
            .max_merges(max_merges)
            .parallel(false)
            .build()
            .unwrap()
    }

    fn saved_counts(inducer: &Inducer) -> Vec<usize> {
        inducer
            .store()
            .list()
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect()
    }

    #[test]
    fn test_fresh_run_writes_final_checkpoint() {
        let dir = TempDir::new().unwrap();
        let inducer = inducer(&dir, 2, 100);
        let input = inducer.stream(["a", "b", "a", "b", "c"]);

        let outcome = inducer.run(&input).unwrap();
        assert_eq!(outcome.stop, StopReason::SingletonPairs);
        assert_eq!(outcome.stream_names(), vec!["t_1", "t_1", "c"]);
        assert!(outcome.resumed_from.is_none());
        assert_eq!(outcome.checkpoints, vec![dir.path().join("tokens_1.json")]);

        let file = read_checkpoint(&outcome.checkpoints[0]).unwrap();
        let t1 = file.get("t_1").unwrap();
        assert_eq!((t1.freq, t1.tokens.as_str(), t1.seq_len), (2, "['a', 'b']", 2));
    }

    #[test]
    fn test_interval_checkpoints() {
        let dir = TempDir::new().unwrap();
        let inducer = inducer(&dir, 7, 3);
        let input = inducer.stream(pseudo_random(2_000, 11));

        let outcome = inducer.run(&input).unwrap();
        assert_eq!(outcome.stop, StopReason::MaxMerges);
        assert_eq!(outcome.merges_done(), 7);
        assert_eq!(saved_counts(&inducer), vec![3, 6, 7]);
    }

    #[test]
    fn test_resume_equals_single_run() {
        let symbols = pseudo_random(1_500, 3);

        let whole_dir = TempDir::new().unwrap();
        let whole = inducer(&whole_dir, 20, 100);
        let expected = whole.run(&whole.stream(&symbols)).unwrap();

        let dir = TempDir::new().unwrap();
        let first = inducer(&dir, 8, 100);
        let partial = first.run(&first.stream(&symbols)).unwrap();
        assert_eq!(partial.merges_done(), 8);

        let second = inducer(&dir, 20, 100);
        let resumed = second.run(&second.stream(&symbols)).unwrap();

        assert_eq!(resumed.resumed_from, Some(dir.path().join("tokens_8.json")));
        assert_eq!(resumed.new_merges, 12);
        assert_eq!(resumed.vocabulary, expected.vocabulary);
        assert_eq!(resumed.stream, expected.stream);
        assert_eq!(resumed.records, expected.records);
        assert_eq!(
            fs::read_to_string(dir.path().join("tokens_20.json")).unwrap(),
            fs::read_to_string(whole_dir.path().join("tokens_20.json")).unwrap()
        );
    }

    #[test]
    fn test_resumed_stream_is_replayed() {
        let dir = TempDir::new().unwrap();
        let symbols = ["a", "b", "a", "b", "c", "|", "a", "b", "c"];

        let first = inducer(&dir, 1, 100);
        first.run(&first.stream(symbols)).unwrap();

        // nothing left to do: the outcome is the replayed checkpoint
        let again = inducer(&dir, 1, 100);
        let outcome = again.run(&again.stream(symbols)).unwrap();

        assert_eq!(outcome.new_merges, 0);
        assert!(outcome.checkpoints.is_empty());
        assert_eq!(
            outcome.stream_names(),
            vec!["t_1", "t_1", "c", "|", "t_1", "c"]
        );
        assert_eq!(outcome.records[&1], 3);
    }

    #[test]
    fn test_corrupt_newest_checkpoint_is_redone() {
        let symbols = pseudo_random(1_500, 5);

        let dir = TempDir::new().unwrap();
        let first = inducer(&dir, 6, 3);
        let expected = first.run(&first.stream(&symbols)).unwrap();
        assert_eq!(saved_counts(&first), vec![3, 6]);

        fs::write(dir.path().join("tokens_6.json"), "{ truncated").unwrap();

        let second = inducer(&dir, 6, 3);
        let outcome = second.run(&second.stream(&symbols)).unwrap();

        assert_eq!(outcome.resumed_from, Some(dir.path().join("tokens_3.json")));
        assert_eq!(outcome.new_merges, 3);
        assert_eq!(outcome.vocabulary, expected.vocabulary);
        assert!(read_checkpoint(&dir.path().join("tokens_6.json")).is_ok());
    }

    #[test]
    fn test_cancelled_run_still_checkpoints() {
        let dir = TempDir::new().unwrap();
        let inducer = inducer(&dir, 10, 100);
        inducer.cancel();

        let outcome = inducer.run(&inducer.stream(["a", "b", "a", "b"])).unwrap();
        assert_eq!(outcome.stop, StopReason::Cancelled);
        assert_eq!(outcome.new_merges, 0);
        assert_eq!(saved_counts(&inducer), vec![0]);
    }

    #[test]
    fn test_cancel_request_is_consumed() {
        let dir = TempDir::new().unwrap();
        let inducer = inducer(&dir, 10, 100);
        let input = inducer.stream(["a", "b", "a", "b", "c", "a", "b"]);
        inducer.cancel();

        assert_eq!(inducer.run(&input).unwrap().stop, StopReason::Cancelled);

        let outcome = inducer.run(&input).unwrap();
        assert_ne!(outcome.stop, StopReason::Cancelled);
        assert!(outcome.new_merges > 0);
    }

    #[test]
    fn test_resume_with_symbols_spelled_like_tokens() {
        let dir = TempDir::new().unwrap();
        let symbols = [
            "a", "b", "|", "a", "b", "|", "a", "b", "|", "t_1", "x", "|", "t_1", "x",
        ];

        let first = inducer(&dir, 2, 1);
        let expected = first.run(&first.stream(symbols)).unwrap();
        assert_eq!(saved_counts(&first), vec![1, 2]);

        let second = inducer(&dir, 2, 1);
        let outcome = second.run(&second.stream(symbols)).unwrap();

        assert_eq!(outcome.resumed_from, Some(dir.path().join("tokens_2.json")));
        assert_eq!(outcome.new_merges, 0);
        assert_eq!(outcome.vocabulary, expected.vocabulary);
        assert_eq!(
            outcome.stream_names(),
            vec!["t_1", "|", "t_1", "|", "t_1", "|", "t_2", "|", "t_2"]
        );
    }

    #[test]
    fn test_expansions_rebuild_the_input() {
        for seed in [1, 7, 23] {
            let dir = TempDir::new().unwrap();
            let inducer = inducer(&dir, 40, 15);
            let input = inducer.stream(pseudo_random(800, seed));
            let outcome = inducer.run(&input).unwrap();

            let vocab = &outcome.vocabulary;
            let mut cache = ExpansionCache::new(vocab);
            let raw: Vec<Vec<String>> = input
                .sequences()
                .map(|seq| seq.iter().map(|s| s.to_string()).collect())
                .collect();
            assert_eq!(outcome.stream.num_sequences(), raw.len());

            for (tokens, expected) in outcome.stream.sequences().iter().zip(&raw) {
                let mut rebuilt = Vec::new();
                for &token in tokens {
                    rebuilt.extend(cache.expand_symbols(vocab, token).unwrap());
                }
                assert_eq!(&rebuilt, expected, "seed {seed}");
            }

            for (id, _) in vocab.composites() {
                let expansion = cache.expand_symbols(vocab, Token::Composite(id)).unwrap();
                assert!(expansion.len() >= 2);
                assert!(!expansion.iter().any(|s| s == "|"));
                assert!(
                    raw.iter()
                        .any(|seq| seq.windows(expansion.len()).any(|w| w == expansion.as_slice())),
                    "t_{id} is not a run of the input"
                );
            }
        }
    }

    #[test]
    fn test_rejects_foreign_separator() {
        let dir = TempDir::new().unwrap();
        let inducer = inducer(&dir, 10, 100);
        let input = SymbolStream::new(["a", "#", "b"], Some("#"));

        assert!(matches!(
            inducer.run(&input),
            Err(InductionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_builder_validates() {
        assert!(Inducer::builder().checkpoint_interval(0).build().is_err());
        assert!(Inducer::builder().separator("").build().is_err());

        let inducer = Inducer::builder().first_id(50).separator("/").build().unwrap();
        assert_eq!(inducer.config().checkpoint.first_id, 50);
        assert_eq!(inducer.config().separator, "/");
    }
}
