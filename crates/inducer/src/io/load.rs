//! Reading checkpoints and resuming from them.

use super::format::{parse_checkpoint_file_name, CheckpointFile};
use super::CheckpointStore;
use crate::utils::ExpansionCache;
use crate::Result;
use log::{info, warn};
use motif_core::literal::parse_list;
use motif_core::{
    parse_composite_name, InductionError, MergeRecords, SymbolStream, Token, Vocabulary,
};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A validated checkpoint.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub path: PathBuf,
    pub merge_count: usize,
    pub vocabulary: Vocabulary,
    pub records: MergeRecords,
}

/// Starting point of a session.
#[derive(Debug, Clone)]
pub struct Resume {
    pub vocabulary: Vocabulary,
    pub records: MergeRecords,
    /// Number of the next merge: loaded merge count + 1
    pub next_merge_count: usize,
    /// Checkpoint resumed from, `None` for a fresh start
    pub checkpoint: Option<PathBuf>,
}

impl Resume {
    /// Merges already present in the vocabulary.
    pub fn merges_done(&self) -> usize {
        self.next_merge_count - 1
    }
}

/// Read and parse a checkpoint file without validating its contents.
pub fn read_checkpoint(path: &Path) -> Result<CheckpointFile> {
    let text = fs::read_to_string(path).map_err(|e| InductionError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| InductionError::corrupt(path, e.to_string()))
}

/// Rebuild a vocabulary from checkpoint records.
///
/// Composites are appended to `vocab` in file order and must carry the ids
/// that follow it. With `closed_alphabet`, every leaf must already be a
/// symbol of `vocab`; otherwise the leaves listed in `seq` are interned.
pub fn decode_checkpoint(
    path: &Path,
    file: &CheckpointFile,
    vocab: &mut Vocabulary,
    closed_alphabet: bool,
) -> Result<MergeRecords> {
    let corrupt = |reason: String| InductionError::corrupt(path, reason);
    let mut records = MergeRecords::new();
    let mut cache = ExpansionCache::new(vocab);

    for (name, entry) in &file.entries {
        let expected = vocab.next_id();
        if parse_composite_name(name) != Some(expected) {
            return Err(corrupt(format!("expected entry t_{expected}, found {name:?}")));
        }

        let children = parse_list(&entry.tokens)
            .map_err(|e| corrupt(format!("{name}: tokens: {e}")))?;
        let [left, right] = children.as_slice() else {
            return Err(corrupt(format!(
                "{name}: expected two children, found {}",
                children.len()
            )));
        };

        let seq = parse_list(&entry.seq).map_err(|e| corrupt(format!("{name}: seq: {e}")))?;
        if !closed_alphabet {
            for symbol in &seq {
                vocab
                    .intern(symbol)
                    .map_err(|e| corrupt(format!("{name}: seq: {e}")))?;
            }
        }

        // A child name may denote a composite or a raw symbol spelled the
        // same way; `seq` decides.
        let lefts = child_readings(vocab, name, left).map_err(corrupt)?;
        let rights = child_readings(vocab, name, right).map_err(corrupt)?;
        let mut pair = None;
        'search: for &l in &lefts {
            for &r in &rights {
                let mut expansion = cache.expand_symbols(vocab, l)?;
                expansion.extend(cache.expand_symbols(vocab, r)?);
                if expansion == seq {
                    pair = Some((l, r));
                    break 'search;
                }
            }
        }
        let pair =
            pair.ok_or_else(|| corrupt(format!("{name}: seq does not match its children")))?;

        let id = vocab
            .push_merge(pair)
            .map_err(|e| corrupt(format!("{name}: {e}")))?;
        if entry.seq_len != seq.len() {
            return Err(corrupt(format!(
                "{name}: seq_len is {} but the expansion has {} symbols",
                entry.seq_len,
                seq.len()
            )));
        }

        records.insert(id, entry.freq);
    }

    Ok(records)
}

fn child_readings(
    vocab: &Vocabulary,
    parent: &str,
    child: &str,
) -> std::result::Result<Vec<Token>, String> {
    if vocab.separator() == Some(child) {
        return Err(format!("{parent}: child is the separator"));
    }
    let readings = vocab.readings(child);
    if !readings.is_empty() {
        return Ok(readings);
    }
    if parse_composite_name(child).is_some() {
        Err(format!("{parent}: child {child} is not an earlier token"))
    } else {
        Err(format!("{parent}: symbol {child:?} is not in the input"))
    }
}

/// Load a checkpoint file on its own, interning leaves as they appear.
///
/// Used to inspect checkpoints when the input stream is not at hand.
pub fn load_standalone(path: &Path, separator: Option<&str>) -> Result<Checkpoint> {
    let file = read_checkpoint(path)?;
    let merge_count = file.len();

    let mut vocabulary = Vocabulary::new(separator);
    if let Some((name, _)) = file.entries.first() {
        let first = parse_composite_name(name)
            .ok_or_else(|| InductionError::corrupt(path, format!("bad entry name {name:?}")))?;
        vocabulary.set_first_id(first)?;
    }
    let records = decode_checkpoint(path, &file, &mut vocabulary, false)?;

    Ok(Checkpoint {
        path: path.to_path_buf(),
        merge_count,
        vocabulary,
        records,
    })
}

impl CheckpointStore {
    /// Checkpoints in the directory as `(merge_count, path)`, ascending.
    ///
    /// A missing directory holds no checkpoints. Temporary files are skipped.
    pub fn list(&self) -> Result<Vec<(usize, PathBuf)>> {
        let entries = match fs::read_dir(self.dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(InductionError::io(self.dir(), e)),
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| InductionError::io(self.dir(), e))?;
            let name = entry.file_name();
            if let Some(count) = name.to_str().and_then(parse_checkpoint_file_name) {
                found.push((count, entry.path()));
            }
        }

        found.sort();
        Ok(found)
    }

    /// Load and validate the checkpoint taken after `merge_count` merges
    /// over `input`.
    pub fn load(&self, input: &SymbolStream, merge_count: usize) -> Result<Checkpoint> {
        let path = self.path_for(merge_count);
        let file = read_checkpoint(&path)?;

        if file.len() != merge_count {
            return Err(InductionError::corrupt(
                &path,
                format!("{} entries in a checkpoint of {merge_count} merges", file.len()),
            ));
        }

        let mut vocabulary = self.seed(input)?;
        let records = decode_checkpoint(&path, &file, &mut vocabulary, true)?;

        Ok(Checkpoint {
            path,
            merge_count,
            vocabulary,
            records,
        })
    }

    fn seed(&self, input: &SymbolStream) -> Result<Vocabulary> {
        let mut vocabulary = Vocabulary::seeded(input)?;
        vocabulary.set_first_id(self.config().first_id)?;
        Ok(vocabulary)
    }

    /// Resume from the newest valid checkpoint, or start fresh.
    ///
    /// Corrupt checkpoints are skipped with a warning.
    pub fn resume(&self, input: &SymbolStream) -> Result<Resume> {
        for (merge_count, path) in self.list()?.into_iter().rev() {
            match self.load(input, merge_count) {
                Ok(checkpoint) => {
                    info!(
                        "Resuming from {} ({} merges)",
                        path.display(),
                        checkpoint.merge_count
                    );
                    return Ok(Resume {
                        vocabulary: checkpoint.vocabulary,
                        records: checkpoint.records,
                        next_merge_count: merge_count + 1,
                        checkpoint: Some(path),
                    });
                }
                Err(e @ InductionError::CheckpointCorrupt { .. }) => {
                    warn!("Skipping checkpoint: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "No usable checkpoint in {}, starting from scratch",
            self.dir().display()
        );
        Ok(Resume {
            vocabulary: self.seed(input)?,
            records: MergeRecords::new(),
            next_merge_count: 1,
            checkpoint: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::format::CheckpointEntry;
    use crate::io::CheckpointConfig;
    use tempfile::TempDir;

    fn input() -> SymbolStream {
        SymbolStream::new(["a", "b", "a", "b", "c", "|", "a", "b", "c"], Some("|"))
    }

    fn entry(freq: u64, tokens: &str, seq: &str, seq_len: usize) -> CheckpointEntry {
        CheckpointEntry {
            freq,
            tokens: tokens.to_string(),
            seq: seq.to_string(),
            seq_len,
        }
    }

    fn write(dir: &Path, name: &str, entries: Vec<(&str, CheckpointEntry)>) {
        let file = CheckpointFile {
            entries: entries
                .into_iter()
                .map(|(n, e)| (n.to_string(), e))
                .collect(),
        };
        fs::write(dir.join(name), serde_json::to_string(&file).unwrap()).unwrap();
    }

    fn valid_two() -> Vec<(&'static str, CheckpointEntry)> {
        vec![
            ("t_1", entry(3, "['a', 'b']", "['a', 'b']", 2)),
            ("t_2", entry(2, "['t_1', 'c']", "['a', 'b', 'c']", 3)),
        ]
    }

    fn store(dir: &TempDir) -> CheckpointStore {
        CheckpointStore::new(CheckpointConfig::in_dir(dir.path())).unwrap()
    }

    #[test]
    fn test_list_sorts_numerically_and_skips_temp_files() {
        let dir = TempDir::new().unwrap();
        for name in ["tokens_10.json", "tokens_9.json", "tokens_11.json.tmp", "notes.txt"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }

        let counts: Vec<usize> = store(&dir).list().unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(counts, vec![9, 10]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let store =
            CheckpointStore::new(CheckpointConfig::in_dir(dir.path().join("absent"))).unwrap();
        assert!(store.list().unwrap().is_empty());

        let resume = store.resume(&input()).unwrap();
        assert_eq!(resume.next_merge_count, 1);
        assert_eq!(resume.vocabulary.num_symbols(), 3);
        assert_eq!(resume.vocabulary.num_composites(), 0);
        assert!(resume.checkpoint.is_none());
    }

    #[test]
    fn test_load_valid_checkpoint() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "tokens_2.json", valid_two());

        let checkpoint = store(&dir).load(&input(), 2).unwrap();
        let vocab = &checkpoint.vocabulary;
        assert_eq!(vocab.next_id(), 3);
        assert_eq!(
            vocab.children(2),
            Some((Token::Composite(1), Token::Symbol(vocab.symbol_id("c").unwrap())))
        );
        assert_eq!(checkpoint.records[&1], 3);
        assert_eq!(checkpoint.records[&2], 2);
    }

    #[test]
    fn test_resume_picks_largest_count() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "tokens_1.json", valid_two()[..1].to_vec());
        write(dir.path(), "tokens_2.json", valid_two());

        let resume = store(&dir).resume(&input()).unwrap();
        assert_eq!(resume.next_merge_count, 3);
        assert_eq!(resume.merges_done(), 2);
        assert_eq!(resume.checkpoint, Some(dir.path().join("tokens_2.json")));
    }

    #[test]
    fn test_resume_falls_back_past_corrupt_checkpoints() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "tokens_1.json", valid_two()[..1].to_vec());
        fs::write(dir.path().join("tokens_2.json"), "{\"t_1\": ").unwrap();

        let resume = store(&dir).resume(&input()).unwrap();
        assert_eq!(resume.next_merge_count, 2);
        assert_eq!(resume.vocabulary.num_composites(), 1);
    }

    #[test]
    fn test_resume_from_scratch_when_all_corrupt() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tokens_3.json"), "not json").unwrap();

        let resume = store(&dir).resume(&input()).unwrap();
        assert_eq!(resume.next_merge_count, 1);
        assert!(resume.checkpoint.is_none());
    }

    #[test]
    fn test_validation_failures() {
        let mut cases: Vec<(&str, Vec<(&str, CheckpointEntry)>)> = vec![
            // entry count disagrees with the file name
            ("tokens_3.json", valid_two()),
            // gap in ids
            (
                "tokens_2.json",
                vec![valid_two()[0].clone(), ("t_3", valid_two()[1].1.clone())],
            ),
            // forward reference
            (
                "tokens_1.json",
                vec![("t_1", entry(1, "['t_1', 'a']", "['a']", 1))],
            ),
            // separator as child
            (
                "tokens_1.json",
                vec![("t_1", entry(1, "['a', '|']", "['a', '|']", 2))],
            ),
            // symbol outside the input alphabet
            (
                "tokens_1.json",
                vec![("t_1", entry(1, "['a', 'z']", "['a', 'z']", 2))],
            ),
            // seq disagrees with children
            (
                "tokens_1.json",
                vec![("t_1", entry(1, "['a', 'b']", "['b', 'a']", 2))],
            ),
            // wrong seq_len
            (
                "tokens_1.json",
                vec![("t_1", entry(1, "['a', 'b']", "['a', 'b']", 5))],
            ),
            // not a list literal
            (
                "tokens_1.json",
                vec![("t_1", entry(1, "__import__('os')", "['a', 'b']", 2))],
            ),
            // three children
            (
                "tokens_1.json",
                vec![("t_1", entry(1, "['a', 'b', 'c']", "['a', 'b', 'c']", 3))],
            ),
        ];

        for (i, (name, entries)) in cases.drain(..).enumerate() {
            let dir = TempDir::new().unwrap();
            write(dir.path(), name, entries);
            let count = parse_checkpoint_file_name(name).unwrap();

            let result = store(&dir).load(&input(), count);
            assert!(
                matches!(result, Err(InductionError::CheckpointCorrupt { .. })),
                "case {i}: {result:?}"
            );
        }
    }

    #[test]
    fn test_child_names_shared_by_symbol_and_composite() {
        let dir = TempDir::new().unwrap();
        let input = SymbolStream::new(["a", "b", "|", "t_1", "x", "|", "a", "b", "x"], Some("|"));
        write(
            dir.path(),
            "tokens_3.json",
            vec![
                ("t_1", entry(2, "['a', 'b']", "['a', 'b']", 2)),
                ("t_2", entry(1, "['t_1', 'x']", "['t_1', 'x']", 2)),
                ("t_3", entry(1, "['t_1', 'x']", "['a', 'b', 'x']", 3)),
            ],
        );

        let checkpoint = store(&dir).load(&input, 3).unwrap();
        let vocab = &checkpoint.vocabulary;
        let raw = Token::Symbol(vocab.symbol_id("t_1").unwrap());
        let x = Token::Symbol(vocab.symbol_id("x").unwrap());
        assert_eq!(vocab.children(2), Some((raw, x)));
        assert_eq!(vocab.children(3), Some((Token::Composite(1), x)));

        let standalone = load_standalone(&dir.path().join("tokens_3.json"), Some("|")).unwrap();
        assert_eq!(standalone.vocabulary.children(2).map(|(l, _)| l.is_composite()), Some(false));
        assert_eq!(standalone.vocabulary.children(3).map(|(l, _)| l.is_composite()), Some(true));
    }

    #[test]
    fn test_load_standalone_interns_leaves() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "tokens_2.json", valid_two());

        let checkpoint = load_standalone(&dir.path().join("tokens_2.json"), Some("|")).unwrap();
        assert_eq!(checkpoint.merge_count, 2);
        assert_eq!(checkpoint.vocabulary.num_symbols(), 3);
        assert_eq!(checkpoint.vocabulary.symbol(2), Some("c"));
    }
}
