//! Writing checkpoints.

use super::format::{CheckpointEntry, CheckpointFile, TEMP_EXTENSION};
use super::CheckpointStore;
use crate::utils::ExpansionCache;
use crate::Result;
use log::info;
use motif_core::literal::format_list;
use motif_core::{composite_name, InductionError, MergeRecords, Token, Vocabulary};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Build the checkpoint records of every composite in `vocab`.
///
/// Composites without a recorded frequency get `freq = 1`.
pub fn checkpoint_file(
    vocab: &Vocabulary,
    records: &MergeRecords,
    cache: &mut ExpansionCache,
) -> Result<CheckpointFile> {
    let mut entries = Vec::with_capacity(vocab.num_composites());

    for (id, (left, right)) in vocab.composites() {
        let seq = cache.expand_symbols(vocab, Token::Composite(id))?;
        let entry = CheckpointEntry {
            freq: records.get(&id).copied().unwrap_or(1),
            tokens: format_list([vocab.token_name(left), vocab.token_name(right)]),
            seq_len: seq.len(),
            seq: format_list(&seq),
        };
        entries.push((composite_name(id), entry));
    }

    Ok(CheckpointFile { entries })
}

/// Write `file` to `path` through a temporary sibling and a rename.
pub fn write_atomic(path: &Path, file: &CheckpointFile) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".");
    tmp_name.push(TEMP_EXTENSION);
    let tmp = PathBuf::from(tmp_name);

    let handle = File::create(&tmp).map_err(|e| InductionError::io(&tmp, e))?;
    let mut writer = BufWriter::new(handle);
    serde_json::to_writer_pretty(&mut writer, file)?;
    writer.flush().map_err(|e| InductionError::io(&tmp, e))?;

    let handle = writer
        .into_inner()
        .map_err(|e| InductionError::io(&tmp, e.into_error()))?;
    handle.sync_all().map_err(|e| InductionError::io(&tmp, e))?;
    drop(handle);

    fs::rename(&tmp, path).map_err(|e| InductionError::io(path, e))
}

impl CheckpointStore {
    /// Save a checkpoint of `vocab` named after its composite count.
    ///
    /// Returns the path written.
    pub fn save(
        &self,
        vocab: &Vocabulary,
        records: &MergeRecords,
        cache: &mut ExpansionCache,
    ) -> Result<PathBuf> {
        fs::create_dir_all(self.dir()).map_err(|e| InductionError::io(self.dir(), e))?;

        let merge_count = vocab.num_composites();
        let path = self.path_for(merge_count);
        let file = checkpoint_file(vocab, records, cache)?;
        write_atomic(&path, &file)?;

        info!("Saved checkpoint {} ({} tokens)", path.display(), merge_count);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::CheckpointConfig;
    use motif_core::SymbolStream;
    use tempfile::TempDir;

    fn vocab() -> (Vocabulary, MergeRecords) {
        let stream = SymbolStream::new(["a", "b", "it's"], None);
        let mut vocab = Vocabulary::seeded(&stream).unwrap();
        let (a, b, q) = (Token::Symbol(0), Token::Symbol(1), Token::Symbol(2));
        vocab.push_merge((a, b)).unwrap();
        vocab.push_merge((Token::Composite(1), q)).unwrap();

        let mut records = MergeRecords::new();
        records.insert(1, 7);
        (vocab, records)
    }

    #[test]
    fn test_checkpoint_entries() {
        let (vocab, records) = vocab();
        let mut cache = ExpansionCache::new(&vocab);
        let file = checkpoint_file(&vocab, &records, &mut cache).unwrap();

        let names: Vec<&str> = file.entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["t_1", "t_2"]);

        let t1 = file.get("t_1").unwrap();
        assert_eq!(t1.freq, 7);
        assert_eq!(t1.tokens, "['a', 'b']");
        assert_eq!(t1.seq, "['a', 'b']");
        assert_eq!(t1.seq_len, 2);

        let t2 = file.get("t_2").unwrap();
        // untracked frequency
        assert_eq!(t2.freq, 1);
        assert_eq!(t2.tokens, "['t_1', \"it's\"]");
        assert_eq!(t2.seq, "['a', 'b', \"it's\"]");
        assert_eq!(t2.seq_len, 3);
    }

    #[test]
    fn test_save_writes_named_file_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(CheckpointConfig::in_dir(dir.path().join("ckpt"))).unwrap();
        let (vocab, records) = vocab();
        let mut cache = ExpansionCache::new(&vocab);

        let path = store.save(&vocab, &records, &mut cache).unwrap();
        assert_eq!(path, dir.path().join("ckpt").join("tokens_2.json"));

        let files: Vec<String> = fs::read_dir(dir.path().join("ckpt"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files, vec!["tokens_2.json"]);

        let back: CheckpointFile =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn test_write_atomic_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens_0.json");
        fs::write(&path, "garbage").unwrap();

        write_atomic(&path, &CheckpointFile::default()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }
}
