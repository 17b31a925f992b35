//! Checkpoint file format.
//!
//! A checkpoint `tokens_<n>.json` is one JSON object keyed by composite
//! name, in id order:
//!
//! ```json
//! { "t_1": { "freq": 2, "tokens": "['a', 'b']", "seq": "['a', 'b']", "seq_len": 2 } }
//! ```
//!
//! `tokens` holds the two direct children and `seq` the full leaf expansion,
//! both as list literals (see [`motif_core::literal`]).

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// File name prefix of checkpoints.
pub const CHECKPOINT_PREFIX: &str = "tokens_";
/// File name extension of checkpoints.
pub const CHECKPOINT_EXTENSION: &str = "json";
/// Extension appended while a checkpoint is being written.
pub const TEMP_EXTENSION: &str = "tmp";

/// File name of the checkpoint taken after `merge_count` merges.
pub fn checkpoint_file_name(merge_count: usize) -> String {
    format!("{CHECKPOINT_PREFIX}{merge_count}.{CHECKPOINT_EXTENSION}")
}

/// Merge count encoded in a checkpoint file name.
///
/// Temporary files and any other name yield `None`.
pub fn parse_checkpoint_file_name(name: &str) -> Option<usize> {
    let digits = name
        .strip_prefix(CHECKPOINT_PREFIX)?
        .strip_suffix(CHECKPOINT_EXTENSION)?
        .strip_suffix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn default_freq() -> u64 {
    1
}

/// One composite token record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    /// Pair frequency when the token was minted
    #[serde(default = "default_freq")]
    pub freq: u64,
    /// Direct children, as a list literal
    pub tokens: String,
    /// Leaf expansion, as a list literal
    pub seq: String,
    /// Number of leaves in `seq`
    pub seq_len: usize,
}

/// Contents of a checkpoint file, entries kept in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointFile {
    pub entries: Vec<(String, CheckpointEntry)>,
}

impl CheckpointFile {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by token name.
    pub fn get(&self, name: &str) -> Option<&CheckpointEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, entry)| entry)
    }
}

// Written as a map so that key order is the entry order.
impl Serialize for CheckpointFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, entry) in &self.entries {
            map.serialize_entry(name, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CheckpointFile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = CheckpointFile;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of token names to checkpoint entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, entry)) = access.next_entry::<String, CheckpointEntry>()? {
                    entries.push((name, entry));
                }
                Ok(CheckpointFile { entries })
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}
