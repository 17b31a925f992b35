//! Durable checkpoints of an induction run.
//!
//! A [`CheckpointStore`] owns one checkpoint directory. Saving writes
//! `tokens_<merge_count>.json` atomically; resuming picks the newest file
//! that passes validation and falls back to older ones.

pub mod format;
pub mod load;
pub mod save;

pub use format::{checkpoint_file_name, parse_checkpoint_file_name, CheckpointEntry, CheckpointFile};
pub use load::{Checkpoint, Resume};

use crate::Result;
use motif_core::{InductionError, DEFAULT_FIRST_ID};
use std::path::{Path, PathBuf};

/// Where and how often a session checkpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointConfig {
    /// Directory holding `tokens_<n>.json` files
    pub dir: PathBuf,
    /// Merges between two checkpoints
    pub interval: usize,
    /// Id of the first composite token
    pub first_id: u32,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("checkpoints"),
            interval: 5_000,
            first_id: DEFAULT_FIRST_ID,
        }
    }
}

impl CheckpointConfig {
    /// Checkpoint into `dir` with default settings.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            return Err(InductionError::InvalidConfig(
                "checkpoint interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Checkpoint storage scoped to one directory.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    config: CheckpointConfig,
}

impl CheckpointStore {
    pub fn new(config: CheckpointConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &CheckpointConfig {
        &self.config
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    /// Path of the checkpoint taken after `merge_count` merges.
    pub fn path_for(&self, merge_count: usize) -> PathBuf {
        self.config.dir.join(checkpoint_file_name(merge_count))
    }
}
