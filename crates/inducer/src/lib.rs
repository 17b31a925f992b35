//! Motif-inducer - resumable, checkpointed vocabulary induction
//!
//! This crate wraps the merge engine in a session that survives restarts:
//! progress is written to `tokens_<n>.json` checkpoints and a new session
//! picks up from the newest valid one.
//!
//! # Features
//!
//! - Builder pattern for session configuration
//! - Atomic checkpoint writes; corrupt checkpoints are skipped on resume
//! - Strict validation of every loaded merge against the input alphabet
//! - Memoized leaf expansion shared by save and report passes
//! - Detokenization and frequency/length ranking reports
//!
//! # Example
//!
//! ```rust,no_run
//! use motif_inducer::Inducer;
//!
//! let inducer = Inducer::builder()
//!     .checkpoint_dir("checkpoints")
//!     .checkpoint_interval(300)
//!     .max_merges(3_000)
//!     .build()?;
//!
//! let input = inducer.stream(["n_60_4", "n_64_4", "|", "n_60_4", "n_64_4"]);
//! let outcome = inducer.run(&input)?;
//! println!("{} tokens, stopped: {}", outcome.merges_done(), outcome.stop);
//! # Ok::<(), motif_inducer::InductionError>(())
//! ```

// Re-export core types
pub use motif_core::{InductionError, Result};
pub use motif_training::StopReason;

// Session API
pub mod session;
pub use session::{Inducer, InducerBuilder, InducerConfig, Outcome};

// Checkpoint storage
pub mod io;
pub use io::{Checkpoint, CheckpointConfig, CheckpointEntry, CheckpointFile, CheckpointStore, Resume};

// Reports
pub mod report;
pub use report::{detokenize, rank, scaled_magnitude, RankedToken};

// Utilities
pub mod utils;
pub use utils::{CacheStats, ExpansionCache};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
