//! Detokenize command implementation.

use clap::Parser;
use std::path::PathBuf;

/// Detokenize command arguments.
#[derive(Parser)]
pub struct DetokenizeCommand {
    /// Checkpoint file (tokens_<n>.json)
    #[arg(short, long)]
    pub checkpoint: PathBuf,

    /// Separator the checkpoint was induced with
    #[arg(short, long, default_value = motif_core::DEFAULT_SEPARATOR)]
    pub separator: String,

    /// Print at most this many expansions
    #[arg(short, long)]
    pub limit: Option<usize>,
}

use anyhow::{Context, Result as AnyhowResult};
use motif_inducer::io::load::load_standalone;
use motif_inducer::{detokenize, ExpansionCache};

pub fn run(cmd: DetokenizeCommand) -> AnyhowResult<()> {
    let checkpoint = load_standalone(&cmd.checkpoint, Some(cmd.separator.as_str()))
        .with_context(|| format!("failed to load {}", cmd.checkpoint.display()))?;

    let vocab = &checkpoint.vocabulary;
    let mut cache = ExpansionCache::new(vocab);
    let expansions = detokenize(vocab, &mut cache)?;

    let limit = cmd.limit.unwrap_or(expansions.len());
    for expansion in expansions.iter().take(limit) {
        println!("{:<6} {}", expansion.len(), expansion.join(" "));
    }

    Ok(())
}
