//! Rank command implementation.

use clap::Parser;
use std::path::PathBuf;

/// Rank command arguments.
#[derive(Parser)]
pub struct RankCommand {
    /// Checkpoint file (tokens_<n>.json)
    #[arg(short, long)]
    pub checkpoint: PathBuf,

    /// Print at most this many tokens
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,
}

use anyhow::{Context, Result as AnyhowResult};
use motif_inducer::io::load::read_checkpoint;
use motif_inducer::rank;

pub fn run(cmd: RankCommand) -> AnyhowResult<()> {
    let file = read_checkpoint(&cmd.checkpoint)
        .with_context(|| format!("failed to read {}", cmd.checkpoint.display()))?;

    println!(
        "{:<10} {:<10} {:<10} {:<20}",
        "Token", "Seq Len", "Freq", "Scaled Magnitude"
    );
    println!("{}", "-".repeat(50));
    for token in rank(&file).into_iter().take(cmd.limit) {
        println!(
            "{:<10} {:<10} {:<10} {:<20.2}",
            token.name, token.seq_len, token.freq, token.magnitude
        );
    }

    Ok(())
}
