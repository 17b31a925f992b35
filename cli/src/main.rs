//! Motif CLI - command-line interface for vocabulary induction.
//!
//! This is the main entry point for the `motif` command-line tool.

mod commands;

use clap::{ArgAction, Parser, Subcommand};
use commands::{DetokenizeCommand, InduceCommand, RankCommand};
use env_logger::Env;
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "motif")]
#[command(about = "Resumable merge-tree vocabulary induction over symbol streams", long_about = None)]
#[command(version)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Less log output (-q warnings, -qq errors only)
    #[arg(short, long, action = ArgAction::Count, global = true, conflicts_with = "verbose")]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Induce a vocabulary, resuming from the checkpoint directory
    Induce(InduceCommand),
    /// Print the expansions of a checkpoint, longest first
    Detokenize(DetokenizeCommand),
    /// Rank the tokens of a checkpoint by length and frequency
    Rank(RankCommand),
}

fn init_logging(verbose: u8, quiet: u8) {
    let level = match (verbose, quiet) {
        (0, 0) => None,
        (_, 1) => Some(LevelFilter::Warn),
        (_, q) if q > 1 => Some(LevelFilter::Error),
        (1, _) => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    if let Some(level) = level {
        builder.filter_level(level);
    }
    let _ = builder.try_init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Induce(cmd) => commands::induce::run(cmd)?,
        Commands::Detokenize(cmd) => commands::detokenize::run(cmd)?,
        Commands::Rank(cmd) => commands::rank::run(cmd)?,
    }

    Ok(())
}
