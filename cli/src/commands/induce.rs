//! Induce command implementation.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Input layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// A JSON array of symbols, or an array of symbol arrays (one per sequence)
    Json,
    /// One sequence per line, symbols separated by whitespace
    Lines,
}

/// Induce command arguments.
#[derive(Parser)]
pub struct InduceCommand {
    /// Input file ("-" for stdin)
    #[arg(short, long)]
    pub input: String,

    /// Input layout
    #[arg(short, long, value_enum, default_value_t = InputFormat::Lines)]
    pub format: InputFormat,

    /// Directory holding tokens_<n>.json checkpoints
    #[arg(short, long)]
    pub checkpoint_dir: PathBuf,

    /// Total number of merges to reach
    #[arg(short, long, default_value_t = 500_000)]
    pub max_merges: usize,

    /// Merges between two checkpoints
    #[arg(short = 'e', long, default_value_t = 5_000)]
    pub checkpoint_every: usize,

    /// Separator between independent sequences
    #[arg(short, long, default_value = motif_core::DEFAULT_SEPARATOR)]
    pub separator: String,

    /// Count pairs on a single thread
    #[arg(long, default_value_t = false)]
    pub no_parallel: bool,

    /// Print the final token stream
    #[arg(long, default_value_t = false)]
    pub print_stream: bool,
}

use anyhow::{Context, Result as AnyhowResult};
use log::{info, warn};
use motif_core::SymbolStream;
use motif_inducer::Inducer;
use serde::Deserialize;
use std::io::Read;
use std::sync::atomic::Ordering;
use std::time::Instant;

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonInput {
    Flat(Vec<String>),
    Sequences(Vec<Vec<String>>),
}

fn read_input(path: &str) -> AnyhowResult<String> {
    if path == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))
    }
}

fn parse_input(data: &str, format: InputFormat, separator: &str) -> AnyhowResult<SymbolStream> {
    let stream = match format {
        InputFormat::Json => {
            match serde_json::from_str(data).context("input is not a JSON symbol array")? {
                JsonInput::Flat(symbols) => SymbolStream::new(symbols, Some(separator)),
                JsonInput::Sequences(sequences) => {
                    SymbolStream::from_sequences(sequences, separator)
                }
            }
        }
        InputFormat::Lines => SymbolStream::from_sequences(
            data.lines()
                .map(|line| line.split_whitespace().collect::<Vec<_>>())
                .filter(|symbols| !symbols.is_empty()),
            separator,
        ),
    };
    Ok(stream)
}

pub fn run(cmd: InduceCommand) -> AnyhowResult<()> {
    let inducer = Inducer::builder()
        .checkpoint_dir(&cmd.checkpoint_dir)
        .checkpoint_interval(cmd.checkpoint_every)
        .max_merges(cmd.max_merges)
        .separator(cmd.separator.as_str())
        .parallel(!cmd.no_parallel)
        .build()
        .context("invalid induction settings")?;

    let start = Instant::now();
    let data = read_input(&cmd.input)?;
    let input = parse_input(&data, cmd.format, &cmd.separator)?;
    info!(
        "Read {} symbols in {:.2}s",
        input.len(),
        start.elapsed().as_secs_f64()
    );

    let flag = inducer.cancel_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    }) {
        warn!("Could not install the Ctrl-C handler: {e}");
    }

    let start = Instant::now();
    let outcome = inducer
        .run(&input)
        .with_context(|| format!("induction in {} failed", cmd.checkpoint_dir.display()))?;

    println!(
        "{} tokens ({} new) in {:.2}s, stopped: {}",
        outcome.merges_done(),
        outcome.new_merges,
        start.elapsed().as_secs_f64(),
        outcome.stop
    );
    if let Some(last) = outcome.checkpoints.last() {
        println!("Last checkpoint: {}", last.display());
    }
    if cmd.print_stream {
        println!("{}", outcome.stream_names().join(" "));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(stream: &SymbolStream) -> Vec<&str> {
        stream.symbols().iter().map(|s| s.as_str()).collect()
    }

    #[test]
    fn test_lines_become_sequences() {
        let stream = parse_input("a b\n\n c  d \n", InputFormat::Lines, "|").unwrap();
        assert_eq!(flat(&stream), vec!["a", "b", "|", "c", "d"]);
    }

    #[test]
    fn test_json_layouts() {
        let stream = parse_input(r#"["a", "|", "b"]"#, InputFormat::Json, "|").unwrap();
        assert_eq!(flat(&stream), vec!["a", "|", "b"]);

        let stream = parse_input(r#"[["a", "b"], ["c"]]"#, InputFormat::Json, "|").unwrap();
        assert_eq!(flat(&stream), vec!["a", "b", "|", "c"]);

        assert!(parse_input(r#"{"a": 1}"#, InputFormat::Json, "|").is_err());
    }
}
