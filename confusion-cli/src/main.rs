//! confusion - rank transcription errors
//!
//! Reads tab-separated `id<TAB>reference<TAB>hypothesis` records, aligns every
//! hypothesis against its reference and prints the most frequent substitutions,
//! deletions and insertions.
//!
//! # Usage
//!
//! ```bash
//! # Character-level analysis, top 5 per category
//! confusion data/transcripts.tsv
//!
//! # Word-level, top 20, JSON on stdout and TSV files in ./results
//! confusion --mode words --top 20 --format json --output-dir results data/transcripts.tsv
//!
//! # Read from stdin with debug logging
//! cat transcripts.tsv | RUST_LOG=confusion=debug confusion -
//! ```

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

mod cli;

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli::run(&cli, &mut out).and_then(|()| out.flush().map_err(Into::into)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
