//! Rusty Sheet Merger
//!
//! Serves the upload page by default; `merge` works on files from disk.

use clap::Parser;
use rusty_sheet_merger::cli::init_tracing;
use rusty_sheet_merger::cli::Cli;
use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_tracing(&config.log_level);
    cli.dispatch(config)
}
