//! # YAML Updater CLI
//!
//! Binary entry point for the `yaml-updater` command-line tool.
//!
//! It parses arguments with `clap`, runs the selected command and turns
//! errors into a non-zero exit status. All update logic lives in the
//! `yaml_updater` library.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
