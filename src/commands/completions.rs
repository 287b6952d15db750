//! # Completions Command Implementation
//!
//! `yaml-updater completions <SHELL>` prints a completion script generated by
//! `clap_complete`. It covers every flag, including the repository overrides
//! of `update`.
//!
//! ```bash
//! yaml-updater completions bash > ~/.local/share/bash-completion/completions/yaml-updater
//! yaml-updater completions zsh > ~/.zfunc/_yaml-updater
//! ```

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use std::io;

use crate::cli::Cli;

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `args.shell` to stdout.
pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(args.shell, &mut cmd, bin_name, &mut io::stdout());
    Ok(())
}
