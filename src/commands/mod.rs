//! # CLI Command Implementations
//!
//! Each subcommand of `yaml-updater` lives in its own file with:
//! - an `Args` struct derived with `clap`;
//! - an `execute` function that calls into the `yaml_updater` library.

pub mod completions;
pub mod update;
