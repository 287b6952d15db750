//! End-to-end tests for CLI exit codes.
//!
//! - Exit code 0: success, including a run where nothing was enabled
//! - Exit code 1: configuration, resolution or update failure
//! - Exit code 2: invalid command-line usage (handled by clap)

mod common;
use common::prelude::*;

#[test]
fn test_exit_code_help() {
    TestFixture::new().command().arg("--help").assert().code(0);
}

#[test]
fn test_exit_code_version() {
    TestFixture::new()
        .command()
        .arg("--version")
        .assert()
        .code(0)
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_exit_code_dry_run() {
    TestFixture::new()
        .with_config(configs::BASE_REPOSITORIES)
        .command()
        .args(["update", "--new-value", "v", "--dry-run"])
        .assert()
        .code(0);
}

#[test]
fn test_exit_code_nothing_enabled() {
    TestFixture::new()
        .with_config(configs::BASE_REPOSITORIES)
        .command()
        .args(["update", "--new-value", "v", "--override-all", "--disabled"])
        .assert()
        .code(0);
}

#[test]
fn test_exit_code_unknown_repository() {
    TestFixture::new()
        .with_config(configs::BASE_REPOSITORIES)
        .command()
        .args(["update", "--new-value", "v", "--override-repositories", "nope"])
        .assert()
        .code(1);
}

#[test]
fn test_exit_code_failed_run() {
    TestFixture::new()
        .with_config(configs::BASE_REPOSITORIES)
        .command()
        .args(["--driver", "memory", "update", "--new-value", "v"])
        .assert()
        .code(1);
}

#[test]
fn test_exit_code_unknown_flag() {
    TestFixture::new()
        .command()
        .args(["update", "--no-such-flag"])
        .assert()
        .code(2);
}

#[test]
fn test_exit_code_missing_subcommand() {
    TestFixture::new().command().assert().code(2);
}
