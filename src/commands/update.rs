//! # Update Command Implementation
//!
//! This module implements the `update` subcommand, which writes a new value
//! (or removes a key or file) in every configured repository.
//!
//! ## Functionality
//!
//! - **Targets**: read from the repositories configuration file. When the
//!   file does not exist a single target is built from the flags alone.
//!
//! - **Overrides**: every repository field has a flag (and a `GIT_*`
//!   environment variable). Overrides reach only the repositories picked by
//!   `--only`, `--override-repositories` or `--override-all`; `--disabled`
//!   turns the picked repositories off or on.
//!
//! - **Run**: targets are updated one after the other. A failing target is
//!   reported and the run goes on; the command fails with the last error.
//!
//! - **Dry Run**: `--dry-run` prints the resolved targets as YAML without
//!   contacting the git host.

use anyhow::Result;
use clap::builder::BoolishValueParser;
use clap::Args;
use log::{info, warn};
use std::path::{Path, PathBuf};

use yaml_updater::applier::Applier;
use yaml_updater::cancel::CancellationToken;
use yaml_updater::config::{self, RepoConfiguration};
use yaml_updater::host::{self, HostOptions};
use yaml_updater::output::{self, OutputConfig};
use yaml_updater::overrides::{self, Overrides};
use yaml_updater::updater::Updater;

/// Update a key in the configured repositories
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Value written at the update key; an empty value writes an empty string
    #[arg(long, env = "GIT_NEW_VALUE", value_name = "VALUE")]
    pub new_value: Option<String>,

    /// Path to the repositories configuration file
    #[arg(long, env = "GIT_CONFIG_PATH", value_name = "FILE", default_value = ".yaml-updater.yaml")]
    pub config_path: PathBuf,

    /// Name of the change source, quoted in pull request bodies
    #[arg(long, alias = "image-repo", env = "GIT_CHANGE_SOURCE_NAME", value_name = "NAME")]
    pub change_source_name: Option<String>,

    /// Repository holding the file, e.g. my-org/gitops
    #[arg(long, env = "GIT_SOURCE_REPO", value_name = "REPO")]
    pub source_repo: Option<String>,

    /// Branch to read from and to open pull requests against
    #[arg(long, env = "GIT_SOURCE_BRANCH", value_name = "BRANCH")]
    pub source_branch: Option<String>,

    /// Path of the YAML file inside the repository
    #[arg(long, env = "GIT_FILE_PATH", value_name = "PATH")]
    pub file_path: Option<String>,

    /// Key-path to update, e.g. spec.template.spec.containers.0.image
    #[arg(long, env = "GIT_UPDATE_KEY", value_name = "KEY")]
    pub update_key: Option<String>,

    /// Prefix of the generated branch; empty commits to the source branch
    #[arg(long, env = "GIT_BRANCH_GENERATE_NAME", value_name = "PREFIX")]
    pub branch_generate_name: Option<String>,

    /// Remove the update key instead of setting it
    #[arg(long, env = "GIT_REMOVE_KEY", num_args = 0..=1, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub remove_key: Option<bool>,

    /// Delete the file
    #[arg(long, env = "GIT_REMOVE_FILE", num_args = 0..=1, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub remove_file: Option<bool>,

    /// Create the file when it does not exist
    #[arg(long, env = "GIT_CREATE_MISSING", num_args = 0..=1, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub create_missing: Option<bool>,

    /// Commit message
    #[arg(long, env = "GIT_COMMIT_MSG", value_name = "MESSAGE")]
    pub commit_msg: Option<String>,

    /// Commit to the generated branch without opening a pull request
    #[arg(long, env = "GIT_DISABLE_PR_CREATION", num_args = 0..=1, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub disable_pr_creation: Option<bool>,

    /// Name of the commit author
    #[arg(long, env = "GIT_COMMITTER_NAME", value_name = "NAME")]
    pub committer_name: Option<String>,

    /// Email of the commit author
    #[arg(long, env = "GIT_COMMITTER_EMAIL", value_name = "EMAIL")]
    pub committer_email: Option<String>,

    /// Update only these repositories, enabling them even if disabled
    #[arg(long, env = "GIT_ONLY", value_name = "KEYS", value_delimiter = ',')]
    pub only: Option<Vec<String>>,

    /// Apply the overrides to these repositories
    #[arg(long, env = "GIT_OVERRIDE_REPOSITORIES", value_name = "KEYS", value_delimiter = ',')]
    pub override_repositories: Option<Vec<String>>,

    /// Apply the overrides to every repository
    #[arg(long, env = "GIT_OVERRIDE_ALL")]
    pub override_all: bool,

    /// Disable (or with =false, enable) the selected repositories
    #[arg(long, env = "GIT_DISABLED", num_args = 0..=1, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub disabled: Option<bool>,

    /// Print the resolved repositories without contacting the git host
    #[arg(long)]
    pub dry_run: bool,
}

impl UpdateArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            name: self.change_source_name.clone(),
            source_repo: self.source_repo.clone(),
            source_branch: self.source_branch.clone(),
            file_path: self.file_path.clone(),
            update_key: self.update_key.clone(),
            branch_generate_name: self.branch_generate_name.clone(),
            remove_key: self.remove_key,
            remove_file: self.remove_file,
            create_missing: self.create_missing,
            commit_msg: self.commit_msg.clone(),
            disable_pr_creation: self.disable_pr_creation,
            committer_name: self.committer_name.clone(),
            committer_email: self.committer_email.clone(),
            disabled: self.disabled,
            only: self.only.clone(),
            override_repositories: self.override_repositories.clone(),
            override_all: self.override_all,
        }
    }
}

/// Execute the `update` command.
pub fn execute(args: UpdateArgs, host_options: &HostOptions, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let targets = load_targets(&args.config_path, &args.overrides())?;

    if targets.is_empty() {
        info!("No enabled repositories to update");
        return Ok(());
    }

    let new_value = args.new_value.clone().unwrap_or_default();
    if args.new_value.is_none() {
        if let Some(repo) = targets.iter().find(|r| !r.remove_key && !r.remove_file) {
            return Err(anyhow::anyhow!(
                "--new-value is required to update '{}' in repository {}",
                repo.update_key,
                repo.label()
            ));
        }
    }

    if args.dry_run {
        print!("{}", serde_yaml::to_string(&targets)?);
        return Ok(());
    }

    let host = host::connect(host_options)?;
    let cancel = CancellationToken::new();
    if let Err(e) = cancel.install_signal_handler() {
        warn!("Could not install the interrupt handler: {}", e);
    }

    let applier = Applier::new(Updater::new(&*host).with_cancellation(cancel));
    let summary = applier.update_repositories(&targets, &new_value);

    for line in output::format_summary(&out, &summary) {
        println!("{}", line);
    }
    summary.into_result()?;
    Ok(())
}

/// Loads, resolves and validates the repositories to update.
fn load_targets(config_path: &Path, overrides: &Overrides) -> Result<RepoConfiguration> {
    let targets = if config_path.exists() {
        let loaded = config::from_file(config_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to load config from {}: {}",
                config_path.display(),
                e
            )
        })?;
        overrides::resolve(loaded, overrides)?
    } else {
        info!(
            "{} not found, updating the repository given on the command line",
            config_path.display()
        );
        overrides::cli_target(overrides)
    };

    targets.validate()?;
    Ok(targets)
}
