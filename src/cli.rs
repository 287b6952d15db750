//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use yaml_updater::host::{DriverKind, HostOptions};

use crate::commands;

/// YAML Updater - Update YAML files in a Git service, with optional automated Pull Requests
#[derive(Parser, Debug)]
#[command(name = "yaml-updater")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Git host driver
    #[arg(long, global = true, env = "GIT_DRIVER", value_enum, default_value_t = DriverKind::Github)]
    driver: DriverKind,

    /// API endpoint of a GitHub Enterprise installation
    #[arg(long, global = true, env = "GIT_API_ENDPOINT", value_name = "URL")]
    api_endpoint: Option<String>,

    /// Token used to authenticate against the git host
    #[arg(long, global = true, env = "GIT_AUTH_TOKEN", value_name = "TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Username for basic authentication
    #[arg(long, global = true, env = "GIT_USERNAME")]
    username: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long, global = true, env = "GIT_INSECURE")]
    insecure: bool,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "GIT_LOG_LEVEL", value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Update or remove a key in the configured repositories
    Update(commands::update::UpdateArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    fn host_options(&self) -> HostOptions {
        HostOptions {
            driver: self.driver,
            api_endpoint: self.api_endpoint.clone(),
            auth_token: self.auth_token.clone(),
            username: self.username.clone(),
            insecure: self.insecure,
        }
    }

    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // RUST_LOG, when set, takes precedence over --log-level.
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.log_level.as_str()),
        )
        .format_timestamp(None)
        .try_init();

        let host_options = self.host_options();
        match self.command {
            Commands::Update(args) => commands::update::execute(args, &host_options, &self.color),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}
