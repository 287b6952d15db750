//! # Version-Control Hosts
//!
//! This module defines the `GitHost` trait, the set of calls the updater
//! needs from a version-control service, and the drivers that implement it.
//!
//! ## Design
//!
//! The updater never talks HTTP itself. It is handed a `&dyn GitHost`, which
//! lets the in-memory host stand in for a real service in tests, in the same
//! way a mock replaces real Git operations elsewhere.
//!
//! - **`github::GitHubHost`**: GitHub and GitHub Enterprise over the REST API.
//! - **`memory::MemoryHost`**: files, branches, commits and pull requests
//!   kept in memory, with injectable failures.
//!
//! Use [`connect`] to build the driver selected on the command line.

pub mod github;
pub mod memory;

use std::fmt;

use crate::config::Signature;
use crate::error::Result;

/// Content of a file at a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub content: Vec<u8>,
    /// Blob SHA of the file, needed by hosts to update or delete it.
    pub sha: String,
}

/// A single-file commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub repo: String,
    pub path: String,
    pub branch: String,
    /// New content, or `None` to delete the file.
    pub content: Option<Vec<u8>>,
    pub message: String,
    /// Author identity; `None` lets the host use the authenticated user.
    pub signature: Option<Signature>,
    /// SHA of the file being replaced, when it existed.
    pub previous_sha: Option<String>,
}

/// Parameters of a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestInput {
    pub title: String,
    pub body: String,
    /// Branch holding the change.
    pub head: String,
    /// Branch the change should be merged into.
    pub base: String,
}

/// A pull request opened at the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub link: String,
}

/// The operations the updater needs from a version-control host.
pub trait GitHost: Send + Sync {
    /// Fetches `path` at `branch`. A missing file is reported as an error
    /// for which [`crate::error::Error::is_not_found`] is true.
    fn get_file(&self, repo: &str, path: &str, branch: &str) -> Result<FileContent>;

    /// Returns the commit SHA at the head of `branch`.
    fn branch_head(&self, repo: &str, branch: &str) -> Result<String>;

    /// Creates branch `name` pointing at commit `sha`.
    fn create_branch(&self, repo: &str, name: &str, sha: &str) -> Result<()>;

    /// Commits a single file change.
    fn commit_file(&self, request: &CommitRequest) -> Result<()>;

    /// Opens a pull request and returns its link.
    fn open_pull_request(&self, repo: &str, input: &PullRequestInput) -> Result<PullRequest>;
}

/// Supported host drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DriverKind {
    /// GitHub or GitHub Enterprise
    #[default]
    Github,
    /// In-memory host, nothing leaves the process
    Memory,
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverKind::Github => write!(f, "github"),
            DriverKind::Memory => write!(f, "memory"),
        }
    }
}

/// Connection settings for a host driver.
#[derive(Debug, Clone, Default)]
pub struct HostOptions {
    pub driver: DriverKind,
    /// API base URL for private installations.
    pub api_endpoint: Option<String>,
    pub auth_token: Option<String>,
    pub username: Option<String>,
    /// Accept invalid TLS certificates.
    pub insecure: bool,
}

/// Builds the host driver described by `options`.
pub fn connect(options: &HostOptions) -> Result<Box<dyn GitHost>> {
    match options.driver {
        DriverKind::Github => Ok(Box::new(github::GitHubHost::new(options)?)),
        DriverKind::Memory => Ok(Box::new(memory::MemoryHost::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_connect_memory() {
        let options = HostOptions {
            driver: DriverKind::Memory,
            ..Default::default()
        };
        let host = connect(&options).unwrap();
        let err = host.get_file("org/repo", "a.yaml", "main").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_connect_github_rejects_bad_endpoint() {
        let options = HostOptions {
            driver: DriverKind::Github,
            api_endpoint: Some("not a url".to_string()),
            ..Default::default()
        };
        match connect(&options) {
            Err(Error::Driver { message }) => assert!(message.contains("not a url")),
            Err(other) => panic!("expected Driver error, got {:?}", other),
            Ok(_) => panic!("expected Driver error"),
        }
    }

    #[test]
    fn test_driver_kind_display() {
        assert_eq!(DriverKind::Github.to_string(), "github");
        assert_eq!(DriverKind::Memory.to_string(), "memory");
    }
}
