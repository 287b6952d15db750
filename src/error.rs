//! # Error Handling
//!
//! This module defines the centralized error type for `yaml-updater`. It uses
//! `thiserror` to derive an `Error` enum covering every failure mode of the
//! library, from configuration parsing to host calls.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Variants fall into a few groups:
//!   - configuration errors (`ConfigParse`, `Io`), fatal before any
//!     mutation;
//!   - resolution and validation errors (`UnknownRepository`,
//!     `InvalidRepository`), also fatal;
//!   - host errors (`NotFound`, `Host`, `Http`, `Driver`);
//!   - phase-labelled wrappers around host errors (`CreateBranch`,
//!     `UpdateFile`, `OpenPullRequest`, `PullRequestInRepo`);
//!   - document errors (`Patch`) and `Cancelled`.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! The phase-labelled wrappers box their source so that the rendered message
//! reads as a chain, e.g.
//! `failed to create pull request in repo org/repo: failed to create a pull request: 422`.

use thiserror::Error;

/// Main error type for yaml-updater operations
#[derive(Error, Debug)]
pub enum Error {
    /// The repositories configuration file could not be parsed.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A selector referenced a repository key that is not in the configuration.
    #[error("user given repository: {key} does not exist in the current repositories config - failsafe exit")]
    UnknownRepository { key: String },

    /// A repository target is missing a required field.
    #[error("invalid repository {key}: {message}")]
    InvalidRepository { key: String, message: String },

    /// The requested file does not exist on the branch.
    #[error("failed to get file {path} from repo {repo} ref {branch}: not found")]
    NotFound {
        repo: String,
        path: String,
        branch: String,
    },

    /// A host call failed for a reason other than a missing file.
    #[error("{message}")]
    Host { message: String },

    /// The HTTP transport to the host failed, or returned an error status.
    #[error("HTTP error for {url}: {message}")]
    Http {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// The host driver could not be constructed.
    #[error("failed to create a git driver: {message}")]
    Driver { message: String },

    /// Creating the generated branch failed.
    #[error("failed to create branch: {0}")]
    CreateBranch(#[source] Box<Error>),

    /// Committing the mutated file failed.
    #[error("failed to update file: {0}")]
    UpdateFile(#[source] Box<Error>),

    /// Opening the pull request failed at the host.
    #[error("failed to create a pull request: {0}")]
    OpenPullRequest(#[source] Box<Error>),

    /// Opening the pull request failed; the commit and branch remain.
    #[error("failed to create pull request in repo {repo}: {source}")]
    PullRequestInRepo {
        repo: String,
        #[source]
        source: Box<Error>,
    },

    /// A key-path could not be applied to a document.
    #[error("failed to patch key '{path}': {message}")]
    Patch { path: String, message: String },

    /// The run was interrupted before this operation started.
    #[error("operation cancelled")]
    Cancelled,

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

}

impl Error {
    /// Returns true when the error means "the file does not exist", so that
    /// `createMissing` can react to it.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Http { status, .. } => *status == Some(404),
            _ => false,
        }
    }

    /// Returns true when the run was cancelled, even if a phase label
    /// wraps the cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::CreateBranch(source)
            | Error::UpdateFile(source)
            | Error::OpenPullRequest(source)
            | Error::PullRequestInRepo { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Shorthand for a plain host failure.
    pub fn host(message: impl Into<String>) -> Self {
        Error::Host {
            message: message.into(),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
