//! # File Updater
//!
//! The `Updater` performs one file change against a [`GitHost`]:
//!
//! 1. fetch the file from the source branch (or start from an empty
//!    document when it is missing and creation is allowed);
//! 2. apply a [`Mutation`] with the key-path patcher;
//! 3. pick the destination: the source branch itself, or a new branch cut
//!    from the source branch head and named by a [`NameGenerator`];
//! 4. commit the result.
//!
//! Opening the pull request is a separate call, so callers decide whether a
//! change needs review.

use log::{debug, info};
use nanoid::nanoid;

use crate::cancel::CancellationToken;
use crate::config::{Repository, Signature};
use crate::error::{Error, Result};
use crate::host::{CommitRequest, GitHost, PullRequest, PullRequestInput};
use crate::patch;

/// Characters used for generated branch suffixes.
const BRANCH_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Produces names for generated branches.
pub trait NameGenerator: Send + Sync {
    fn prefixed_name(&self, prefix: &str) -> String;
}

/// Appends a random 5-character suffix to the prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNameGenerator;

impl NameGenerator for RandomNameGenerator {
    fn prefixed_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, nanoid!(5, &BRANCH_ALPHABET))
    }
}

/// Change applied to the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Set `key` to `value`
    SetKey { key: String, value: String },
    /// Remove `key`
    RemoveKey { key: String },
    /// Delete the whole file
    RemoveFile,
}

impl Mutation {
    /// The mutation a repository asks for. File removal wins over key removal.
    pub fn for_repository(repo: &Repository, new_value: &str) -> Self {
        if repo.remove_file {
            Mutation::RemoveFile
        } else if repo.remove_key {
            Mutation::RemoveKey {
                key: repo.update_key.clone(),
            }
        } else {
            Mutation::SetKey {
                key: repo.update_key.clone(),
                value: new_value.to_string(),
            }
        }
    }

    fn is_removal(&self) -> bool {
        !matches!(self, Mutation::SetKey { .. })
    }

    /// New file content, or `None` when the file is deleted.
    pub fn apply(&self, content: &[u8]) -> Result<Option<Vec<u8>>> {
        match self {
            Mutation::SetKey { key, value } => patch::set_key(content, key, value).map(Some),
            Mutation::RemoveKey { key } => patch::remove_key(content, key).map(Some),
            Mutation::RemoveFile => Ok(None),
        }
    }
}

/// Where and how to commit a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInput {
    pub repo: String,
    pub filename: String,
    /// Branch to read from, and to commit to when no branch is generated.
    pub branch: String,
    /// Prefix of the generated branch; empty commits to `branch`.
    pub branch_generate_name: String,
    pub create_missing: bool,
    pub commit_message: String,
    pub signature: Option<Signature>,
}

impl CommitInput {
    /// The commit a repository describes, with message and signature
    /// defaults already resolved.
    pub fn for_repository(repo: &Repository) -> Self {
        Self {
            repo: repo.source_repo.clone(),
            filename: repo.file_path.clone(),
            branch: repo.source_branch.clone(),
            branch_generate_name: repo.branch_generate_name.clone(),
            create_missing: repo.create_missing,
            commit_message: repo.commit_message().to_string(),
            signature: repo.commit_signature().cloned(),
        }
    }
}

/// Applies file changes through a host.
pub struct Updater<'a> {
    host: &'a dyn GitHost,
    names: Box<dyn NameGenerator>,
    cancel: CancellationToken,
}

impl<'a> Updater<'a> {
    pub fn new(host: &'a dyn GitHost) -> Self {
        Self {
            host,
            names: Box::new(RandomNameGenerator),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the branch name generator.
    pub fn with_name_generator(mut self, names: impl NameGenerator + 'static) -> Self {
        self.names = Box::new(names);
        self
    }

    /// Stop before the next host call once `cancel` is triggered.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fetch, mutate and commit a file. Returns the branch committed to.
    ///
    /// Fetch errors are returned as-is. Branch and commit failures are
    /// wrapped in [`Error::CreateBranch`] and [`Error::UpdateFile`].
    pub fn apply_update_to_file(&self, input: &CommitInput, mutation: &Mutation) -> Result<String> {
        self.cancel.check()?;
        let existing = match self.host.get_file(&input.repo, &input.filename, &input.branch) {
            Ok(file) => Some(file),
            Err(e) if e.is_not_found() && input.create_missing => None,
            Err(e) => return Err(e),
        };

        let (current, previous_sha) = match existing {
            Some(file) => (file.content, Some(file.sha)),
            None if mutation.is_removal() => {
                info!(
                    "{} does not exist in {}@{}, nothing to remove",
                    input.filename, input.repo, input.branch
                );
                return Ok(input.branch.clone());
            }
            None => {
                debug!(
                    "{} does not exist in {}@{}, creating it",
                    input.filename, input.repo, input.branch
                );
                (Vec::new(), None)
            }
        };

        let content = mutation.apply(&current)?;

        let branch = if input.branch_generate_name.is_empty() {
            input.branch.clone()
        } else {
            self.create_branch(input)?
        };

        self.cancel.check()?;
        let request = CommitRequest {
            repo: input.repo.clone(),
            path: input.filename.clone(),
            branch: branch.clone(),
            content,
            message: input.commit_message.clone(),
            signature: input.signature.clone(),
            previous_sha,
        };
        self.host
            .commit_file(&request)
            .map_err(|e| Error::UpdateFile(Box::new(e)))?;

        Ok(branch)
    }

    fn create_branch(&self, input: &CommitInput) -> Result<String> {
        self.cancel.check()?;
        let sha = self
            .host
            .branch_head(&input.repo, &input.branch)
            .map_err(|e| Error::CreateBranch(Box::new(e)))?;

        let name = self.names.prefixed_name(&input.branch_generate_name);
        self.cancel.check()?;
        self.host
            .create_branch(&input.repo, &name, &sha)
            .map_err(|e| Error::CreateBranch(Box::new(e)))?;
        debug!("Created branch {} at {} in {}", name, sha, input.repo);
        Ok(name)
    }

    /// Open a pull request. Host failures are wrapped in
    /// [`Error::OpenPullRequest`].
    pub fn create_pull_request(&self, repo: &str, input: &PullRequestInput) -> Result<PullRequest> {
        self.cancel.check()?;
        self.host
            .open_pull_request(repo, input)
            .map_err(|e| Error::OpenPullRequest(Box::new(e)))
    }
}
