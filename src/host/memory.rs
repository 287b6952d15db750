//! In-memory version-control host
//!
//! `MemoryHost` keeps files, branch heads, commits and pull requests in
//! memory. Failures can be injected per operation, optionally scoped to one
//! repository, which makes it the host used throughout the test-suite.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};

use super::{CommitRequest, FileContent, GitHost, PullRequest, PullRequestInput};
use crate::error::{Error, Result};

/// Host operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetFile,
    BranchHead,
    CreateBranch,
    CommitFile,
    OpenPullRequest,
}

#[derive(Debug, Clone)]
struct Failure {
    operation: Operation,
    repo: Option<String>,
    message: String,
}

/// A branch created through [`GitHost::create_branch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedBranch {
    pub repo: String,
    pub name: String,
    pub sha: String,
}

/// A pull request opened through [`GitHost::open_pull_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedPullRequest {
    pub repo: String,
    pub input: PullRequestInput,
}

type FileKey = (String, String, String);

#[derive(Debug, Default)]
struct State {
    /// (repo, branch, path) -> content
    files: BTreeMap<FileKey, Vec<u8>>,
    /// (repo, branch) -> head SHA
    heads: BTreeMap<(String, String), String>,
    branches: Vec<CreatedBranch>,
    commits: Vec<CommitRequest>,
    pull_requests: Vec<OpenedPullRequest>,
    failures: Vec<Failure>,
}

/// Version-control host backed by memory
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<State>,
}

impl MemoryHost {
    /// Create an empty host
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock only happens in a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed a file on a branch
    pub fn add_file_contents(&self, repo: &str, path: &str, branch: &str, content: &[u8]) {
        self.state().files.insert(
            (repo.to_string(), branch.to_string(), path.to_string()),
            content.to_vec(),
        );
    }

    /// Seed the head commit of a branch
    pub fn add_branch_head(&self, repo: &str, branch: &str, sha: &str) {
        self.state()
            .heads
            .insert((repo.to_string(), branch.to_string()), sha.to_string());
    }

    /// Make every call of `operation` fail with `message`
    pub fn fail(&self, operation: Operation, message: &str) {
        self.push_failure(operation, None, message);
    }

    /// Make calls of `operation` against `repo` fail with `message`
    pub fn fail_for_repo(&self, operation: Operation, repo: &str, message: &str) {
        self.push_failure(operation, Some(repo.to_string()), message);
    }

    fn push_failure(&self, operation: Operation, repo: Option<String>, message: &str) {
        self.state().failures.push(Failure {
            operation,
            repo,
            message: message.to_string(),
        });
    }

    fn check_failure(&self, operation: Operation, repo: &str) -> Result<()> {
        let state = self.state();
        let failure = state.failures.iter().find(|f| {
            f.operation == operation && f.repo.as_deref().map_or(true, |r| r == repo)
        });
        match failure {
            Some(f) => Err(Error::host(f.message.clone())),
            None => Ok(()),
        }
    }

    /// Current content of a file, seeded or committed
    pub fn file_contents(&self, repo: &str, path: &str, branch: &str) -> Option<Vec<u8>> {
        self.state()
            .files
            .get(&(repo.to_string(), branch.to_string(), path.to_string()))
            .cloned()
    }

    /// Content committed to a file on a branch, if any commit touched it.
    /// A deletion yields `None`.
    pub fn updated_contents(&self, repo: &str, path: &str, branch: &str) -> Option<Vec<u8>> {
        self.state()
            .commits
            .iter()
            .rev()
            .find(|c| c.repo == repo && c.path == path && c.branch == branch)
            .and_then(|c| c.content.clone())
    }

    /// Every commit in the order it was made
    pub fn commits(&self) -> Vec<CommitRequest> {
        self.state().commits.clone()
    }

    /// Every branch created, in order
    pub fn created_branches(&self) -> Vec<CreatedBranch> {
        self.state().branches.clone()
    }

    /// Every pull request opened, in order
    pub fn pull_requests(&self) -> Vec<OpenedPullRequest> {
        self.state().pull_requests.clone()
    }
}

fn fake_sha(parts: &[&[u8]]) -> String {
    let mut hasher = DefaultHasher::new();
    for part in parts {
        part.hash(&mut hasher);
    }
    let first = hasher.finish();
    first.hash(&mut hasher);
    let second = hasher.finish();
    format!("{:016x}{:016x}{:08x}", first, second, (first ^ second) as u32)
}

impl GitHost for MemoryHost {
    fn get_file(&self, repo: &str, path: &str, branch: &str) -> Result<FileContent> {
        self.check_failure(Operation::GetFile, repo)?;
        let content = self
            .file_contents(repo, path, branch)
            .ok_or_else(|| Error::NotFound {
                repo: repo.to_string(),
                path: path.to_string(),
                branch: branch.to_string(),
            })?;
        let sha = fake_sha(&[path.as_bytes(), content.as_slice()]);
        Ok(FileContent { content, sha })
    }

    fn branch_head(&self, repo: &str, branch: &str) -> Result<String> {
        self.check_failure(Operation::BranchHead, repo)?;
        self.state()
            .heads
            .get(&(repo.to_string(), branch.to_string()))
            .cloned()
            .ok_or_else(|| Error::host(format!("branch {} not found in repo {}", branch, repo)))
    }

    fn create_branch(&self, repo: &str, name: &str, sha: &str) -> Result<()> {
        self.check_failure(Operation::CreateBranch, repo)?;
        let mut state = self.state();
        let key = (repo.to_string(), name.to_string());
        if state.heads.contains_key(&key) {
            return Err(Error::host(format!(
                "branch {} already exists in repo {}",
                name, repo
            )));
        }
        // The new branch starts with the files of the branch it was cut from.
        let origin = state
            .heads
            .iter()
            .find(|((r, _), head)| r == repo && head.as_str() == sha)
            .map(|((_, branch), _)| branch.clone());
        if let Some(origin) = origin {
            let copied: Vec<(FileKey, Vec<u8>)> = state
                .files
                .iter()
                .filter(|((r, b, _), _)| r == repo && *b == origin)
                .map(|((r, _, p), content)| ((r.clone(), name.to_string(), p.clone()), content.clone()))
                .collect();
            state.files.extend(copied);
        }

        state.heads.insert(key, sha.to_string());
        state.branches.push(CreatedBranch {
            repo: repo.to_string(),
            name: name.to_string(),
            sha: sha.to_string(),
        });
        Ok(())
    }

    fn commit_file(&self, request: &CommitRequest) -> Result<()> {
        self.check_failure(Operation::CommitFile, &request.repo)?;
        let mut state = self.state();
        let key = (
            request.repo.clone(),
            request.branch.clone(),
            request.path.clone(),
        );
        match &request.content {
            Some(content) => {
                state.files.insert(key, content.clone());
            }
            None => {
                if state.files.remove(&key).is_none() {
                    return Err(Error::NotFound {
                        repo: request.repo.clone(),
                        path: request.path.clone(),
                        branch: request.branch.clone(),
                    });
                }
            }
        }
        let head = fake_sha(&[
            request.repo.as_bytes(),
            request.branch.as_bytes(),
            request.message.as_bytes(),
            &state.commits.len().to_le_bytes()[..],
        ]);
        state
            .heads
            .insert((request.repo.clone(), request.branch.clone()), head);
        state.commits.push(request.clone());
        Ok(())
    }

    fn open_pull_request(&self, repo: &str, input: &PullRequestInput) -> Result<PullRequest> {
        self.check_failure(Operation::OpenPullRequest, repo)?;
        let mut state = self.state();
        state.pull_requests.push(OpenedPullRequest {
            repo: repo.to_string(),
            input: input.clone(),
        });
        let number = state.pull_requests.len() as u64;
        Ok(PullRequest {
            number,
            link: format!("memory://{}/pull/{}", repo, number),
        })
    }
}
