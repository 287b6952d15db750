//! # Applying Updates to Repositories
//!
//! The `Applier` drives the update of one target or of a whole resolved
//! configuration.
//!
//! For a single target, [`Applier::update_repository`] builds the mutation,
//! commits it through the [`Updater`] and, when the change landed on a
//! generated branch, opens a pull request back into the source branch.
//!
//! For a configuration, [`Applier::update_repositories`] visits every target
//! in key order. A failing target is logged and the run moves on to the next
//! one; the returned [`RunSummary`] records what happened to each target.

use log::{error, info, warn};

use crate::config::{RepoConfiguration, Repository};
use crate::error::{Error, Result};
use crate::host::{PullRequest, PullRequestInput};
use crate::updater::{CommitInput, Mutation, Updater};

/// Title of every pull request opened by the applier.
pub const PULL_REQUEST_TITLE: &str = "Automated image update";

/// Result of updating a single target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Branch the change was committed to
    pub branch: String,
    /// Pull request opened for the change, if any
    pub pull_request: Option<PullRequest>,
}

/// What happened to one target during a run.
#[derive(Debug)]
pub struct TargetOutcome {
    pub key: String,
    pub source_repo: String,
    pub file_path: String,
    pub result: Result<UpdateOutcome>,
}

/// Per-target results of a run, in the order targets were visited.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<TargetOutcome>,
}

impl RunSummary {
    /// Targets that were updated.
    pub fn succeeded(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_ok())
    }

    /// Targets that failed.
    pub fn failed(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// True when the run stopped because it was cancelled.
    pub fn was_cancelled(&self) -> bool {
        self.outcomes
            .last()
            .map_or(false, |o| matches!(&o.result, Err(e) if e.is_cancelled()))
    }

    /// `Ok(())` when every target succeeded, otherwise the last failure.
    pub fn into_result(self) -> Result<()> {
        match self.outcomes.into_iter().rev().find_map(|o| o.result.err()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Applies updates to targets through an [`Updater`].
pub struct Applier<'a> {
    updater: Updater<'a>,
}

impl<'a> Applier<'a> {
    pub fn new(updater: Updater<'a>) -> Self {
        Self { updater }
    }

    /// Update one target, opening a pull request when the change was
    /// committed to a generated branch.
    pub fn update_repository(&self, repo: &Repository, new_value: &str) -> Result<UpdateOutcome> {
        let mutation = Mutation::for_repository(repo, new_value);
        let input = CommitInput::for_repository(repo);

        let branch = self.updater.apply_update_to_file(&input, &mutation)?;
        info!(
            "Committed {} to {}@{}",
            repo.file_path, repo.source_repo, branch
        );

        if branch == repo.source_branch || repo.disable_pr_creation {
            return Ok(UpdateOutcome {
                branch,
                pull_request: None,
            });
        }

        let request = PullRequestInput {
            title: PULL_REQUEST_TITLE.to_string(),
            body: pull_request_body(&repo.name),
            head: branch.clone(),
            base: repo.source_branch.clone(),
        };
        let pull_request = self
            .updater
            .create_pull_request(&repo.source_repo, &request)
            .map_err(|e| Error::PullRequestInRepo {
                repo: repo.source_repo.clone(),
                source: Box::new(e),
            })?;
        info!(
            "Opened pull request {} from {} into {}",
            pull_request.link, branch, repo.source_branch
        );

        Ok(UpdateOutcome {
            branch,
            pull_request: Some(pull_request),
        })
    }

    /// Update every target of a configuration, in key order.
    ///
    /// A failure does not stop the run, except cancellation: once a target
    /// reports [`Error::Cancelled`] the remaining targets are not attempted.
    pub fn update_repositories(&self, config: &RepoConfiguration, new_value: &str) -> RunSummary {
        let mut summary = RunSummary::default();

        for repo in config.iter() {
            let result = self.update_repository(repo, new_value);
            let cancelled = matches!(&result, Err(e) if e.is_cancelled());

            if let Err(e) = &result {
                error!(
                    "failed to update repository={} file={} target={}: {}",
                    repo.source_repo,
                    repo.file_path,
                    repo.label(),
                    e
                );
            }

            summary.outcomes.push(TargetOutcome {
                key: repo.label().to_string(),
                source_repo: repo.source_repo.clone(),
                file_path: repo.file_path.clone(),
                result,
            });

            if cancelled {
                warn!("Run cancelled, skipping remaining repositories");
                break;
            }
        }

        summary
    }
}

/// Pull request body naming the change source, quoted and escaped.
fn pull_request_body(name: &str) -> String {
    format!("Automated update from {:?}", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::host::memory::{MemoryHost, Operation};
    use crate::host::{CommitRequest, FileContent, GitHost};
    use crate::updater::NameGenerator;

    const REPO: &str = "testorg/testrepo";
    const FILE: &str = "environments/test/services/service-a/test.yaml";
    const SHA: &str = "980a0d5f19a64b4b30a87d4206aade58726b60e3";

    struct StubName;

    impl NameGenerator for StubName {
        fn prefixed_name(&self, prefix: &str) -> String {
            format!("{}a", prefix)
        }
    }

    fn repository(branch: &str, prefix: &str) -> Repository {
        Repository {
            key: Some("testRepo".to_string()),
            name: "mynamespace/repository".to_string(),
            source_repo: REPO.to_string(),
            source_branch: branch.to_string(),
            file_path: FILE.to_string(),
            update_key: "test.image".to_string(),
            branch_generate_name: prefix.to_string(),
            ..Default::default()
        }
    }

    fn seeded_host(branch: &str) -> MemoryHost {
        let host = MemoryHost::new();
        host.add_file_contents(REPO, FILE, branch, b"test:\n  image: old-image\n");
        host.add_branch_head(REPO, branch, SHA);
        host
    }

    fn applier(host: &MemoryHost) -> Applier<'_> {
        Applier::new(Updater::new(host).with_name_generator(StubName))
    }

    #[test]
    fn test_pull_request_body_quotes_name() {
        assert_eq!(
            pull_request_body("mynamespace/repository"),
            "Automated update from \"mynamespace/repository\""
        );
        assert_eq!(pull_request_body("a\"b"), "Automated update from \"a\\\"b\"");
    }

    #[test]
    fn test_update_with_generated_branch() {
        let host = seeded_host("master");

        let outcome = applier(&host)
            .update_repository(&repository("master", "test-branch-"), "repo:production")
            .unwrap();

        assert_eq!(outcome.branch, "test-branch-a");
        assert_eq!(
            host.updated_contents(REPO, FILE, "test-branch-a").unwrap(),
            b"test:\n  image: repo:production\n"
        );
        let prs = host.pull_requests();
        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].repo, REPO);
        assert_eq!(prs[0].input.head, "test-branch-a");
        assert_eq!(prs[0].input.base, "master");
        assert_eq!(prs[0].input.title, PULL_REQUEST_TITLE);
        assert_eq!(prs[0].input.body, "Automated update from \"mynamespace/repository\"");
        assert_eq!(outcome.pull_request.unwrap().link, "memory://testorg/testrepo/pull/1");
    }

    #[test]
    fn test_update_without_name_generator() {
        let host = seeded_host("production");

        let outcome = applier(&host)
            .update_repository(&repository("production", ""), "repo:production")
            .unwrap();

        assert_eq!(outcome.branch, "production");
        assert!(outcome.pull_request.is_none());
        assert_eq!(
            host.updated_contents(REPO, FILE, "production").unwrap(),
            b"test:\n  image: repo:production\n"
        );
        assert!(host.created_branches().is_empty());
        assert!(host.pull_requests().is_empty());
    }

    #[test]
    fn test_disable_pr_creation() {
        let host = seeded_host("master");
        let mut repo = repository("master", "test-branch-");
        repo.disable_pr_creation = true;

        let outcome = applier(&host).update_repository(&repo, "repo:production").unwrap();

        assert_eq!(outcome.branch, "test-branch-a");
        assert!(outcome.pull_request.is_none());
        assert_eq!(host.created_branches().len(), 1);
        assert!(host.pull_requests().is_empty());
    }

    #[test]
    fn test_remove_key() {
        let host = MemoryHost::new();
        host.add_file_contents(REPO, FILE, "master", b"test:\n  image: old-image\n  tag: v1\n");
        let mut repo = repository("master", "");
        repo.remove_key = true;

        applier(&host).update_repository(&repo, "ignored").unwrap();

        assert_eq!(
            host.updated_contents(REPO, FILE, "master").unwrap(),
            b"test:\n  tag: v1\n"
        );
    }

    #[test]
    fn test_remove_file() {
        let host = seeded_host("master");
        let mut repo = repository("master", "");
        repo.remove_file = true;
        repo.remove_key = true;

        applier(&host).update_repository(&repo, "ignored").unwrap();

        assert!(host.file_contents(REPO, FILE, "master").is_none());
        assert_eq!(host.commits().len(), 1);
        assert!(host.commits()[0].content.is_none());
    }

    #[test]
    fn test_signature_and_message_are_resolved() {
        let host = seeded_host("master");
        let mut repo = repository("master", "");
        repo.commit_msg = "bump image".to_string();
        repo.signature = Some(crate::config::Signature {
            name: "John Doe".to_string(),
            email: "john.doe@example.com".to_string(),
        });

        applier(&host).update_repository(&repo, "repo:production").unwrap();

        let commit = &host.commits()[0];
        assert_eq!(commit.message, "bump image");
        assert_eq!(commit.signature.as_ref().unwrap().name, "John Doe");
    }

    #[test]
    fn test_pull_request_failure_keeps_commit() {
        let host = seeded_host("master");
        host.fail(Operation::OpenPullRequest, "failure");

        let err = applier(&host)
            .update_repository(&repository("master", "test-branch-"), "repo:production")
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "failed to create pull request in repo testorg/testrepo: failed to create a pull request: failure"
        );
        assert_eq!(
            host.updated_contents(REPO, FILE, "test-branch-a").unwrap(),
            b"test:\n  image: repo:production\n"
        );
    }

    #[test]
    fn test_update_repositories_continues_after_failure() {
        let host = seeded_host("master");
        host.add_file_contents("testorg/anothertestrepo", FILE, "main", b"test:\n  image: old-image\n");
        host.fail_for_repo(Operation::GetFile, REPO, "missing file");

        let mut second = repository("main", "");
        second.source_repo = "testorg/anothertestrepo".to_string();
        let config = RepoConfiguration::from_repositories(vec![
            ("a-first".to_string(), repository("master", "test-branch-")),
            ("b-second".to_string(), second),
        ]);

        let summary = applier(&host).update_repositories(&config, "repo:production");

        assert_eq!(summary.outcomes.len(), 2);
        assert_eq!(summary.failed().count(), 1);
        assert_eq!(summary.succeeded().next().unwrap().key, "b-second");
        assert_eq!(
            host.updated_contents("testorg/anothertestrepo", FILE, "main").unwrap(),
            b"test:\n  image: repo:production\n"
        );
        assert_eq!(summary.into_result().unwrap_err().to_string(), "missing file");
    }

    #[test]
    fn test_into_result_returns_last_failure() {
        let host = MemoryHost::new();
        host.fail_for_repo(Operation::GetFile, "org/one", "first failure");
        host.fail_for_repo(Operation::GetFile, "org/two", "second failure");

        let mut one = repository("master", "");
        one.source_repo = "org/one".to_string();
        let mut two = repository("master", "");
        two.source_repo = "org/two".to_string();
        let config = RepoConfiguration::from_repositories(vec![
            ("one".to_string(), one),
            ("two".to_string(), two),
        ]);

        let summary = applier(&host).update_repositories(&config, "v");
        assert_eq!(summary.failed().count(), 2);
        assert_eq!(summary.into_result().unwrap_err().to_string(), "second failure");
    }

    #[test]
    fn test_failures_are_logged_with_context() {
        testing_logger::setup();
        let host = MemoryHost::new();
        let config = RepoConfiguration::from_repositories(vec![(
            "testRepo".to_string(),
            repository("master", ""),
        )]);

        let summary = applier(&host).update_repositories(&config, "v");
        assert!(summary.into_result().is_err());

        testing_logger::validate(|logs| {
            let failure = logs
                .iter()
                .find(|l| l.level == log::Level::Error)
                .expect("an error log");
            assert!(failure.body.contains("repository=testorg/testrepo"));
            assert!(failure.body.contains(&format!("file={}", FILE)));
            assert!(failure.body.contains("target=testRepo"));
        });
    }

    #[test]
    fn test_cancellation_stops_the_run() {
        let host = seeded_host("master");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let applier = Applier::new(Updater::new(&host).with_cancellation(cancel));
        let config = RepoConfiguration::from_repositories(vec![
            ("one".to_string(), repository("master", "")),
            ("two".to_string(), repository("master", "")),
        ]);

        let summary = applier.update_repositories(&config, "v");

        assert_eq!(summary.outcomes.len(), 1);
        assert!(summary.was_cancelled());
        assert!(host.commits().is_empty());
        assert!(summary.into_result().unwrap_err().is_cancelled());
    }

    /// Delegates to a memory host and cancels the run once a commit lands.
    struct CancelAfterCommit {
        inner: MemoryHost,
        cancel: CancellationToken,
    }

    impl GitHost for CancelAfterCommit {
        fn get_file(&self, repo: &str, path: &str, branch: &str) -> Result<FileContent> {
            self.inner.get_file(repo, path, branch)
        }

        fn branch_head(&self, repo: &str, branch: &str) -> Result<String> {
            self.inner.branch_head(repo, branch)
        }

        fn create_branch(&self, repo: &str, name: &str, sha: &str) -> Result<()> {
            self.inner.create_branch(repo, name, sha)
        }

        fn commit_file(&self, request: &CommitRequest) -> Result<()> {
            self.inner.commit_file(request)?;
            self.cancel.cancel();
            Ok(())
        }

        fn open_pull_request(&self, repo: &str, input: &PullRequestInput) -> Result<PullRequest> {
            self.inner.open_pull_request(repo, input)
        }
    }

    #[test]
    fn test_cancellation_before_pull_request_stops_the_run() {
        let cancel = CancellationToken::new();
        let host = CancelAfterCommit {
            inner: seeded_host("master"),
            cancel: cancel.clone(),
        };
        let applier = Applier::new(
            Updater::new(&host)
                .with_name_generator(StubName)
                .with_cancellation(cancel),
        );
        let config = RepoConfiguration::from_repositories(vec![
            ("one".to_string(), repository("master", "test-branch-")),
            ("two".to_string(), repository("master", "test-branch-")),
        ]);

        let summary = applier.update_repositories(&config, "v");

        assert_eq!(summary.outcomes.len(), 1);
        assert!(summary.was_cancelled());
        assert!(host.inner.pull_requests().is_empty());
        let err = summary.into_result().unwrap_err();
        assert!(matches!(err, Error::PullRequestInRepo { .. }));
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_empty_configuration_succeeds() {
        let host = MemoryHost::new();
        let summary = applier(&host).update_repositories(&RepoConfiguration::default(), "v");
        assert!(summary.outcomes.is_empty());
        assert!(summary.into_result().is_ok());
    }
}
