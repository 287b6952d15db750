//! # Repositories Configuration
//!
//! This module defines the data structures that represent the
//! `.yaml-updater.yaml` configuration file and the logic for loading it.
//!
//! ## Key Components
//!
//! - **`Repository`**: One update job: which file in which repository and
//!   branch to change, which key to set or remove, and how to commit it.
//!
//! - **`RepoConfiguration`**: The `repositories` mapping from a unique key to
//!   a `Repository`. Keys are kept in a `BTreeMap` so every pass over the
//!   configuration visits targets in the same order.
//!
//! ## Format
//!
//! ```yaml
//! repositories:
//!   service-a:
//!     name: my-org/service-a
//!     sourceRepo: my-org/gitops
//!     sourceBranch: main
//!     filePath: service-a/deployment.yaml
//!     updateKey: spec.template.spec.containers.0.image
//!     branchGenerateName: service-a-
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Commit message used when a repository does not configure one.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Automatic update because of GitOps yaml update/removal";

/// Label used in messages for the target built from command-line flags.
pub const CLI_TARGET_LABEL: &str = "<cli>";

/// A git commit author identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

impl Signature {
    /// A signature is only used when both parts are present.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.email.is_empty()
    }
}

/// The items required to update a specific file in a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// Key of this repository in the configuration. `None` when the
    /// repository was built from command-line flags.
    #[serde(skip)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
    #[serde(default)]
    pub source_repo: String,
    #[serde(default)]
    pub source_branch: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub update_key: String,
    /// Prefix for generated branches. Empty means commit to `source_branch`.
    #[serde(default)]
    pub branch_generate_name: String,
    #[serde(default, rename = "disablePRCreation", skip_serializing_if = "is_false")]
    pub disable_pr_creation: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub remove_key: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub remove_file: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub create_missing: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub commit_msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Repository {
    /// The key when present, or a placeholder for the command-line target.
    pub fn label(&self) -> &str {
        self.key.as_deref().unwrap_or(CLI_TARGET_LABEL)
    }

    /// The signature to commit with, if a complete one is configured.
    pub fn commit_signature(&self) -> Option<&Signature> {
        self.signature.as_ref().filter(|s| s.is_complete())
    }

    /// The configured commit message, or the default one.
    pub fn commit_message(&self) -> &str {
        if self.commit_msg.is_empty() {
            DEFAULT_COMMIT_MESSAGE
        } else {
            &self.commit_msg
        }
    }

    /// Checks that the fields needed to locate and change the file are set.
    pub fn validate(&self) -> Result<()> {
        let missing = |field: &str| Error::InvalidRepository {
            key: self.label().to_string(),
            message: format!("'{}' is required", field),
        };

        if self.source_repo.trim().is_empty() {
            return Err(missing("sourceRepo"));
        }
        if self.source_branch.trim().is_empty() {
            return Err(missing("sourceBranch"));
        }
        if self.file_path.trim().is_empty() {
            return Err(missing("filePath"));
        }
        if !self.remove_file && self.update_key.trim().is_empty() {
            return Err(missing("updateKey"));
        }
        Ok(())
    }
}

/// The `repositories` mapping of a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfiguration {
    #[serde(default)]
    pub repositories: BTreeMap<String, Repository>,
}

impl RepoConfiguration {
    /// Builds a configuration from keyed repositories, filling each `key`.
    pub fn from_repositories<I>(repositories: I) -> Self
    where
        I: IntoIterator<Item = (String, Repository)>,
    {
        let repositories = repositories
            .into_iter()
            .map(|(key, mut repo)| {
                repo.key = Some(key.clone());
                (key, repo)
            })
            .collect();
        Self { repositories }
    }

    /// Looks up a repository by key.
    pub fn find(&self, key: &str) -> Option<&Repository> {
        self.repositories.get(key)
    }

    /// Returns the repository keys in iteration order.
    pub fn keys(&self) -> Vec<String> {
        self.repositories.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    /// Iterates over the repositories in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Repository> {
        self.repositories.values()
    }

    /// Validates every repository, stopping at the first invalid one.
    pub fn validate(&self) -> Result<()> {
        self.iter().try_for_each(Repository::validate)
    }
}

/// Parse a configuration from a YAML string.
pub fn parse(yaml_content: &str) -> Result<RepoConfiguration> {
    let parsed: RepoConfiguration =
        serde_yaml::from_str(yaml_content).map_err(|e| Error::ConfigParse {
            message: format!("failed to unmarshal YAML: {}", e),
            hint: Some("expected a top-level 'repositories' mapping of key to repository".to_string()),
        })?;
    Ok(RepoConfiguration::from_repositories(parsed.repositories))
}

/// Load and parse a configuration file.
pub fn from_file(path: &Path) -> Result<RepoConfiguration> {
    let content = fs::read_to_string(path)?;
    parse(&content)
}
