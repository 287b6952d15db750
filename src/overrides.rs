//! # Override Resolution
//!
//! Merges command-line and environment overrides onto a loaded
//! [`RepoConfiguration`].
//!
//! Overrides only reach the repositories picked by a selector:
//!
//! 1. `only`: drops every repository not listed (even if enabled) and enables
//!    every listed one. The listed keys are the override targets.
//! 2. `override_repositories`: the listed keys are the override targets.
//! 3. `override_all`: every key is an override target.
//!
//! Without a selector no field override is applied, whatever the number of
//! repositories. Field overrides are sparse: only the fields present in
//! [`Overrides`] are written, and a present field always wins, even when
//! empty. Disabled repositories are removed from the result.
//!
//! Every selector key is checked before anything is changed. An unknown key
//! fails the whole resolution and the input configuration is consumed, so no
//! half-applied configuration can escape.

use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::{RepoConfiguration, Repository, Signature, CLI_TARGET_LABEL};
use crate::error::{Error, Result};

/// Values supplied on the command line or through the environment.
///
/// Each `Option` is `None` when the value was not given at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub name: Option<String>,
    pub source_repo: Option<String>,
    pub source_branch: Option<String>,
    pub file_path: Option<String>,
    pub update_key: Option<String>,
    pub branch_generate_name: Option<String>,
    pub remove_key: Option<bool>,
    pub remove_file: Option<bool>,
    pub create_missing: Option<bool>,
    pub commit_msg: Option<String>,
    pub disable_pr_creation: Option<bool>,
    pub committer_name: Option<String>,
    pub committer_email: Option<String>,

    /// Enable or disable the selected repositories. Ignored with `only`.
    pub disabled: Option<bool>,
    /// Keep only these repositories, enabling them.
    pub only: Option<Vec<String>>,
    /// Apply field overrides to these repositories.
    pub override_repositories: Option<Vec<String>>,
    /// Apply field overrides to every repository.
    pub override_all: bool,
}

impl Overrides {
    fn only_keys(&self) -> Option<&[String]> {
        non_empty(&self.only)
    }

    fn override_keys(&self) -> Option<&[String]> {
        non_empty(&self.override_repositories)
    }

    /// True when at least one repository field would be overwritten.
    pub fn has_field_overrides(&self) -> bool {
        self.name.is_some()
            || self.source_repo.is_some()
            || self.source_branch.is_some()
            || self.file_path.is_some()
            || self.update_key.is_some()
            || self.branch_generate_name.is_some()
            || self.remove_key.is_some()
            || self.remove_file.is_some()
            || self.create_missing.is_some()
            || self.commit_msg.is_some()
            || self.disable_pr_creation.is_some()
            || self.committer_name.is_some()
            || self.committer_email.is_some()
    }

    /// Writes every present field onto `repo`.
    pub fn apply_fields(&self, repo: &mut Repository) {
        set(&mut repo.name, &self.name);
        set(&mut repo.source_repo, &self.source_repo);
        set(&mut repo.source_branch, &self.source_branch);
        set(&mut repo.file_path, &self.file_path);
        set(&mut repo.update_key, &self.update_key);
        set(&mut repo.branch_generate_name, &self.branch_generate_name);
        set(&mut repo.remove_key, &self.remove_key);
        set(&mut repo.remove_file, &self.remove_file);
        set(&mut repo.create_missing, &self.create_missing);
        set(&mut repo.commit_msg, &self.commit_msg);
        set(&mut repo.disable_pr_creation, &self.disable_pr_creation);

        if self.committer_name.is_some() || self.committer_email.is_some() {
            let signature = repo.signature.get_or_insert_with(Signature::default);
            set(&mut signature.name, &self.committer_name);
            set(&mut signature.email, &self.committer_email);
        }
    }
}

fn non_empty(list: &Option<Vec<String>>) -> Option<&[String]> {
    list.as_deref().filter(|keys| !keys.is_empty())
}

fn set<T: Clone>(field: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *field = value.clone();
    }
}

/// Applies `overrides` to `config` and drops disabled repositories.
///
/// Fails with [`Error::UnknownRepository`] when a selector names a key that
/// is not in the configuration.
pub fn resolve(config: RepoConfiguration, overrides: &Overrides) -> Result<RepoConfiguration> {
    let only = overrides.only_keys();

    let selected: Vec<String> = if let Some(only) = only {
        only.to_vec()
    } else if let Some(keys) = overrides.override_keys() {
        keys.to_vec()
    } else if overrides.override_all {
        config.keys()
    } else {
        Vec::new()
    };

    if let Some(missing) = selected.iter().find(|key| config.find(key).is_none()) {
        return Err(Error::UnknownRepository {
            key: missing.clone(),
        });
    }

    if selected.is_empty() && overrides.has_field_overrides() && !config.is_empty() {
        warn!(
            "Ignoring repository overrides: pass --only, --override-repositories or --override-all to apply them"
        );
    }

    let selected: BTreeSet<&str> = selected.iter().map(String::as_str).collect();
    let mut resolved = BTreeMap::new();

    for (key, mut repo) in config.repositories {
        if let Some(only) = only {
            if !only.contains(&key) {
                debug!("Dropping repository {} as it is not listed in --only", key);
                continue;
            }
            repo.disabled = false;
        }

        if selected.contains(key.as_str()) {
            if only.is_none() {
                if let Some(disabled) = overrides.disabled {
                    repo.disabled = disabled;
                }
            }
            if !repo.disabled {
                overrides.apply_fields(&mut repo);
            }
        }

        if repo.disabled {
            debug!("Skipping disabled repository {}", key);
            continue;
        }
        resolved.insert(key, repo);
    }

    Ok(RepoConfiguration {
        repositories: resolved,
    })
}

/// Builds the single target used when no configuration file exists.
///
/// Starts from `sourceBranch: master`, `branchGenerateName: gitops-` and
/// `createMissing: true`, then applies every present field. `disabled` and
/// the selectors have no meaning here and are ignored.
pub fn cli_target(overrides: &Overrides) -> RepoConfiguration {
    let mut repo = Repository {
        source_branch: "master".to_string(),
        branch_generate_name: "gitops-".to_string(),
        create_missing: true,
        ..Default::default()
    };
    overrides.apply_fields(&mut repo);

    let mut repositories = BTreeMap::new();
    repositories.insert(CLI_TARGET_LABEL.to_string(), repo);
    RepoConfiguration { repositories }
}
