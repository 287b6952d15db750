//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to a test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config(configs::BASE_REPOSITORIES);
//!     fixture.command().arg("update").arg("--dry-run").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::env;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    #[allow(unused_imports)]
    pub use super::TestFixture;
}

/// Repositories configurations used across tests.
#[allow(dead_code)]
pub mod configs {
    /// Two enabled repositories and a disabled one.
    pub const BASE_REPOSITORIES: &str = include_str!("../testdata/base-repositories.yaml");

    /// A repository missing its file path.
    pub const MISSING_FILE_PATH: &str = r#"
repositories:
  broken:
    sourceRepo: my-org/my-project
    sourceBranch: main
    updateKey: image
"#;

    /// Not a repositories mapping.
    pub const INVALID_YAML: &str = "repositories: [unclosed";
}

/// Name of the configuration file looked up by default.
pub const CONFIG_FILE: &str = ".yaml-updater.yaml";

/// A temporary working directory, optionally holding a configuration file.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `.yaml-updater.yaml` with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child(CONFIG_FILE)
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    #[allow(dead_code)]
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join(CONFIG_FILE)
    }

    /// Write a configuration file at `path` inside the fixture.
    #[allow(dead_code)]
    pub fn child_config(&self, path: &str, content: &str) -> PathBuf {
        let child = self.temp_dir.child(path);
        child.write_str(content).expect("Failed to write config file");
        child.path().to_path_buf()
    }

    /// A command running the binary in this fixture's directory.
    ///
    /// `GIT_*` variables of the calling environment are removed and colour
    /// is turned off, so output only depends on the test.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("yaml-updater");
        for (name, _) in env::vars_os() {
            if name.to_string_lossy().starts_with("GIT_") {
                cmd.env_remove(name);
            }
        }
        cmd.env_remove("RUST_LOG");
        cmd.env("NO_COLOR", "1");
        cmd.current_dir(self.path());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
