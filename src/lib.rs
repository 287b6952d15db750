//! # YAML Updater Library
//!
//! This library updates a single key inside YAML files that live in remote
//! repositories, the way a GitOps pipeline bumps an image reference after a
//! build. It is used by the `yaml-updater` command-line tool but the pieces
//! can be embedded elsewhere.
//!
//! ## Quick Example
//!
//! ```
//! use yaml_updater::applier::Applier;
//! use yaml_updater::config;
//! use yaml_updater::host::memory::MemoryHost;
//! use yaml_updater::overrides::{self, Overrides};
//! use yaml_updater::updater::Updater;
//!
//! let host = MemoryHost::new();
//! host.add_file_contents("org/gitops", "app.yaml", "main", b"image: app:v1\n");
//!
//! let config = config::parse(r#"
//! repositories:
//!   app:
//!     name: org/app
//!     sourceRepo: org/gitops
//!     sourceBranch: main
//!     filePath: app.yaml
//!     updateKey: image
//! "#).unwrap();
//! let config = overrides::resolve(config, &Overrides::default()).unwrap();
//!
//! let applier = Applier::new(Updater::new(&host));
//! applier.update_repositories(&config, "app:v2").into_result().unwrap();
//!
//! assert_eq!(
//!     host.file_contents("org/gitops", "app.yaml", "main").unwrap(),
//!     b"image: app:v2\n"
//! );
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: the `repositories` file, one `Repository`
//!   target per key.
//! - **Overrides (`overrides`)**: command-line and environment values merged
//!   onto the configuration, with target selection and disabling.
//! - **Hosts (`host`)**: the `GitHost` trait and its GitHub and in-memory
//!   drivers.
//! - **Patching (`patch`)**: set, remove and read a key-path in a YAML
//!   document.
//! - **Updating (`updater`, `applier`)**: commit the change, on a generated
//!   branch when asked, and open the pull request.
//!
//! ## Execution Flow
//!
//! 1.  **Load**: parse the configuration, or build one target from flags.
//! 2.  **Resolve**: apply overrides and drop disabled targets.
//! 3.  **Validate**: every remaining target names a repo, branch, file and key.
//! 4.  **Apply**: for each target in key order, fetch, patch, commit and
//!     optionally open a pull request. Failures are logged and the run
//!     continues.

pub mod applier;
pub mod cancel;
pub mod config;
pub mod error;
pub mod host;
pub mod output;
pub mod overrides;
pub mod patch;
mod patch_proptest;
pub mod updater;
