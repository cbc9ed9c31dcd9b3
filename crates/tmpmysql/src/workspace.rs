//! Private per-instance directory tree.
//!
//! Every instance owns `<temp>/tmpmysql_NNNN` exclusively. The root is claimed
//! with a single `mkdir`, so two allocators racing for the same name cannot
//! both succeed; the loser moves on to the next counter value.

use std::fs::DirBuilder;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::ServerError;

const WORKSPACE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::workspace");

/// Prefix shared by every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "tmpmysql_";

/// Number of candidate names tried before giving up.
pub const MAX_WORKSPACES: u32 = 10_000;

/// Filesystem layout owned by a single instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    data_dir: PathBuf,
    tmp_dir: PathBuf,
    socket_path: PathBuf,
    pid_path: PathBuf,
}

impl Workspace {
    /// Claims a fresh workspace root under the system temp directory.
    pub fn allocate() -> Result<Self, ServerError> {
        Self::allocate_in(&std::env::temp_dir())
    }

    /// Claims a fresh workspace root under `temp_root`.
    ///
    /// Only the root is created; call [`Workspace::prepare`] to create the
    /// data and scratch subdirectories.
    pub fn allocate_in(temp_root: &Path) -> Result<Self, ServerError> {
        create_root(temp_root, MAX_WORKSPACES).map(Self::at)
    }

    fn at(root: PathBuf) -> Self {
        Self {
            data_dir: root.join("data"),
            tmp_dir: root.join("tmp"),
            socket_path: root.join("sock"),
            pid_path: root.join("pid"),
            root,
        }
    }

    /// Creates the `data` and `tmp` subdirectories with owner-only access.
    pub fn prepare(&self) -> Result<(), ServerError> {
        for dir in [&self.data_dir, &self.tmp_dir] {
            owner_only_dir_builder()
                .create(dir)
                .map_err(|source| ServerError::WorkspaceInitFailed {
                    path: dir.clone(),
                    source,
                })?;
        }
        debug!(
            target: WORKSPACE_TARGET,
            root = %self.root.display(),
            "workspace subdirectories created"
        );
        Ok(())
    }

    /// Workspace root; removing it removes every artefact of the instance.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Server data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Server scratch directory.
    #[must_use]
    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    /// Unix socket the server listens on.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// File the server writes its process id to once ready.
    #[must_use]
    pub fn pid_path(&self) -> &Path {
        &self.pid_path
    }
}

fn create_root(temp_root: &Path, cap: u32) -> Result<PathBuf, ServerError> {
    for index in 0..cap {
        let candidate = temp_root.join(format!("{WORKSPACE_PREFIX}{index:04}"));
        match owner_only_dir_builder().create(&candidate) {
            Ok(()) => {
                info!(
                    target: WORKSPACE_TARGET,
                    root = %candidate.display(),
                    "workspace allocated"
                );
                return Ok(candidate);
            }
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {}
            Err(source) => {
                return Err(ServerError::WorkspaceInitFailed {
                    path: candidate,
                    source,
                });
            }
        }
    }
    Err(ServerError::TooManyWorkspaces {
        temp_root: temp_root.to_path_buf(),
        attempts: cap,
    })
}

fn owner_only_dir_builder() -> DirBuilder {
    let mut builder = DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
}
