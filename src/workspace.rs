//! Ephemeral per-execution working directories.
//!
//! Each execution gets its own randomly named directory under a configured
//! base path. The directory is removed by [`Workspace::release`] or, if the
//! caller never gets that far, when the [`Workspace`] is dropped.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

const WORKSPACE_PREFIX: &str = "plotbox-";

/// Errors creating or removing a workspace.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// Directory could not be created under the base path.
    #[error("Failed to create workspace under {base}: {source}")]
    Create { base: PathBuf, source: io::Error },

    /// Directory could not be removed.
    #[error("Failed to remove workspace {path}: {source}")]
    Remove { path: PathBuf, source: io::Error },

    /// A file inside the workspace could not be written or read.
    #[error("Workspace I/O failed on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

impl WorkspaceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Creates workspaces under a base directory.
#[derive(Debug, Clone)]
pub(crate) struct WorkspaceManager {
    base: PathBuf,
}

impl WorkspaceManager {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Creates a fresh, exclusively owned directory.
    pub fn acquire(&self) -> Result<Workspace, WorkspaceError> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&self.base)
            .map_err(|source| WorkspaceError::Create {
                base: self.base.clone(),
                source,
            })?;

        debug!("Acquired workspace {}", dir.path().display());
        Ok(Workspace {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
        })
    }
}

/// A directory owned by a single execution.
#[derive(Debug)]
pub(crate) struct Workspace {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file directly under the workspace root.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Removes the directory and everything in it.
    ///
    /// A directory that is already gone counts as released.
    pub fn release(mut self) -> Result<(), WorkspaceError> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };

        match dir.close() {
            Ok(()) => {
                debug!("Released workspace {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(WorkspaceError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to remove workspace {}: {}", self.path.display(), e);
                }
            }
        }
    }
}
