//! Ephemeral staging directory for one pipeline run
//!
//! The directory name is derived from the run id, so no two runs share
//! a staging area. Teardown is idempotent: destroying a directory that
//! was already removed is a success, and a pre-existing directory left
//! by a prior failed cleanup does not fail creation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default directory-name prefix under the system temp root
pub const STAGING_PREFIX: &str = "signing_stage";

/// Staging directory could not be created
#[derive(Debug, Error)]
#[error("failed to create staging directory {path}: {source}")]
pub struct StagingError {
    /// The directory that could not be created
    pub path: PathBuf,
    source: io::Error,
}

/// Staging directory could not be removed after the run's outcome was
/// already decided
#[derive(Debug, Error)]
#[error("failed to remove staging directory {path}: {source}")]
pub struct CleanupError {
    /// The directory that could not be removed
    pub path: PathBuf,
    source: io::Error,
}

/// A single filesystem directory scoped to one pipeline run
#[derive(Debug)]
pub struct StagingArea {
    path: PathBuf,
}

impl StagingArea {
    /// Create the staging directory under the system temp root
    pub fn create(prefix: &str, run_id: &str) -> Result<Self, StagingError> {
        Self::create_under(&std::env::temp_dir(), prefix, run_id)
    }

    /// Create the staging directory under an explicit root
    pub fn create_under(root: &Path, prefix: &str, run_id: &str) -> Result<Self, StagingError> {
        let path = root.join(format!("{prefix}_{run_id}"));
        match fs::create_dir(&path) {
            Ok(()) => {}
            // Tolerated: an empty directory left by a prior failed cleanup
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(StagingError { path, source: e }),
        }
        Ok(Self { path })
    }

    /// The directory's location, for staging operations
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recursively remove the directory and everything under it
    ///
    /// Must run exactly once per successful `create`, on every exit
    /// path. A missing directory is a success.
    pub fn destroy(&self) -> Result<(), CleanupError> {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CleanupError {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}
