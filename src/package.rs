//! Upload package construction
//!
//! Materializes correlated profiles into the staging area, then appends
//! every staged signing file plus the run's diagnostic log into one tar
//! archive. An archive with zero signing files is useless and must
//! never be produced, so an empty enumeration is a hard failure. The
//! archive is built into a temporary name and renamed only on full
//! success; a failed build leaves no archive behind.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tar::Builder;
use thiserror::Error;
use walkdir::WalkDir;

use crate::artifact::{ProvisioningProfile, SIGNING_EXTENSIONS};
use crate::logging::DiagnosticLog;
use crate::staging::StagingArea;

/// Default archive file name inside the staging area
pub const DEFAULT_PACKAGE_NAME: &str = "signing_files_package.tar";

/// Errors from package construction
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("no signing files staged after correlation")]
    NoSigningArtifacts,

    #[error("failed to stage {path}: {source}")]
    Stage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to enumerate staged files: {0}")]
    Enumerate(#[from] walkdir::Error),

    #[error("failed to build archive {name}: {source}")]
    Archive {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to add log {path} to archive: {source}")]
    LogAppend {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for packaging operations
pub type PackageResult<T> = Result<T, PackageError>;

/// Package builder configuration
#[derive(Debug, Clone)]
pub struct PackageConfig {
    /// Archive file name, overridable for testing
    pub package_name: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            package_name: DEFAULT_PACKAGE_NAME.to_string(),
        }
    }
}

/// Description of a finished package
#[derive(Debug, Clone, Serialize)]
pub struct PackageReceipt {
    /// Location of the archive inside the staging area
    pub path: PathBuf,

    /// Number of signing files in the archive, excluding the log
    pub file_count: usize,

    /// SHA-256 of the archive bytes (hex)
    pub sha256: String,
}

/// Builds the upload package inside a staging area
pub struct PackageBuilder {
    config: PackageConfig,
}

impl PackageBuilder {
    pub fn new(config: PackageConfig) -> Self {
        Self { config }
    }

    /// Stage the correlated profiles and archive them with the log
    ///
    /// Fails with [`PackageError::NoSigningArtifacts`] when no staged
    /// file carries a recognized signing extension.
    pub fn build(
        &self,
        staging: &StagingArea,
        profiles: &[ProvisioningProfile],
        log: &DiagnosticLog,
    ) -> PackageResult<PackageReceipt> {
        log.info("Preparing upload package");

        self.stage_profiles(staging, profiles, log)?;

        let signing_files = self.enumerate_signing_files(staging)?;
        if signing_files.is_empty() {
            log.error("No signing files found in the staging area, aborting");
            return Err(PackageError::NoSigningArtifacts);
        }
        log.debug(format!(
            "Packaging {} signing file(s)",
            signing_files.len()
        ));
        for file in &signing_files {
            log.debug(format!("  {}", file.display()));
        }

        let archive = self.build_archive(&signing_files, log)?;

        let sha256 = {
            let mut hasher = Sha256::new();
            hasher.update(&archive);
            hex::encode(hasher.finalize())
        };

        let package_path = self.finalize(staging, &archive)?;
        log.debug(format!(
            "Package finalized at {} (sha256 {})",
            package_path.display(),
            sha256
        ));

        Ok(PackageReceipt {
            path: package_path,
            file_count: signing_files.len(),
            sha256,
        })
    }

    /// Copy each correlated profile file into the staging area
    fn stage_profiles(
        &self,
        staging: &StagingArea,
        profiles: &[ProvisioningProfile],
        log: &DiagnosticLog,
    ) -> PackageResult<()> {
        for profile in profiles {
            let mut dest = staging.path().join(profile.staged_file_name());
            // Distinct profiles may share a source file name; never
            // overwrite an already-staged artifact
            if dest.exists() {
                dest = staging
                    .path()
                    .join(format!("{}_{}", profile.id, profile.staged_file_name()));
            }
            log.debug(format!(
                "Staging {} -> {}",
                profile.path.display(),
                dest.display()
            ));
            fs::copy(&profile.path, &dest).map_err(|e| PackageError::Stage {
                path: profile.path.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Enumerate staged files carrying a recognized signing extension
    fn enumerate_signing_files(&self, staging: &StagingArea) -> PackageResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(staging.path()).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let is_signing_file = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| SIGNING_EXTENSIONS.contains(&ext));
            if is_signing_file {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Append the signing files and the diagnostic log into a tar buffer
    fn build_archive(
        &self,
        signing_files: &[PathBuf],
        log: &DiagnosticLog,
    ) -> PackageResult<Vec<u8>> {
        let mut builder = Builder::new(Vec::new());

        for file in signing_files {
            // Entries are named by bare file name; the archive is flat
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            builder
                .append_path_with_name(file, &name)
                .map_err(|e| PackageError::Archive {
                    name: self.config.package_name.clone(),
                    source: e,
                })?;
        }

        // Flush buffered records so the archived log is complete
        log.debug(format!(
            "Adding log {} to the upload package",
            log.path().display()
        ));
        log.flush();
        let log_name = log
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        builder
            .append_path_with_name(log.path(), &log_name)
            .map_err(|e| PackageError::LogAppend {
                path: log.path().to_path_buf(),
                source: e,
            })?;

        builder.into_inner().map_err(|e| PackageError::Archive {
            name: self.config.package_name.clone(),
            source: e,
        })
    }

    /// Write the archive under a temporary name, then rename into place
    fn finalize(&self, staging: &StagingArea, archive: &[u8]) -> PackageResult<PathBuf> {
        let package_path = staging.path().join(&self.config.package_name);
        let temp_path = staging
            .path()
            .join(format!(".{}.tmp", uuid::Uuid::new_v4()));

        let write = |p: &Path| -> io::Result<()> {
            fs::write(p, archive)?;
            fs::rename(p, &package_path)
        };
        write(&temp_path).map_err(|e| {
            // Best effort; a leftover temp file is removed with the
            // staging area either way
            let _ = fs::remove_file(&temp_path);
            PackageError::Archive {
                name: self.config.package_name.clone(),
                source: e,
            }
        })?;

        Ok(package_path)
    }
}
