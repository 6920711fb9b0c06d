//! Artifact sources and delivery collaborators
//!
//! Enumerating profiles from the filesystem and identities from a
//! credential store is external to this crate; the pipeline only
//! depends on the collection contracts here. `ManifestSource` is the
//! concrete provider the CLI uses: a JSON manifest listing both
//! inventories. Upload of the finished package is likewise external
//! and modeled as a stub so "package is ready" has a testable meaning
//! without a delivery endpoint.

use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::artifact::{ProvisioningProfile, SigningIdentity};
use crate::package::PackageReceipt;

/// A source failed to enumerate its artifacts
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Provider(String),
}

/// Produces the raw inventory of provisioning profiles
pub trait ProfileSource {
    fn collect(&self) -> Result<Vec<ProvisioningProfile>, CollectError>;
}

/// Produces the raw inventory of codesigning identities
pub trait IdentitySource {
    fn collect(&self) -> Result<Vec<SigningIdentity>, CollectError>;
}

/// JSON manifest listing both artifact inventories
#[derive(Debug, Default, Deserialize)]
pub struct ArtifactManifest {
    #[serde(default)]
    pub profiles: Vec<ProvisioningProfile>,

    #[serde(default)]
    pub identities: Vec<SigningIdentity>,
}

impl ArtifactManifest {
    /// Load and parse a manifest file
    pub fn load(path: &Path) -> Result<Self, CollectError> {
        let content = std::fs::read_to_string(path).map_err(|e| CollectError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| CollectError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl ProfileSource for ArtifactManifest {
    fn collect(&self) -> Result<Vec<ProvisioningProfile>, CollectError> {
        Ok(self.profiles.clone())
    }
}

impl IdentitySource for ArtifactManifest {
    fn collect(&self) -> Result<Vec<SigningIdentity>, CollectError> {
        Ok(self.identities.clone())
    }
}

/// Manifest-backed source that defers loading to collection time
///
/// A missing or malformed manifest then surfaces as a [`CollectError`]
/// inside the run, taking the pipeline's abort path instead of failing
/// in the CLI layer.
#[derive(Debug)]
pub struct ManifestFileSource {
    path: PathBuf,
}

impl ManifestFileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ProfileSource for ManifestFileSource {
    fn collect(&self) -> Result<Vec<ProvisioningProfile>, CollectError> {
        Ok(ArtifactManifest::load(&self.path)?.profiles)
    }
}

impl IdentitySource for ManifestFileSource {
    fn collect(&self) -> Result<Vec<SigningIdentity>, CollectError> {
        Ok(ArtifactManifest::load(&self.path)?.identities)
    }
}

/// Delivery of the finished package failed
#[derive(Debug, Error)]
#[error("upload failed: {0}")]
pub struct UploadError(pub String);

/// Delivers the finished package to the CI pipeline
pub trait Uploader {
    fn upload(&self, receipt: &PackageReceipt) -> Result<(), UploadError>;
}

/// Placeholder uploader until the CI endpoint is wired in
///
/// Succeeding without delivering keeps the pipeline's terminal state
/// meaningful: "package is ready", not "delivered".
#[derive(Debug, Default)]
pub struct NoopUploader;

impl Uploader for NoopUploader {
    fn upload(&self, _receipt: &PackageReceipt) -> Result<(), UploadError> {
        Ok(())
    }
}
