//! Test doubles for the pipeline's external collaborators
//!
//! In-memory sources with failure injection for exercising the abort
//! and cleanup paths without a filesystem or credential store.

use std::cell::Cell;

use crate::artifact::{ProvisioningProfile, SigningIdentity};
use crate::package::PackageReceipt;
use crate::source::{CollectError, IdentitySource, ProfileSource, UploadError, Uploader};

/// Profile source returning a fixed inventory
#[derive(Debug, Default)]
pub struct StaticProfileSource {
    pub profiles: Vec<ProvisioningProfile>,
}

impl StaticProfileSource {
    pub fn new(profiles: Vec<ProvisioningProfile>) -> Self {
        Self { profiles }
    }
}

impl ProfileSource for StaticProfileSource {
    fn collect(&self) -> Result<Vec<ProvisioningProfile>, CollectError> {
        Ok(self.profiles.clone())
    }
}

/// Identity source returning a fixed inventory
#[derive(Debug, Default)]
pub struct StaticIdentitySource {
    pub identities: Vec<SigningIdentity>,
}

impl StaticIdentitySource {
    pub fn new(identities: Vec<SigningIdentity>) -> Self {
        Self { identities }
    }
}

impl IdentitySource for StaticIdentitySource {
    fn collect(&self) -> Result<Vec<SigningIdentity>, CollectError> {
        Ok(self.identities.clone())
    }
}

/// Source that always fails collection with a provider error
#[derive(Debug)]
pub struct FailingSource {
    pub message: String,
}

impl FailingSource {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ProfileSource for FailingSource {
    fn collect(&self) -> Result<Vec<ProvisioningProfile>, CollectError> {
        Err(CollectError::Provider(self.message.clone()))
    }
}

impl IdentitySource for FailingSource {
    fn collect(&self) -> Result<Vec<SigningIdentity>, CollectError> {
        Err(CollectError::Provider(self.message.clone()))
    }
}

/// Uploader that records whether it ran and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingUploader {
    pub fail_with: Option<String>,
    uploaded: Cell<bool>,
}

impl RecordingUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            uploaded: Cell::new(false),
        }
    }

    pub fn uploaded(&self) -> bool {
        self.uploaded.get()
    }
}

impl Uploader for RecordingUploader {
    fn upload(&self, _receipt: &PackageReceipt) -> Result<(), UploadError> {
        if let Some(message) = &self.fail_with {
            return Err(UploadError(message.clone()));
        }
        self.uploaded.set(true);
        Ok(())
    }
}
