//! Signing artifact model
//!
//! Provisioning profiles and codesigning identities as collected from
//! their sources. Both are immutable once collected. Identities compare
//! and hash by identifier because correlation deduplicates them into
//! sets; a profile may reference many identities and vice versa.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// File extension for provisioning profiles staged for packaging
pub const PROFILE_EXTENSION: &str = "mobileprovision";

/// File extension for exported identity bundles staged for packaging
pub const IDENTITY_EXTENSION: &str = "p12";

/// The staged-file extensions the package builder recognizes as
/// signing artifacts
pub const SIGNING_EXTENSIONS: [&str; 2] = [PROFILE_EXTENSION, IDENTITY_EXTENSION];

/// A provisioning profile bound to a device/app
///
/// `serials` is the ordered set of identity serial numbers the profile
/// embeds; sources guarantee it is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningProfile {
    /// Stable identifier (profile UUID)
    pub id: String,

    /// Display name
    pub name: String,

    /// Location of the profile file on disk
    pub path: PathBuf,

    /// Serial numbers of the identities this profile references
    pub serials: Vec<String>,
}

impl ProvisioningProfile {
    /// Whether this profile references the given identity serial
    pub fn references(&self, serial: &str) -> bool {
        self.serials.iter().any(|s| s == serial)
    }

    /// File name the profile is staged under, derived from its path
    /// with an id-based fallback
    pub fn staged_file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{}.{}", self.id, PROFILE_EXTENSION))
    }
}

impl PartialEq for ProvisioningProfile {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ProvisioningProfile {}

impl Hash for ProvisioningProfile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ProvisioningProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// A codesigning identity available on the host, identified by its
/// certificate serial number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningIdentity {
    /// Stable identifier (certificate fingerprint)
    pub id: String,

    /// Display label
    pub label: String,

    /// Certificate serial number
    pub serial: String,
}

impl PartialEq for SigningIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SigningIdentity {}

impl Hash for SigningIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (serial {})", self.label, self.serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn profile_references_matches_exact_serial() {
        let profile = ProvisioningProfile {
            id: "P1".to_string(),
            name: "App Store".to_string(),
            path: PathBuf::from("/tmp/p1.mobileprovision"),
            serials: vec!["S1".to_string(), "S2".to_string()],
        };
        assert!(profile.references("S1"));
        assert!(profile.references("S2"));
        assert!(!profile.references("S3"));
        assert!(!profile.references("S"));
    }

    #[test]
    fn identity_dedup_is_by_id() {
        let a = SigningIdentity {
            id: "C1".to_string(),
            label: "Dev".to_string(),
            serial: "S1".to_string(),
        };
        let b = SigningIdentity {
            id: "C1".to_string(),
            label: "Dev (renewed)".to_string(),
            serial: "S2".to_string(),
        };
        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn staged_file_name_falls_back_to_id() {
        let profile = ProvisioningProfile {
            id: "P1".to_string(),
            name: "App Store".to_string(),
            path: PathBuf::from("/"),
            serials: vec!["S1".to_string()],
        };
        assert_eq!(profile.staged_file_name(), "P1.mobileprovision");
    }
}
