//! Mutual-reference correlation of profiles and identities
//!
//! Keeps only the profiles that reference at least one collected
//! identity's serial and the identities whose serial at least one
//! collected profile references. Pure; the emptiness check belongs to
//! the packaging stage, not here.

use serde::Serialize;
use std::collections::HashSet;

use crate::artifact::{ProvisioningProfile, SigningIdentity};

/// A single observed reference between an identity and a profile,
/// recorded before deduplication for diagnostic logging
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatch {
    /// Identity whose serial the profile references
    pub identity_id: String,

    /// Profile holding the reference
    pub profile_id: String,
}

/// The mutually referenced subset of both inventories
///
/// Both collections are deduplicated by identifier. Output order is
/// unspecified; consumers must rely on membership only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CorrelationResult {
    /// Profiles referencing at least one retained identity
    pub profiles: Vec<ProvisioningProfile>,

    /// Identities referenced by at least one retained profile
    pub identities: Vec<SigningIdentity>,

    /// Every matching (identity, profile) pair, one entry per pair
    pub matches: Vec<CorrelationMatch>,
}

impl CorrelationResult {
    /// True when correlation retained nothing
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty() && self.identities.is_empty()
    }
}

/// Compute the mutually referenced subset of `profiles` and `identities`
///
/// Membership test per (profile, identity) pair; a pair matches when the
/// identity's serial appears in the profile's serial references. Empty
/// inputs yield empty results.
pub fn correlate(
    profiles: &[ProvisioningProfile],
    identities: &[SigningIdentity],
) -> CorrelationResult {
    let mut kept_profiles = Vec::new();
    let mut kept_identities = Vec::new();
    let mut matches = Vec::new();
    let mut profile_ids: HashSet<&str> = HashSet::new();
    let mut identity_ids: HashSet<&str> = HashSet::new();

    for profile in profiles {
        for identity in identities {
            if !profile.references(&identity.serial) {
                continue;
            }
            matches.push(CorrelationMatch {
                identity_id: identity.id.clone(),
                profile_id: profile.id.clone(),
            });
            if profile_ids.insert(&profile.id) {
                kept_profiles.push(profile.clone());
            }
            if identity_ids.insert(&identity.id) {
                kept_identities.push(identity.clone());
            }
        }
    }

    CorrelationResult {
        profiles: kept_profiles,
        identities: kept_identities,
        matches,
    }
}
