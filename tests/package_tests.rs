//! Package builder tests
//!
//! Covers staging of correlated profiles, suffix-based enumeration,
//! the zero-artifact hard failure, and archive contents (signing files
//! plus the diagnostic log).

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use signing_stager::artifact::ProvisioningProfile;
use signing_stager::logging::DiagnosticLog;
use signing_stager::package::{PackageBuilder, PackageConfig, PackageError, DEFAULT_PACKAGE_NAME};
use signing_stager::staging::StagingArea;
use tempfile::TempDir;

fn profile_with_file(dir: &Path, id: &str, serials: &[&str]) -> ProvisioningProfile {
    let path = dir.join(format!("{id}.mobileprovision"));
    fs::write(&path, format!("profile payload {id}")).unwrap();
    ProvisioningProfile {
        id: id.to_string(),
        name: format!("profile {id}"),
        path,
        serials: serials.iter().map(|s| s.to_string()).collect(),
    }
}

fn quiet_log(dir: &Path) -> DiagnosticLog {
    DiagnosticLog::open(dir).unwrap().with_echo(false)
}

fn archive_entry_names(path: &Path) -> Vec<String> {
    let file = File::open(path).unwrap();
    let mut archive = tar::Archive::new(file);
    archive
        .entries()
        .unwrap()
        .map(|e| {
            e.unwrap()
                .path()
                .unwrap()
                .to_string_lossy()
                .to_string()
        })
        .collect()
}

fn staged_files(staging: &StagingArea) -> Vec<PathBuf> {
    fs::read_dir(staging.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}

// =============================================================================
// Successful builds
// =============================================================================

/// Scenario D: one correlated profile with a real file yields an
/// archive containing that file plus the diagnostic log
#[test]
fn build_packages_profile_and_log() {
    let source_dir = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    let staging_root = TempDir::new().unwrap();

    let profile = profile_with_file(source_dir.path(), "P1", &["S1"]);
    let log = quiet_log(log_dir.path());
    log.info("collection under way");
    let staging = StagingArea::create_under(staging_root.path(), "signing_stage", "d1").unwrap();

    let builder = PackageBuilder::new(PackageConfig::default());
    let receipt = builder.build(&staging, &[profile], &log).unwrap();

    assert_eq!(receipt.file_count, 1);
    assert_eq!(receipt.sha256.len(), 64);
    assert_eq!(
        receipt.path,
        staging.path().join(DEFAULT_PACKAGE_NAME)
    );
    assert!(receipt.path.is_file());

    let names = archive_entry_names(&receipt.path);
    assert!(names.contains(&"P1.mobileprovision".to_string()));
    assert!(names.contains(&"signing_stager.log".to_string()));
    assert_eq!(names.len(), 2);
}

/// Identity exports already staged as .p12 are picked up by suffix
#[test]
fn build_includes_staged_identity_exports() {
    let source_dir = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    let staging_root = TempDir::new().unwrap();

    let profile = profile_with_file(source_dir.path(), "P1", &["S1"]);
    let log = quiet_log(log_dir.path());
    let staging = StagingArea::create_under(staging_root.path(), "signing_stage", "d2").unwrap();
    fs::write(staging.path().join("dev_identity.p12"), b"identity export").unwrap();

    let builder = PackageBuilder::new(PackageConfig::default());
    let receipt = builder.build(&staging, &[profile], &log).unwrap();

    assert_eq!(receipt.file_count, 2);
    let names = archive_entry_names(&receipt.path);
    assert!(names.contains(&"dev_identity.p12".to_string()));
    assert!(names.contains(&"P1.mobileprovision".to_string()));
}

/// Files without a recognized signing suffix are not packaged
#[test]
fn build_ignores_unrelated_staged_files() {
    let source_dir = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    let staging_root = TempDir::new().unwrap();

    let profile = profile_with_file(source_dir.path(), "P1", &["S1"]);
    let log = quiet_log(log_dir.path());
    let staging = StagingArea::create_under(staging_root.path(), "signing_stage", "d3").unwrap();
    fs::write(staging.path().join("notes.txt"), b"not a signing file").unwrap();

    let builder = PackageBuilder::new(PackageConfig::default());
    let receipt = builder.build(&staging, &[profile], &log).unwrap();

    assert_eq!(receipt.file_count, 1);
    let names = archive_entry_names(&receipt.path);
    assert!(!names.contains(&"notes.txt".to_string()));
}

/// Two profiles whose source files share a base name are both staged;
/// the second gets an id-prefixed name instead of overwriting the first
#[test]
fn build_keeps_profiles_with_colliding_file_names() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    let staging_root = TempDir::new().unwrap();

    let mut first = profile_with_file(dir_a.path(), "P1", &["S1"]);
    let path_a = dir_a.path().join("embedded.mobileprovision");
    fs::rename(&first.path, &path_a).unwrap();
    first.path = path_a;

    let mut second = profile_with_file(dir_b.path(), "P2", &["S2"]);
    let path_b = dir_b.path().join("embedded.mobileprovision");
    fs::rename(&second.path, &path_b).unwrap();
    second.path = path_b;

    let log = quiet_log(log_dir.path());
    let staging = StagingArea::create_under(staging_root.path(), "signing_stage", "d5").unwrap();

    let builder = PackageBuilder::new(PackageConfig::default());
    let receipt = builder.build(&staging, &[first, second], &log).unwrap();

    assert_eq!(
        receipt.file_count, 2,
        "a correlated profile must not be silently dropped"
    );
    let names = archive_entry_names(&receipt.path);
    assert!(names.contains(&"embedded.mobileprovision".to_string()));
    assert!(names.contains(&"P2_embedded.mobileprovision".to_string()));
}

/// The configured package name overrides the default
#[test]
fn build_honors_package_name_override() {
    let source_dir = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    let staging_root = TempDir::new().unwrap();

    let profile = profile_with_file(source_dir.path(), "P1", &["S1"]);
    let log = quiet_log(log_dir.path());
    let staging = StagingArea::create_under(staging_root.path(), "signing_stage", "d4").unwrap();

    let builder = PackageBuilder::new(PackageConfig {
        package_name: "custom_upload.tar".to_string(),
    });
    let receipt = builder.build(&staging, &[profile], &log).unwrap();

    assert_eq!(receipt.path, staging.path().join("custom_upload.tar"));
    assert!(receipt.path.is_file());
}

// =============================================================================
// Failing builds
// =============================================================================

/// Zero correlated profiles is a hard failure and leaves no archive
#[test]
fn build_fails_with_no_signing_artifacts() {
    let log_dir = TempDir::new().unwrap();
    let staging_root = TempDir::new().unwrap();

    let log = quiet_log(log_dir.path());
    let staging = StagingArea::create_under(staging_root.path(), "signing_stage", "e1").unwrap();

    let builder = PackageBuilder::new(PackageConfig::default());
    let result = builder.build(&staging, &[], &log);

    assert!(matches!(result, Err(PackageError::NoSigningArtifacts)));
    assert!(
        staged_files(&staging).is_empty(),
        "no archive or temp file may remain after a failed build"
    );
}

/// A profile whose file is missing fails staging and leaves no archive
#[test]
fn build_fails_when_profile_file_is_missing() {
    let log_dir = TempDir::new().unwrap();
    let staging_root = TempDir::new().unwrap();

    let missing = ProvisioningProfile {
        id: "P1".to_string(),
        name: "ghost".to_string(),
        path: PathBuf::from("/nonexistent/p1.mobileprovision"),
        serials: vec!["S1".to_string()],
    };
    let log = quiet_log(log_dir.path());
    let staging = StagingArea::create_under(staging_root.path(), "signing_stage", "e2").unwrap();

    let builder = PackageBuilder::new(PackageConfig::default());
    let result = builder.build(&staging, &[missing], &log);

    assert!(matches!(result, Err(PackageError::Stage { .. })));
    assert!(!staging.path().join(DEFAULT_PACKAGE_NAME).exists());
}
