//! Pipeline orchestration
//!
//! Run states: START → COLLECTING → CORRELATING → STAGING → PACKAGING →
//! {SUCCEEDED | ABORTED}. Staging teardown runs as a guaranteed
//! finalizer from either terminal state and its failure never reverses
//! the decided outcome.
//!
//! Every stage failure is caught here, logged with context, and
//! collapsed into a single aborted outcome; callers observe only the
//! [`RunReport`], never a stage-specific error.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::StagerConfig;
use crate::correlate::correlate;
use crate::logging::DiagnosticLog;
use crate::package::{PackageBuilder, PackageConfig, PackageError, PackageReceipt};
use crate::source::{
    CollectError, IdentitySource, NoopUploader, ProfileSource, UploadError, Uploader,
};
use crate::staging::{StagingArea, StagingError};

static NOOP_UPLOADER: NoopUploader = NoopUploader;

/// Pipeline run states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// Run created, nothing collected yet
    Start,
    /// Invoking the profile and identity sources
    Collecting,
    /// Computing the mutually referenced subset
    Correlating,
    /// Creating the staging directory
    Staging,
    /// Building the upload package
    Packaging,
    /// Package is ready (delivery is a separate concern)
    Succeeded,
    /// A stage failed; the run was aborted
    Aborted,
}

impl RunState {
    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Aborted)
    }

    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: RunState) -> bool {
        match (self, target) {
            (RunState::Start, RunState::Collecting) => true,
            (RunState::Collecting, RunState::Correlating) => true,
            (RunState::Correlating, RunState::Staging) => true,
            (RunState::Staging, RunState::Packaging) => true,
            (RunState::Packaging, RunState::Succeeded) => true,
            // Any non-terminal state can abort
            (state, RunState::Aborted) => !state.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Start => "START",
            RunState::Collecting => "COLLECTING",
            RunState::Correlating => "CORRELATING",
            RunState::Staging => "STAGING",
            RunState::Packaging => "PACKAGING",
            RunState::Succeeded => "SUCCEEDED",
            RunState::Aborted => "ABORTED",
        };
        write!(f, "{name}")
    }
}

/// What a finished run decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunOutcome {
    Succeeded,
    Aborted,
}

/// Everything a caller learns about a run
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub outcome: RunOutcome,
    pub profiles_collected: usize,
    pub identities_collected: usize,
    pub profiles_correlated: usize,
    pub identities_correlated: usize,

    /// Present only on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageReceipt>,

    /// Human description of what aborted the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,

    /// Teardown failure, reported but never reversing the outcome
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup_failure: Option<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == RunOutcome::Succeeded
    }
}

/// Internal abort cause; never escapes past `run`
#[derive(Debug, Error)]
enum StageError {
    #[error("failed to collect signing artifacts: {0}")]
    Collect(#[from] CollectError),

    #[error("failed to prepare environment: {0}")]
    Environment(#[from] StagingError),

    #[error("failed to prepare upload package: {0}")]
    Packaging(#[from] PackageError),

    #[error("failed to deliver upload package: {0}")]
    Upload(#[from] UploadError),
}

#[derive(Debug, Default)]
struct Tally {
    profiles_collected: usize,
    identities_collected: usize,
    profiles_correlated: usize,
    identities_correlated: usize,
}

/// Sequences collection, correlation, staging and packaging for one run
pub struct Pipeline<'a> {
    config: StagerConfig,
    profiles: &'a dyn ProfileSource,
    identities: &'a dyn IdentitySource,
    uploader: &'a dyn Uploader,
    log: &'a DiagnosticLog,
    state: RunState,
    staging_root: PathBuf,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: StagerConfig,
        profiles: &'a dyn ProfileSource,
        identities: &'a dyn IdentitySource,
        log: &'a DiagnosticLog,
    ) -> Self {
        Self {
            config,
            profiles,
            identities,
            uploader: &NOOP_UPLOADER,
            log,
            state: RunState::Start,
            staging_root: std::env::temp_dir(),
        }
    }

    /// Replace the delivery stub
    pub fn with_uploader(mut self, uploader: &'a dyn Uploader) -> Self {
        self.uploader = uploader;
        self
    }

    /// Root directory for the staging area, overridable for testing
    pub fn with_staging_root(mut self, root: PathBuf) -> Self {
        self.staging_root = root;
        self
    }

    /// Current state of the run
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute one full run
    ///
    /// Never returns an error: every failure is decided into the
    /// report's aborted outcome, and staging teardown runs regardless.
    pub fn run(&mut self) -> RunReport {
        let started_at = Utc::now();
        let run_id = ulid::Ulid::new().to_string().to_lowercase();
        self.log.info("Preparing to collect signing files");
        self.log.debug(format!("Run {run_id} starting"));

        let mut tally = Tally::default();
        let mut staging = None;
        let result = self.execute(&run_id, &mut staging, &mut tally);

        let (outcome, package, failure) = match result {
            Ok(receipt) => {
                self.transition(RunState::Succeeded);
                self.log.info("Signing file collection complete");
                self.log.info("Please return to the CI dashboard to continue");
                (RunOutcome::Succeeded, Some(receipt), None)
            }
            Err(err) => {
                self.log.error(err.to_string());
                self.transition(RunState::Aborted);
                self.log.error("Signing file collection failed. Aborting");
                if self.log.path().exists() {
                    self.log.info(format!(
                        "You can find the debug log at {}",
                        self.log.path().display()
                    ));
                    self.log.info("Please attach it when opening a support ticket");
                }
                (RunOutcome::Aborted, None, Some(err.to_string()))
            }
        };

        let cleanup_failure = self.cleanup(staging);
        self.log.flush();

        RunReport {
            run_id,
            outcome,
            profiles_collected: tally.profiles_collected,
            identities_collected: tally.identities_collected,
            profiles_correlated: tally.profiles_correlated,
            identities_correlated: tally.identities_correlated,
            package,
            failure,
            cleanup_failure,
            started_at,
            finished_at: Utc::now(),
        }
    }

    fn execute(
        &mut self,
        run_id: &str,
        staging_slot: &mut Option<StagingArea>,
        tally: &mut Tally,
    ) -> Result<PackageReceipt, StageError> {
        self.transition(RunState::Collecting);
        let profiles = self.profiles.collect()?;
        self.log.debug(format!(
            "Collected {} provisioning profile(s)",
            profiles.len()
        ));
        let identities = self.identities.collect()?;
        self.log.debug(format!(
            "Collected {} codesigning identity(ies)",
            identities.len()
        ));
        tally.profiles_collected = profiles.len();
        tally.identities_collected = identities.len();

        self.transition(RunState::Correlating);
        self.log
            .info("Matching provisioning profiles and codesigning identities");
        let correlated = correlate(&profiles, &identities);
        for m in &correlated.matches {
            self.log.debug(format!(
                "Identity {} matches profile {}",
                m.identity_id, m.profile_id
            ));
        }
        self.log.debug(format!(
            "Retained {} profile(s) and {} identity(ies)",
            correlated.profiles.len(),
            correlated.identities.len()
        ));
        tally.profiles_correlated = correlated.profiles.len();
        tally.identities_correlated = correlated.identities.len();

        self.transition(RunState::Staging);
        let staging = StagingArea::create_under(
            &self.staging_root,
            &self.config.staging_prefix,
            run_id,
        )?;
        self.log
            .debug(format!("Staging directory {}", staging.path().display()));
        let staging = staging_slot.insert(staging);

        self.transition(RunState::Packaging);
        let builder = PackageBuilder::new(PackageConfig {
            package_name: self.config.package_name.clone(),
        });
        let receipt = builder.build(staging, &correlated.profiles, self.log)?;
        self.uploader.upload(&receipt)?;
        Ok(receipt)
    }

    /// Guaranteed teardown; reports failure without changing the outcome
    fn cleanup(&self, staging: Option<StagingArea>) -> Option<String> {
        let staging = staging?;
        self.log.info("Cleaning up");
        self.log.info(format!(
            "Removing staging directory {}",
            staging.path().display()
        ));
        match staging.destroy() {
            Ok(()) => {
                self.log.debug("Staging directory removed");
                None
            }
            Err(e) => {
                self.log
                    .error(format!("Failed to clean up staging directory: {e}"));
                Some(e.to_string())
            }
        }
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        self.log.debug(format!("Entering {next}"));
        self.state = next;
    }
}
