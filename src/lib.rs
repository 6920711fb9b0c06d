//! Signing Stager - CI signing-file staging pipeline
//!
//! This crate collects a device's code-signing material (provisioning
//! profiles and codesigning identities), keeps the subset of each that
//! the other references, and stages it into a single upload package for
//! a CI pipeline, together with the run's diagnostic log. The staging
//! directory is torn down on every exit path.

pub mod artifact;
pub mod config;
pub mod correlate;
pub mod logging;
pub mod mock;
pub mod package;
pub mod pipeline;
pub mod source;
pub mod staging;

pub use artifact::{ProvisioningProfile, SigningIdentity};
pub use correlate::{correlate, CorrelationResult};
pub use logging::DiagnosticLog;
pub use pipeline::{Pipeline, RunOutcome, RunReport, RunState};
