//! Layered stager configuration
//!
//! Built-in defaults, then an optional `.signing-stager.toml`, then CLI
//! flags applied by the caller. Every field has a working default; the
//! config file only overrides.

use serde::Deserialize;
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::package::DEFAULT_PACKAGE_NAME;
use crate::staging::STAGING_PREFIX;

/// Conventional config file name in the invocation directory
pub const CONFIG_FILE_NAME: &str = ".signing-stager.toml";

/// Errors loading the config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// On-disk config file shape; every field optional
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub package_name: Option<String>,
    pub staging_prefix: Option<String>,
    pub verbose: Option<bool>,
}

/// Effective configuration after merging
#[derive(Debug, Clone)]
pub struct StagerConfig {
    /// Archive file name inside the staging area
    pub package_name: String,

    /// Staging directory-name prefix under the system temp root
    pub staging_prefix: String,

    /// Echo debug-level progress to stderr
    pub verbose: bool,
}

impl Default for StagerConfig {
    fn default() -> Self {
        Self {
            package_name: DEFAULT_PACKAGE_NAME.to_string(),
            staging_prefix: STAGING_PREFIX.to_string(),
            verbose: false,
        }
    }
}

impl StagerConfig {
    /// Load from an explicit config file path
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&content)?;
        Ok(Self::default().merge(file))
    }

    /// Load the conventional config file from `dir` when present,
    /// defaults otherwise
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    fn merge(mut self, file: ConfigFile) -> Self {
        if let Some(name) = file.package_name {
            self.package_name = name;
        }
        if let Some(prefix) = file.staging_prefix {
            self.staging_prefix = prefix;
        }
        if let Some(verbose) = file.verbose {
            self.verbose = verbose;
        }
        self
    }

    /// CLI override for the package name
    pub fn with_package_name(mut self, name: impl Into<String>) -> Self {
        self.package_name = name.into();
        self
    }

    /// CLI override for verbosity
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
