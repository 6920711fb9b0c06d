//! Run-scoped diagnostic log
//!
//! An explicitly constructed logging context handed to the pipeline and
//! its collaborators, not process-global state. One file per run at a
//! fixed name in the invocation directory; any stale file of that name
//! is removed before the run starts. Info and error records also echo
//! to stderr for the operator.

use chrono::Utc;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Fixed diagnostic log file name, relative to the invocation directory
pub const LOG_FILE_NAME: &str = "signing_stager.log";

/// Record severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Debug => write!(f, "DEBUG"),
            Level::Info => write!(f, "INFO"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

/// Append-only log sink active for the duration of one run
pub struct DiagnosticLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    echo: bool,
    echo_debug: bool,
}

impl DiagnosticLog {
    /// Open a fresh log in `dir`, removing any stale file of the
    /// conventional name first
    pub fn open(dir: &Path) -> io::Result<Self> {
        let path = dir.join(LOG_FILE_NAME);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        // Abort messages report the absolute path
        let path = path.canonicalize().unwrap_or(path);
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
            echo: true,
            echo_debug: false,
        })
    }

    /// Disable the stderr echo of info/error records
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Echo debug records to stderr as well (verbose mode)
    pub fn with_debug_echo(mut self, echo_debug: bool) -> Self {
        self.echo_debug = echo_debug;
        self
    }

    /// Location of the log file, for packaging and abort messages
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.record(Level::Debug, message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.record(Level::Info, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.record(Level::Error, message.as_ref());
    }

    /// Flush buffered records to disk
    ///
    /// Called before the log file is appended into the package so the
    /// archive captures every record written so far.
    pub fn flush(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Delete the log file
    ///
    /// Post-run log removal exists for a future cleanup step; the
    /// pipeline deliberately never calls it, the log must outlive the
    /// run for support tickets.
    pub fn remove(self) -> io::Result<()> {
        self.flush();
        fs::remove_file(&self.path)
    }

    fn record(&self, level: Level, message: &str) {
        // A failing log sink must not abort the run
        if let Ok(mut writer) = self.writer.lock() {
            let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
            let _ = writeln!(writer, "{timestamp} {level} {message}");
        }
        if self.echo && (level >= Level::Info || self.echo_debug) {
            eprintln!("{message}");
        }
    }
}

impl Drop for DiagnosticLog {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_removes_stale_log() {
        let dir = TempDir::new().unwrap();
        let stale = dir.path().join(LOG_FILE_NAME);
        fs::write(&stale, "previous run\n").unwrap();

        let log = DiagnosticLog::open(dir.path()).unwrap().with_echo(false);
        log.info("fresh run");
        log.flush();

        let content = fs::read_to_string(log.path()).unwrap();
        assert!(!content.contains("previous run"));
        assert!(content.contains("fresh run"));
    }

    #[test]
    fn records_carry_level_and_message() {
        let dir = TempDir::new().unwrap();
        let log = DiagnosticLog::open(dir.path()).unwrap().with_echo(false);
        log.debug("checking serials");
        log.error("keychain unavailable");
        log.flush();

        let content = fs::read_to_string(log.path()).unwrap();
        assert!(content.contains("DEBUG checking serials"));
        assert!(content.contains("ERROR keychain unavailable"));
    }

    #[test]
    fn remove_deletes_the_file() {
        let dir = TempDir::new().unwrap();
        let log = DiagnosticLog::open(dir.path()).unwrap().with_echo(false);
        let path = log.path().to_path_buf();
        log.remove().unwrap();
        assert!(!path.exists());
    }
}
