//! Warning taxonomy, structured errors and exit codes.
//!
//! Per-file failures never abort a scan. They are folded into [`Warning`]
//! values that travel with the [`ScanResult`](crate::orchestrator::ScanResult)
//! back to the caller. Only configuration-level and whole-phase failures are
//! fatal, see [`ScanFailure`](crate::orchestrator::ScanFailure).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Exit codes for the filesift binary.
///
/// - 0: Success (completed without warnings)
/// - 1: General error (unexpected failure, report could not be written)
/// - 2: Invalid input (bad root, missing suffix, contradictory flags)
/// - 3: Partial success (completed, but some files produced warnings)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Scan, actions and report completed without warnings.
    Success = 0,
    /// General error: an unexpected or whole-phase failure occurred.
    GeneralError = 1,
    /// The scan request was rejected before any I/O.
    InvalidInput = 2,
    /// Completed, but per-file warnings were collected.
    PartialSuccess = 3,
    /// Interrupted: the scan was cancelled by the user.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "FS000",
            Self::GeneralError => "FS001",
            Self::InvalidInput => "FS002",
            Self::PartialSuccess => "FS003",
            Self::Interrupted => "FS130",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "FS001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}

/// Category of a non-fatal, per-file problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A file could not be read during the walk or while hashing.
    FileRead,
    /// A copy or delete of a single file failed.
    FileWrite,
    /// A delete target was already gone.
    AlreadyAbsent,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileRead => write!(f, "read"),
            Self::FileWrite => write!(f, "write"),
            Self::AlreadyAbsent => write!(f, "already absent"),
        }
    }
}

/// A non-fatal problem recorded during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// What kind of failure this is
    pub kind: WarningKind,
    /// The affected file, when there is one
    pub path: Option<PathBuf>,
    /// Human-readable detail
    pub message: String,
}

impl Warning {
    /// Create a warning tied to a path.
    #[must_use]
    pub fn new(kind: WarningKind, path: &Path, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: Some(path.to_path_buf()),
            message: message.into(),
        }
    }

    /// Create a read warning from any displayable error.
    #[must_use]
    pub fn read(path: &Path, err: &dyn fmt::Display) -> Self {
        Self::new(WarningKind::FileRead, path, err.to_string())
    }

    /// Create a write warning from any displayable error.
    #[must_use]
    pub fn write(path: &Path, err: &dyn fmt::Display) -> Self {
        Self::new(WarningKind::FileWrite, path, err.to_string())
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "[{}] {}: {}", self.kind, path.display(), self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}
