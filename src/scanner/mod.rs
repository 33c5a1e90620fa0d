//! Directory traversal and content hashing.
//!
//! - [`walker`]: finds files whose name ends with a suffix
//! - [`hasher`]: streaming SHA-256 file digests
//!
//! # Example
//!
//! ```no_run
//! use filesift::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig::new(".txt").unwrap();
//! let walker = Walker::new(Path::new("."), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;

pub use hasher::{hash_to_hex, Hash, Hasher, DEFAULT_BUFFER_SIZE};
pub use walker::Walker;

/// A file under the scanned root whose name satisfies the suffix filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedFile {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes at scan time
    pub size: u64,
    /// Creation time (falls back to modification time where unsupported)
    pub created: SystemTime,
}

impl MatchedFile {
    /// Create a new MatchedFile.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, created: SystemTime) -> Self {
        Self {
            path,
            size,
            created,
        }
    }

    /// The base name of the file as a lossy string.
    #[must_use]
    pub fn file_name_lossy(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Lower-cased suffix, always starting with a dot.
    suffix: String,
    /// Follow symbolic links during traversal.
    /// Loops are detected and reported as errors.
    pub follow_symlinks: bool,
    /// Directories whose subtrees are never entered
    pub exclude_dirs: Vec<PathBuf>,
}

impl WalkerConfig {
    /// Create a walker configuration for the given file-type suffix.
    ///
    /// The suffix is trimmed, a leading dot is added when absent, and it is
    /// lower-cased for case-insensitive comparison.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidSuffix`] when the suffix is empty.
    pub fn new(suffix: &str) -> Result<Self, InvalidSuffix> {
        Ok(Self {
            suffix: normalize_suffix(suffix)?,
            follow_symlinks: false,
            exclude_dirs: Vec::new(),
        })
    }

    /// Enable or disable following symbolic links.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Never descend into `dir` (compared by path, as walked).
    #[must_use]
    pub fn with_excluded_dir(mut self, dir: PathBuf) -> Self {
        self.exclude_dirs.push(dir);
        self
    }

    /// Whether a directory is one of the excluded subtrees.
    #[must_use]
    pub fn is_excluded(&self, dir: &Path) -> bool {
        self.exclude_dirs.iter().any(|excluded| excluded == dir)
    }

    /// The normalized suffix.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Whether a file name ends with the configured suffix, ignoring case.
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        file_name.to_lowercase().ends_with(&self.suffix)
    }
}

/// The suffix filter was empty.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("file type suffix must not be empty")]
pub struct InvalidSuffix;

/// Normalize a user-supplied file type: trim, add a leading dot, lower-case.
///
/// ```
/// use filesift::scanner::normalize_suffix;
///
/// assert_eq!(normalize_suffix("TXT").unwrap(), ".txt");
/// assert_eq!(normalize_suffix(" .Pdf ").unwrap(), ".pdf");
/// assert!(normalize_suffix("  ").is_err());
/// ```
///
/// # Errors
///
/// Returns [`InvalidSuffix`] when nothing is left after trimming (a lone `.`
/// counts as empty).
pub fn normalize_suffix(raw: &str) -> Result<String, InvalidSuffix> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "." {
        return Err(InvalidSuffix);
    }
    let lowered = trimmed.to_lowercase();
    if lowered.starts_with('.') {
        Ok(lowered)
    } else {
        Ok(format!(".{lowered}"))
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The entry vanished between listing and inspection.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// A symbolic link points back into one of its ancestors.
    #[error("Symlink loop: {0}")]
    Loop(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// The path the error refers to.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::PermissionDenied(p) | Self::NotFound(p) | Self::Loop(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error for the given path.
    #[must_use]
    pub fn from_io(path: &std::path::Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}
