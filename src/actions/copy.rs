//! Copy-all: gather every matched file into one folder.
//!
//! Files are copied flat into the destination, so two sources from different
//! directories can share a base name. [`CollisionPolicy`] decides what
//! happens then. Per-file failures become warnings; the batch always runs to
//! the end unless cancelled.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use filetime::FileTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Warning;
use crate::progress::ProgressTracker;
use crate::scanner::MatchedFile;

/// Default name of the copy folder under the scan root.
pub const DEFAULT_COPY_DIR: &str = "copied_files";

/// What to do when two files in one batch share a base name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Later files get a ` (n)` suffix before the extension.
    #[default]
    Rename,
    /// Later files replace earlier ones.
    Overwrite,
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rename => write!(f, "rename"),
            Self::Overwrite => write!(f, "overwrite"),
        }
    }
}

/// Errors from copy-all.
#[derive(Debug, Error)]
pub enum CopyError {
    /// The destination folder could not be created.
    #[error("cannot create copy folder {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The destination exists but is not a directory.
    #[error("copy destination is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A single file could not be copied.
    #[error("cannot copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Results of a copy-all run.
#[derive(Debug, Clone, Default)]
pub struct BatchCopyResult {
    /// Destination of every successful copy, in input order.
    pub copied: Vec<PathBuf>,
    /// Sources that already were their destination.
    pub skipped: usize,
    /// One warning per failed file.
    pub warnings: Vec<Warning>,
    /// Total bytes written.
    pub bytes_copied: u64,
}

impl BatchCopyResult {
    /// Number of files copied.
    #[must_use]
    pub fn copied_count(&self) -> usize {
        self.copied.len()
    }
}

/// Copies matched files into a single folder.
#[derive(Debug)]
pub struct Copier {
    destination: PathBuf,
    policy: CollisionPolicy,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress: Option<Arc<ProgressTracker>>,
}

impl Copier {
    /// Create a copier writing into `destination`.
    #[must_use]
    pub fn new(destination: PathBuf, policy: CollisionPolicy) -> Self {
        Self {
            destination,
            policy,
            shutdown_flag: None,
            progress: None,
        }
    }

    /// Set the shutdown flag; the batch stops before the next file once raised.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Advance a progress tracker once per file.
    #[must_use]
    pub fn with_progress(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.progress = Some(tracker);
        self
    }

    /// The destination folder.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Copy every file into the destination folder, creating it if needed.
    ///
    /// # Errors
    ///
    /// Fails only when the destination folder cannot be prepared. Per-file
    /// failures are returned as warnings in the result.
    pub fn copy_all(&self, files: &[MatchedFile]) -> Result<BatchCopyResult, CopyError> {
        self.prepare_destination()?;
        log::info!(
            "Copying {} files to {} (collisions: {})",
            files.len(),
            self.destination.display(),
            self.policy
        );

        let mut result = BatchCopyResult::default();
        let mut used_names: HashSet<String> = HashSet::new();

        for file in files {
            if self.is_shutdown_requested() {
                log::debug!("Copy interrupted");
                break;
            }
            let Some(name) = file.path.file_name() else {
                self.advance();
                continue;
            };
            let target = self.target_for(name, &mut used_names);

            if target == file.path {
                log::debug!("Source already in copy folder: {}", file.path.display());
                result.skipped += 1;
                self.advance();
                continue;
            }

            match fs::copy(&file.path, &target) {
                Ok(bytes) => {
                    if let Err(e) = copy_times(&file.path, &target) {
                        log::warn!("Cannot keep timestamps on {}: {}", target.display(), e);
                    }
                    log::debug!("Copied {} -> {}", file.path.display(), target.display());
                    result.bytes_copied += bytes;
                    result.copied.push(target);
                }
                Err(source) => {
                    let err = CopyError::Copy {
                        from: file.path.clone(),
                        to: target,
                        source,
                    };
                    log::warn!("{}", err);
                    result.warnings.push(Warning::write(&file.path, &err));
                }
            }
            self.advance();
        }

        log::info!(
            "Copied {} file(s), {} bytes, {} failed",
            result.copied_count(),
            result.bytes_copied,
            result.warnings.len()
        );
        Ok(result)
    }

    fn prepare_destination(&self) -> Result<(), CopyError> {
        match fs::metadata(&self.destination) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(CopyError::NotADirectory(self.destination.clone())),
            Err(_) => {
                log::debug!("Creating copy folder {}", self.destination.display());
                fs::create_dir_all(&self.destination).map_err(|source| CopyError::CreateDir {
                    path: self.destination.clone(),
                    source,
                })
            }
        }
    }

    /// Pick the destination path for `name`, applying the collision policy.
    ///
    /// Names are compared case-insensitively so the result is the same on
    /// case-folding filesystems.
    fn target_for(&self, name: &std::ffi::OsStr, used: &mut HashSet<String>) -> PathBuf {
        let base = Path::new(name);
        if self.policy == CollisionPolicy::Overwrite {
            return self.destination.join(base);
        }

        let mut candidate = name.to_os_string();
        let mut n = 1;
        while !used.insert(candidate.to_string_lossy().to_lowercase()) {
            candidate = numbered_name(base, n);
            n += 1;
        }
        self.destination.join(candidate)
    }

    fn advance(&self) {
        if let Some(ref tracker) = self.progress {
            tracker.advance(1);
        }
    }
}

/// `photo.jpg` -> `photo (n).jpg`; `README` -> `README (n)`.
fn numbered_name(base: &Path, n: usize) -> OsString {
    let stem = base.file_stem().unwrap_or(base.as_os_str());
    let mut name = stem.to_os_string();
    name.push(format!(" ({n})"));
    if let Some(ext) = base.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Copy every file into `destination` with the given collision policy.
///
/// # Errors
///
/// See [`Copier::copy_all`].
pub fn copy_all(
    files: &[MatchedFile],
    destination: &Path,
    policy: CollisionPolicy,
) -> Result<BatchCopyResult, CopyError> {
    Copier::new(destination.to_path_buf(), policy).copy_all(files)
}

/// Give `to` the access and modification times of `from`.
fn copy_times(from: &Path, to: &Path) -> io::Result<()> {
    let meta = fs::metadata(from)?;
    filetime::set_file_times(
        to,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
}
