//! Delete-duplicates: remove every group member except the keeper.
//!
//! # Overview
//!
//! [`DuplicateDeleter`] walks the duplicate groups in order and removes all
//! members but the first. Every target gets a [`DeleteOutcome`]; failures
//! are folded into warnings and never stop the batch.
//!
//! # Safety
//!
//! - A group whose keeper no longer exists is left untouched, so the last
//!   copy of a file is never removed.
//! - A target whose size differs from the size captured at scan time is
//!   skipped as modified.
//! - A target that is already gone is reported as
//!   [`DeleteStatus::AlreadyAbsent`], which makes a second run over the same
//!   result harmless.
//!
//! # Example
//!
//! ```no_run
//! use filesift::actions::delete::{permanent_delete, delete_to_trash};
//! use std::path::Path;
//!
//! match delete_to_trash(Path::new("/path/to/duplicate.txt")) {
//!     Ok(result) => println!("Moved to trash: {}", result.path.display()),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duplicates::DuplicateGroup;
use crate::error::{Warning, WarningKind};
use crate::progress::ProgressTracker;
use crate::scanner::MatchedFile;

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File size changed since the scan.
    #[error("file modified since scan: {path} (size {expected} -> {actual})")]
    Modified {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed { path: PathBuf, message: String },

    /// Permanent delete operation failed.
    #[error("permanent delete failed for {path}: {message}")]
    PermanentDeleteFailed { path: PathBuf, message: String },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Modified { path: p, .. }
            | Self::TrashFailed { path: p, .. }
            | Self::PermanentDeleteFailed { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }

    fn from_metadata_error(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// How a duplicate is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMethod {
    /// `remove_file`, not recoverable
    #[default]
    Permanent,
    /// Move to the system trash
    Trash,
}

impl fmt::Display for DeleteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permanent => write!(f, "permanent"),
            Self::Trash => write!(f, "trash"),
        }
    }
}

/// Result of a successful single-file deletion.
#[derive(Debug, Clone)]
pub struct DeleteResult {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Size of the deleted file in bytes.
    pub size: u64,
    /// Whether deletion was permanent (true) or to trash (false).
    pub permanent: bool,
}

/// Configuration for delete-duplicates.
#[derive(Debug, Clone)]
pub struct DeleteConfig {
    /// Permanent removal or system trash.
    pub method: DeleteMethod,
    /// Skip targets whose size changed since the scan.
    pub verify_size: bool,
}

impl Default for DeleteConfig {
    fn default() -> Self {
        Self {
            method: DeleteMethod::Permanent,
            verify_size: true,
        }
    }
}

impl DeleteConfig {
    /// Create config for permanent deletion.
    #[must_use]
    pub fn permanent() -> Self {
        Self::default()
    }

    /// Create config for trash deletion.
    #[must_use]
    pub fn trash() -> Self {
        Self {
            method: DeleteMethod::Trash,
            ..Self::default()
        }
    }

    /// Enable/disable the size check before deletion.
    #[must_use]
    pub fn with_verify_size(mut self, verify: bool) -> Self {
        self.verify_size = verify;
        self
    }
}

/// What happened to one delete target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStatus {
    /// The file was removed.
    Deleted,
    /// The file was already gone.
    AlreadyAbsent,
    /// The file could not be removed, or was skipped as modified.
    Failed,
}

/// Per-file outcome of delete-duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    /// Target path
    pub path: PathBuf,
    /// Group the target belonged to
    pub group_id: usize,
    /// What happened
    pub status: DeleteStatus,
    /// Failure detail, if any
    pub message: Option<String>,
}

/// Results of a delete-duplicates run.
#[derive(Debug, Clone, Default)]
pub struct BatchDeleteResult {
    /// One entry per attempted target, in group order.
    pub outcomes: Vec<DeleteOutcome>,
    /// Warnings for absent, failed and skipped targets.
    pub warnings: Vec<Warning>,
    /// Total bytes freed.
    pub bytes_freed: u64,
    /// Groups left untouched because their keeper was missing.
    pub skipped_groups: usize,
}

impl BatchDeleteResult {
    fn count(&self, status: DeleteStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Number of files removed.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.count(DeleteStatus::Deleted)
    }

    /// Number of targets that were already gone.
    #[must_use]
    pub fn absent_count(&self) -> usize {
        self.count(DeleteStatus::AlreadyAbsent)
    }

    /// Number of failed or skipped targets.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.count(DeleteStatus::Failed)
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Deleted {} file(s), freed {} bytes",
            self.deleted_count(),
            self.bytes_freed
        );
        if self.absent_count() > 0 {
            summary.push_str(&format!(", {} already absent", self.absent_count()));
        }
        if self.failure_count() > 0 {
            summary.push_str(&format!(", {} failed", self.failure_count()));
        }
        summary
    }
}

/// Delete a single file to the system trash.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if its metadata cannot be read
/// - `TrashFailed` if the trash operation fails
pub fn delete_to_trash(path: &Path) -> Result<DeleteResult, DeleteError> {
    let metadata =
        fs::metadata(path).map_err(|e| DeleteError::from_metadata_error(path, e))?;
    let size = metadata.len();

    trash::delete(path).map_err(|e| {
        log::error!("Trash operation failed for {}: {}", path.display(), e);
        DeleteError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::info!("Moved to trash: {} ({} bytes)", path.display(), size);
    Ok(DeleteResult {
        path: path.to_path_buf(),
        size,
        permanent: false,
    })
}

/// Permanently delete a single file.
///
/// **WARNING**: This operation cannot be undone.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if its metadata cannot be read
/// - `PermanentDeleteFailed` if the removal fails
pub fn permanent_delete(path: &Path) -> Result<DeleteResult, DeleteError> {
    let metadata =
        fs::metadata(path).map_err(|e| DeleteError::from_metadata_error(path, e))?;
    let size = metadata.len();

    fs::remove_file(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            return DeleteError::NotFound(path.to_path_buf());
        }
        log::error!("Permanent delete failed for {}: {}", path.display(), e);
        DeleteError::PermanentDeleteFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::info!("Permanently deleted: {} ({} bytes)", path.display(), size);
    Ok(DeleteResult {
        path: path.to_path_buf(),
        size,
        permanent: true,
    })
}

/// Check that a file still has the size recorded at scan time.
///
/// # Errors
///
/// `Modified` on a size mismatch, or the metadata error if the file cannot be
/// inspected.
pub fn verify_unchanged(file: &MatchedFile) -> Result<(), DeleteError> {
    let actual = fs::metadata(&file.path)
        .map_err(|e| DeleteError::from_metadata_error(&file.path, e))?
        .len();
    if actual != file.size {
        log::warn!(
            "File modified since scan: {} (size changed from {} to {})",
            file.path.display(),
            file.size,
            actual
        );
        return Err(DeleteError::Modified {
            path: file.path.clone(),
            expected: file.size,
            actual,
        });
    }
    Ok(())
}

/// Removes every duplicate but the keeper, group by group.
#[derive(Debug, Default)]
pub struct DuplicateDeleter {
    config: DeleteConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress: Option<Arc<ProgressTracker>>,
}

impl DuplicateDeleter {
    /// Create a deleter with the given configuration.
    #[must_use]
    pub fn new(config: DeleteConfig) -> Self {
        Self {
            config,
            shutdown_flag: None,
            progress: None,
        }
    }

    /// Set the shutdown flag; the batch stops before the next target once raised.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Advance a progress tracker once per target.
    #[must_use]
    pub fn with_progress(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.progress = Some(tracker);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Number of targets a run over `groups` will visit.
    #[must_use]
    pub fn target_count(groups: &[DuplicateGroup]) -> usize {
        groups.iter().map(|g| g.duplicates().len()).sum()
    }

    /// Delete all non-keeper members of every group.
    pub fn run(&self, groups: &[DuplicateGroup]) -> BatchDeleteResult {
        let mut result = BatchDeleteResult::default();
        log::info!(
            "Deleting {} duplicate(s) from {} group(s) ({})",
            Self::target_count(groups),
            groups.len(),
            self.config.method
        );

        'groups: for group in groups {
            let keeper = group.keeper();
            if fs::symlink_metadata(&keeper.path).is_err() {
                log::warn!(
                    "Keeper of group {} is missing, leaving group untouched: {}",
                    group.id,
                    keeper.path.display()
                );
                result.warnings.push(Warning::new(
                    WarningKind::FileWrite,
                    &keeper.path,
                    format!("keeper of group {} is missing; no member deleted", group.id),
                ));
                result.skipped_groups += 1;
                self.advance(group.duplicates().len());
                continue;
            }

            for target in group.duplicates() {
                if self.is_shutdown_requested() {
                    log::debug!("Delete interrupted");
                    break 'groups;
                }
                let outcome = self.delete_one(group.id, target, &mut result);
                result.outcomes.push(outcome);
                self.advance(1);
            }
        }

        log::info!("{}", result.summary());
        result
    }

    fn delete_one(
        &self,
        group_id: usize,
        target: &MatchedFile,
        result: &mut BatchDeleteResult,
    ) -> DeleteOutcome {
        let checked = if self.config.verify_size {
            verify_unchanged(target)
        } else {
            Ok(())
        };
        let attempt = checked.and_then(|()| match self.config.method {
            DeleteMethod::Permanent => permanent_delete(&target.path),
            DeleteMethod::Trash => delete_to_trash(&target.path),
        });

        let (status, message) = match attempt {
            Ok(deleted) => {
                result.bytes_freed += deleted.size;
                (DeleteStatus::Deleted, None)
            }
            Err(DeleteError::NotFound(_)) => {
                log::debug!("Already absent: {}", target.path.display());
                result.warnings.push(Warning::new(
                    WarningKind::AlreadyAbsent,
                    &target.path,
                    "already absent",
                ));
                (DeleteStatus::AlreadyAbsent, None)
            }
            Err(e) => {
                log::warn!("Failed to delete {}: {}", target.path.display(), e);
                result.warnings.push(Warning::write(&target.path, &e));
                (DeleteStatus::Failed, Some(e.to_string()))
            }
        };

        DeleteOutcome {
            path: target.path.clone(),
            group_id,
            status,
            message,
        }
    }

    fn advance(&self, n: usize) {
        if let Some(ref tracker) = self.progress {
            tracker.advance(n);
        }
    }
}

/// Delete every duplicate but the keeper with the given configuration.
pub fn delete_duplicates(groups: &[DuplicateGroup], config: &DeleteConfig) -> BatchDeleteResult {
    DuplicateDeleter::new(config.clone()).run(groups)
}
