//! Directory walker that yields files matching a suffix.
//!
//! # Overview
//!
//! [`Walker`] traverses a tree with `walkdir`, visiting directory entries in
//! file-name order so that traversal order (and therefore which duplicate is
//! "first") is reproducible. Symbolic links are not followed unless
//! configured; when they are, loops are detected and reported instead of
//! recursed into.
//!
//! Two passes are offered:
//! - [`Walker::count_candidates`] counts every regular file, to size a
//!   progress indicator
//! - [`Walker::walk`] lazily yields the matching files, advancing an optional
//!   [`ProgressTracker`] once per regular file it inspects
//!
//! Per-entry failures are yielded as [`ScanError`] values and never stop the
//! walk.
//!
//! # Example
//!
//! ```no_run
//! use filesift::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Documents"), WalkerConfig::new("pdf").unwrap());
//! let total = walker.count_candidates();
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("{} of {} files are PDFs", files.len(), total);
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use walkdir::{DirEntry, WalkDir};

use super::{MatchedFile, ScanError, WalkerConfig};
use crate::progress::ProgressTracker;

/// Directory walker for suffix-filtered file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress sink, advanced once per regular file
    progress: Option<Arc<ProgressTracker>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
            progress: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set, iteration stops before the next entry.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Report each inspected regular file to a progress tracker.
    #[must_use]
    pub fn with_progress(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.progress = Some(tracker);
        self
    }

    /// The walker configuration.
    #[must_use]
    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// All entries under the root in file-name order, minus excluded subtrees.
    fn entries(&self) -> impl Iterator<Item = walkdir::Result<DirEntry>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                let excluded = entry.file_type().is_dir() && self.config.is_excluded(entry.path());
                if excluded {
                    log::debug!("Skipping excluded directory: {}", entry.path().display());
                }
                !excluded
            })
    }

    /// Count the regular files under the root, matching or not.
    ///
    /// Unreadable entries are skipped silently here; [`Walker::walk`] reports
    /// them. The count is best-effort if the tree changes in between.
    #[must_use]
    pub fn count_candidates(&self) -> usize {
        let count = self
            .entries()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .count();
        log::debug!("Counted {} candidate files under {}", count, self.root.display());
        count
    }

    /// Walk the directory tree, yielding matching files.
    ///
    /// Returns a one-shot iterator. Errors are yielded as [`ScanError`]
    /// values rather than stopping iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<MatchedFile, ScanError>> + '_ {
        self.entries()
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    false
                } else {
                    true
                }
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    // Symlinks that were not followed report as symlinks, not files.
                    if !entry.file_type().is_file() {
                        if entry.path_is_symlink() {
                            log::trace!("Skipping symlink: {}", entry.path().display());
                        }
                        return None;
                    }
                    self.advance_progress();

                    let name = entry.file_name().to_string_lossy();
                    if !self.config.matches(&name) {
                        log::trace!("Not matching suffix: {}", entry.path().display());
                        return None;
                    }

                    Some(match entry.metadata() {
                        Ok(metadata) => Ok(self.make_entry(entry.into_path(), &metadata)),
                        Err(e) => Err(self.handle_walkdir_error(e)),
                    })
                }
                Err(e) => Some(Err(self.handle_walkdir_error(e))),
            })
    }

    fn advance_progress(&self) {
        if let Some(ref tracker) = self.progress {
            tracker.advance(1);
        }
    }

    fn make_entry(&self, path: PathBuf, metadata: &std::fs::Metadata) -> MatchedFile {
        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        log::trace!("Matched: {} ({} bytes)", path.display(), metadata.len());
        MatchedFile::new(path, metadata.len(), created)
    }

    /// Convert a walkdir error to a [`ScanError`].
    fn handle_walkdir_error(&self, error: walkdir::Error) -> ScanError {
        use std::io::ErrorKind;

        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        if let Some(ancestor) = error.loop_ancestor() {
            log::warn!(
                "Symlink loop at {} (points to {})",
                path.display(),
                ancestor.display()
            );
            return ScanError::Loop(path);
        }

        match error.io_error().map(std::io::Error::kind) {
            Some(ErrorKind::PermissionDenied) => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path)
            }
            Some(ErrorKind::NotFound) => {
                log::debug!("Entry vanished during walk: {}", path.display());
                ScanError::NotFound(path)
            }
            _ => {
                log::warn!("Walker error for {}: {}", path.display(), error);
                let source = error
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                ScanError::Io { path, source }
            }
        }
    }
}
