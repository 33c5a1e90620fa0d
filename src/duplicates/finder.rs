//! Duplicate finder: filename or full-content grouping.
//!
//! # Overview
//!
//! [`DuplicateFinder::group`] partitions the matched files into
//! [`DuplicateGroup`]s. In content mode every file is hashed exactly once on
//! a bounded rayon pool; the digests are then merged on the calling thread in
//! traversal order, so group numbering and membership do not depend on which
//! worker finishes first. The digest map is returned alongside the groups so
//! the report can reuse it instead of reading files a second time.
//!
//! # Example
//!
//! ```no_run
//! use filesift::duplicates::{DuplicateFinder, FinderConfig, GroupingMode};
//! use filesift::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::new(".jpg").unwrap());
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//!
//! let finder = DuplicateFinder::new(FinderConfig::new(GroupingMode::Content));
//! let grouping = finder.group(&files).unwrap();
//! println!("{} duplicate groups", grouping.groups.len());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::groups::{group_by_digest, group_by_filename, DuplicateGroup, GroupingStats};
use crate::error::Warning;
use crate::progress::ProgressTracker;
use crate::scanner::{Hash, HashError, Hasher, MatchedFile, DEFAULT_BUFFER_SIZE};

/// Files above this size are logged when hashing starts.
const LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Default number of hashing workers.
pub const DEFAULT_IO_THREADS: usize = 4;

/// How files are judged equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupingMode {
    /// Same base name
    #[default]
    FileName,
    /// Same SHA-256 digest
    Content,
}

/// Configuration for the grouping phase.
#[derive(Clone)]
pub struct FinderConfig {
    /// Filename or content grouping.
    pub mode: GroupingMode,
    /// Number of hashing workers. Default is 4 to avoid disk thrashing.
    pub io_threads: usize,
    /// Read buffer for the hasher.
    pub buffer_size: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress tracker, advanced once per hashed file.
    pub progress: Option<Arc<ProgressTracker>>,
}

impl fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinderConfig")
            .field("mode", &self.mode)
            .field("io_threads", &self.io_threads)
            .field("buffer_size", &self.buffer_size)
            .field("shutdown_flag", &self.shutdown_flag)
            .field("progress", &self.progress.as_ref().map(|_| "<tracker>"))
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            mode: GroupingMode::default(),
            io_threads: DEFAULT_IO_THREADS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            shutdown_flag: None,
            progress: None,
        }
    }
}

impl FinderConfig {
    /// Configuration for the given mode with default tuning.
    #[must_use]
    pub fn new(mode: GroupingMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Set the number of hashing workers (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the hasher read buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress tracker.
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
}

/// Output of the grouping phase.
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    /// Duplicate groups, numbered in discovery order
    pub groups: Vec<DuplicateGroup>,
    /// Digest of every successfully hashed file (content mode only)
    pub digests: HashMap<PathBuf, Hash>,
    /// Counters for the summary
    pub stats: GroupingStats,
    /// Files that could not be hashed
    pub warnings: Vec<Warning>,
}

/// Errors that abort the grouping phase.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was cancelled while hashing.
    #[error("Scan interrupted by user")]
    Interrupted,
}

/// Groups matched files into duplicate sets.
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Hasher,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let hasher = Hasher::new().with_buffer_size(config.buffer_size);
        Self { config, hasher }
    }

    /// Create a filename-mode finder with default settings.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Partition `files` into duplicate groups.
    ///
    /// Hash failures are recorded as warnings and the file is left out of
    /// content grouping; it remains part of the matched set.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Interrupted`] if the shutdown flag is raised
    /// while hashing.
    pub fn group(&self, files: &[MatchedFile]) -> Result<Grouping, FinderError> {
        let mut grouping = Grouping {
            stats: GroupingStats {
                total_files: files.len(),
                ..Default::default()
            },
            ..Default::default()
        };

        match self.config.mode {
            GroupingMode::FileName => {
                log::info!("Grouping {} files by name", files.len());
                grouping.groups = group_by_filename(files);
            }
            GroupingMode::Content => {
                log::info!("Hashing {} files with {} workers", files.len(), self.config.io_threads);
                let results = self.hash_all(files)?;
                for (file, result) in files.iter().zip(results) {
                    match result {
                        Ok(hash) => {
                            grouping.digests.insert(file.path.clone(), hash);
                        }
                        Err(e) => {
                            log::warn!("Hash error: {}", e);
                            grouping.warnings.push(Warning::read(&file.path, &e));
                        }
                    }
                }
                grouping.stats.files_hashed = grouping.digests.len();
                grouping.stats.hash_failures = grouping.warnings.len();
                grouping.groups = group_by_digest(files, &grouping.digests);
            }
        }

        grouping.stats.record_groups(&grouping.groups);
        log::info!(
            "Found {} duplicate groups ({} extra copies, {} bytes reclaimable)",
            grouping.stats.duplicate_groups,
            grouping.stats.duplicate_files,
            grouping.stats.reclaimable_space
        );
        Ok(grouping)
    }

    /// Hash every file, returning results in input order.
    fn hash_all(&self, files: &[MatchedFile]) -> Result<Vec<Result<Hash, HashError>>, FinderError> {
        let hash_one = |file: &MatchedFile| -> Option<Result<Hash, HashError>> {
            if self.config.is_shutdown_requested() {
                return None;
            }
            if file.size > LARGE_FILE_THRESHOLD {
                log::debug!(
                    "Hashing large file ({} MB): {}",
                    file.size / (1024 * 1024),
                    file.path.display()
                );
            }
            let result = self.hasher.full_hash(&file.path);
            if let Some(ref tracker) = self.config.progress {
                tracker.advance(1);
            }
            Some(result)
        };

        let results: Vec<Option<Result<Hash, HashError>>> =
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.io_threads)
                .build()
            {
                Ok(pool) => pool.install(|| files.par_iter().map(hash_one).collect()),
                Err(e) => {
                    log::warn!("Failed to create hashing pool, hashing sequentially: {}", e);
                    files.iter().map(hash_one).collect()
                }
            };

        if self.config.is_shutdown_requested() || results.iter().any(Option::is_none) {
            log::debug!("Hashing interrupted");
            return Err(FinderError::Interrupted);
        }
        Ok(results.into_iter().flatten().collect())
    }
}
