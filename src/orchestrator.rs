//! Scan orchestration: walk, group, act, report.
//!
//! # Overview
//!
//! [`ScanOrchestrator::run`] drives one scan through its states:
//!
//! ```text
//! Idle -> Scanning -> Grouping? -> Acting? -> Reporting -> Done
//!                                                      \-> Failed
//! ```
//!
//! Input is validated before any I/O. Per-file problems are collected as
//! warnings on the [`ScanResult`]; only invalid input, cancellation and an
//! unwritable report are fatal. When the report cannot be written the
//! computed result is still handed back inside [`ScanFailure::Report`], and
//! a scan cancelled once files have been copied or deleted hands back its
//! result inside [`ScanFailure::Interrupted`].
//!
//! Progress is reported as one fraction for the whole scan:
//!
//! | phase    | span (content mode) | span (otherwise) |
//! |----------|---------------------|------------------|
//! | walking  | 0.00 - 0.45         | 0.00 - 0.90      |
//! | hashing  | 0.45 - 0.90         |                  |
//! | copying  | 0.90 - 0.95         | 0.90 - 0.95      |
//! | deleting | 0.95 - 0.99         | 0.95 - 0.99      |
//!
//! `1.0` is emitted once, after the report has been persisted.
//!
//! # Example
//!
//! ```no_run
//! use filesift::orchestrator::{ScanConfig, ScanOrchestrator};
//!
//! let config = ScanConfig::new("/home/user/Pictures".into(), "jpg")
//!     .with_detect_duplicates(true)
//!     .with_content_hash(true);
//! let result = ScanOrchestrator::new(config).run().unwrap();
//! println!("{} files, {} duplicate groups", result.files.len(), result.groups.len());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use crate::actions::{
    CollisionPolicy, Copier, DeleteConfig, DeleteMethod, DeleteOutcome, DuplicateDeleter,
    DEFAULT_COPY_DIR,
};
use crate::duplicates::{
    DuplicateFinder, DuplicateGroup, FinderConfig, FinderError, GroupingMode, GroupingStats,
    DEFAULT_IO_THREADS,
};
use crate::error::{Warning, WarningKind};
use crate::output::{
    default_report_path, write_report, ListingOrder, ReportError, ReportFormat,
    DEFAULT_REPORT_BASENAME,
};
use crate::progress::{Phase, ProgressCallback, ProgressTracker};
use crate::scanner::{Hash, MatchedFile, Walker, WalkerConfig, DEFAULT_BUFFER_SIZE};

const WALK_SPAN: Range<f64> = 0.0..0.9;
const WALK_SPAN_CONTENT: Range<f64> = 0.0..0.45;
const HASH_SPAN: Range<f64> = 0.45..0.9;
const COPY_SPAN: Range<f64> = 0.9..0.95;
const DELETE_SPAN: Range<f64> = 0.95..0.99;

/// A scan request. Built once, never mutated by the scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directory to scan
    pub root: PathBuf,
    /// File type filter as given by the user ("pdf", ".PDF", ...)
    pub suffix: String,
    /// Copy every matched file into `copy_dir_name` under the root
    pub copy: bool,
    /// Group matched files into duplicate sets
    pub detect_duplicates: bool,
    /// Group by SHA-256 content instead of file name
    pub content_hash: bool,
    /// Remove all but the first member of each group
    pub delete_duplicates: bool,
    /// Report format
    pub format: ReportFormat,
    /// Hashing workers
    pub io_threads: usize,
    /// Hasher read buffer
    pub hash_buffer_size: usize,
    /// Copy folder name, relative to the root
    pub copy_dir_name: String,
    /// Same-name handling for copy-all
    pub collision_policy: CollisionPolicy,
    /// Permanent removal or system trash
    pub delete_method: DeleteMethod,
    /// Follow symbolic links while walking
    pub follow_symlinks: bool,
    /// Report file stem used when no explicit path is given
    pub report_basename: String,
    /// Explicit report destination
    pub report_path: Option<PathBuf>,
    /// Row order of the plain listing
    pub listing_order: ListingOrder,
}

impl ScanConfig {
    /// A scan of `root` for files ending in `suffix`, with every option off.
    #[must_use]
    pub fn new(root: PathBuf, suffix: impl Into<String>) -> Self {
        Self {
            root,
            suffix: suffix.into(),
            copy: false,
            detect_duplicates: false,
            content_hash: false,
            delete_duplicates: false,
            format: ReportFormat::default(),
            io_threads: DEFAULT_IO_THREADS,
            hash_buffer_size: DEFAULT_BUFFER_SIZE,
            copy_dir_name: DEFAULT_COPY_DIR.to_string(),
            collision_policy: CollisionPolicy::default(),
            delete_method: DeleteMethod::default(),
            follow_symlinks: false,
            report_basename: DEFAULT_REPORT_BASENAME.to_string(),
            report_path: None,
            listing_order: ListingOrder::default(),
        }
    }

    /// Enable copy-all.
    #[must_use]
    pub fn with_copy(mut self, enabled: bool) -> Self {
        self.copy = enabled;
        self
    }

    /// Enable duplicate detection.
    #[must_use]
    pub fn with_detect_duplicates(mut self, enabled: bool) -> Self {
        self.detect_duplicates = enabled;
        self
    }

    /// Group by content digest instead of file name.
    #[must_use]
    pub fn with_content_hash(mut self, enabled: bool) -> Self {
        self.content_hash = enabled;
        self
    }

    /// Enable delete-duplicates. Requires duplicate detection.
    #[must_use]
    pub fn with_delete_duplicates(mut self, enabled: bool) -> Self {
        self.delete_duplicates = enabled;
        self
    }

    /// Set the report format.
    #[must_use]
    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the number of hashing workers.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the hasher read buffer size.
    #[must_use]
    pub fn with_hash_buffer_size(mut self, size: usize) -> Self {
        self.hash_buffer_size = size;
        self
    }

    /// Set the copy folder name.
    #[must_use]
    pub fn with_copy_dir_name(mut self, name: impl Into<String>) -> Self {
        self.copy_dir_name = name.into();
        self
    }

    /// Set the copy collision policy.
    #[must_use]
    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    /// Set the delete method.
    #[must_use]
    pub fn with_delete_method(mut self, method: DeleteMethod) -> Self {
        self.delete_method = method;
        self
    }

    /// Follow symbolic links while walking.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set the report file stem.
    #[must_use]
    pub fn with_report_basename(mut self, basename: impl Into<String>) -> Self {
        self.report_basename = basename.into();
        self
    }

    /// Write the report to an explicit path.
    #[must_use]
    pub fn with_report_path(mut self, path: PathBuf) -> Self {
        self.report_path = Some(path);
        self
    }

    /// Set the row order of the plain listing.
    #[must_use]
    pub fn with_listing_order(mut self, order: ListingOrder) -> Self {
        self.listing_order = order;
        self
    }

    /// How files are grouped, or `None` when detection is off.
    ///
    /// `content_hash` has no effect without `detect_duplicates`.
    #[must_use]
    pub fn grouping_mode(&self) -> Option<GroupingMode> {
        match (self.detect_duplicates, self.content_hash) {
            (false, _) => None,
            (true, false) => Some(GroupingMode::FileName),
            (true, true) => Some(GroupingMode::Content),
        }
    }
}

/// Lifecycle of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    /// Not started
    #[default]
    Idle,
    /// Walking the tree
    Scanning,
    /// Grouping into duplicate sets
    Grouping,
    /// Copying or deleting
    Acting,
    /// Writing the report
    Reporting,
    /// Finished successfully
    Done,
    /// Stopped by a fatal condition
    Failed,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Grouping => "grouping",
            Self::Acting => "acting",
            Self::Reporting => "reporting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Everything a scan produced.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Canonical scan root
    pub root: PathBuf,
    /// Matched files in traversal order
    pub files: Vec<MatchedFile>,
    /// Duplicate groups, empty when detection is off
    pub groups: Vec<DuplicateGroup>,
    /// Digest of every hashed file (content mode only)
    pub digests: HashMap<PathBuf, Hash>,
    /// Whether duplicate detection ran
    pub duplicate_detection: bool,
    /// Row order of the plain listing
    pub listing_order: ListingOrder,
    /// Grouping counters
    pub stats: GroupingStats,
    /// Regular files seen by the counting pass
    pub candidates_total: usize,
    /// Copy folder, when copy-all ran
    pub copy_dir: Option<PathBuf>,
    /// Files copied by copy-all
    pub copied_count: usize,
    /// Files removed by delete-duplicates
    pub deleted_count: usize,
    /// Per-target delete outcomes
    pub deletions: Vec<DeleteOutcome>,
    /// Bytes freed by delete-duplicates
    pub bytes_freed: u64,
    /// Non-fatal problems, in the order they occurred
    pub warnings: Vec<Warning>,
    /// Where the report was written
    pub report_path: Option<PathBuf>,
    /// Final state
    pub state: ScanState,
    /// Wall-clock time of the scan
    pub duration: Duration,
}

impl ScanResult {
    /// A result with nothing in it, rooted at `root`.
    #[must_use]
    pub fn empty(root: PathBuf) -> Self {
        Self {
            root,
            files: Vec::new(),
            groups: Vec::new(),
            digests: HashMap::new(),
            duplicate_detection: false,
            listing_order: ListingOrder::default(),
            stats: GroupingStats::default(),
            candidates_total: 0,
            copy_dir: None,
            copied_count: 0,
            deleted_count: 0,
            deletions: Vec::new(),
            bytes_freed: 0,
            warnings: Vec::new(),
            report_path: None,
            state: ScanState::Idle,
            duration: Duration::ZERO,
        }
    }

    /// Whether any warnings were collected.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Oldest and newest creation time among the matched files.
    #[must_use]
    pub fn created_range(&self) -> Option<(SystemTime, SystemTime)> {
        let oldest = self.files.iter().map(|f| f.created).min()?;
        let newest = self.files.iter().map(|f| f.created).max()?;
        Some((oldest, newest))
    }

    /// Total size of the matched files at scan time.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Fatal scan outcomes.
#[derive(thiserror::Error, Debug)]
pub enum ScanFailure {
    /// The request was rejected before any I/O.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The scan was cancelled; no report was written.
    #[error("Scan interrupted by user")]
    Interrupted {
        /// The result so far, present once the acting phase has touched
        /// the filesystem
        partial: Option<Box<ScanResult>>,
    },

    /// Everything was computed but the report could not be written.
    #[error("report could not be written: {source}")]
    Report {
        #[source]
        source: ReportError,
        /// The result computed up to the reporting phase
        partial: Box<ScanResult>,
    },
}

impl ScanFailure {
    /// The result computed before the failure, if one was kept.
    #[must_use]
    pub fn partial(&self) -> Option<&ScanResult> {
        match self {
            Self::InvalidInput(_) => None,
            Self::Interrupted { partial } => partial.as_deref(),
            Self::Report { partial, .. } => Some(&**partial),
        }
    }
}

/// Runs one scan from a [`ScanConfig`].
pub struct ScanOrchestrator {
    config: ScanConfig,
    progress: Option<Arc<dyn ProgressCallback>>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl fmt::Debug for ScanOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanOrchestrator")
            .field("config", &self.config)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .field("shutdown_flag", &self.shutdown_flag)
            .finish()
    }
}

impl ScanOrchestrator {
    /// Create an orchestrator for the given request.
    #[must_use]
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            progress: None,
            shutdown_flag: None,
        }
    }

    /// Report progress to a callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// The request this orchestrator runs.
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn check_cancelled(&self) -> Result<(), ScanFailure> {
        if self.is_shutdown_requested() {
            log::info!("Scan cancelled");
            Err(ScanFailure::Interrupted { partial: None })
        } else {
            Ok(())
        }
    }

    /// Stop after the acting phase, keeping the record of what was copied
    /// and deleted.
    fn check_cancelled_after_actions(
        &self,
        state: &mut ScanState,
        started: Instant,
        result: &mut ScanResult,
    ) -> Result<(), ScanFailure> {
        if !self.is_shutdown_requested() {
            return Ok(());
        }
        log::info!(
            "Scan cancelled after {} copies and {} deletions",
            result.copied_count,
            result.deleted_count
        );
        transition(state, ScanState::Failed);
        let mut partial = std::mem::replace(result, ScanResult::empty(PathBuf::new()));
        partial.state = *state;
        partial.duration = started.elapsed();
        Err(ScanFailure::Interrupted {
            partial: Some(Box::new(partial)),
        })
    }

    /// Validate the request and resolve the canonical root.
    fn validate(&self) -> Result<(PathBuf, WalkerConfig), ScanFailure> {
        let config = &self.config;
        let walker_config = WalkerConfig::new(&config.suffix)
            .map_err(|e| ScanFailure::InvalidInput(e.to_string()))?
            .with_follow_symlinks(config.follow_symlinks);

        let metadata = fs::metadata(&config.root).map_err(|e| {
            ScanFailure::InvalidInput(format!(
                "cannot access root directory {}: {}",
                config.root.display(),
                e
            ))
        })?;
        if !metadata.is_dir() {
            return Err(ScanFailure::InvalidInput(format!(
                "root is not a directory: {}",
                config.root.display()
            )));
        }
        if config.delete_duplicates && !config.detect_duplicates {
            return Err(ScanFailure::InvalidInput(
                "deleting duplicates requires duplicate detection".to_string(),
            ));
        }

        let root = fs::canonicalize(&config.root).map_err(|e| {
            ScanFailure::InvalidInput(format!(
                "cannot resolve root directory {}: {}",
                config.root.display(),
                e
            ))
        })?;
        let walker_config = if config.copy {
            walker_config.with_excluded_dir(root.join(&config.copy_dir_name))
        } else {
            walker_config
        };
        Ok((root, walker_config))
    }

    /// Run the scan.
    ///
    /// # Errors
    ///
    /// - [`ScanFailure::InvalidInput`] for a missing or non-directory root, an
    ///   empty suffix, or delete requested without detection
    /// - [`ScanFailure::Interrupted`] when the shutdown flag is raised; the
    ///   result travels inside the error once copying or deleting has run
    /// - [`ScanFailure::Report`] when the report cannot be written; the
    ///   computed result travels inside the error
    pub fn run(&self) -> Result<ScanResult, ScanFailure> {
        let started = Instant::now();
        let mut state = ScanState::Idle;
        let (root, walker_config) = self.validate()?;
        let tracker = Arc::new(ProgressTracker::new(self.progress.clone()));
        let mode = self.config.grouping_mode();

        let mut result = ScanResult::empty(root.clone());
        result.duplicate_detection = mode.is_some();
        result.listing_order = self.config.listing_order;

        // Walk
        transition(&mut state, ScanState::Scanning);
        let mut walker = Walker::new(&root, walker_config).with_progress(Arc::clone(&tracker));
        if let Some(ref flag) = self.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }
        result.candidates_total = walker.count_candidates();
        self.check_cancelled()?;

        let walk_span = if mode == Some(GroupingMode::Content) {
            WALK_SPAN_CONTENT
        } else {
            WALK_SPAN
        };
        tracker.start_phase(Phase::Walking, result.candidates_total, walk_span);
        for entry in walker.walk() {
            match entry {
                Ok(file) => result.files.push(file),
                Err(e) => result.warnings.push(Warning::read(e.path(), &e)),
            }
        }
        tracker.end_phase();
        self.check_cancelled()?;
        log::info!(
            "Matched {} of {} files under {}",
            result.files.len(),
            result.candidates_total,
            root.display()
        );

        // Group
        if let Some(mode) = mode {
            transition(&mut state, ScanState::Grouping);
            self.group(mode, &tracker, &mut result)?;
        }

        // Act
        if self.config.copy || self.config.delete_duplicates {
            transition(&mut state, ScanState::Acting);
        }
        if self.config.copy {
            self.copy(&root, &tracker, &mut result);
            self.check_cancelled_after_actions(&mut state, started, &mut result)?;
        }
        if self.config.delete_duplicates {
            self.delete(&tracker, &mut result);
            self.check_cancelled_after_actions(&mut state, started, &mut result)?;
        }

        // Report
        transition(&mut state, ScanState::Reporting);
        let destination = self.config.report_path.clone().unwrap_or_else(|| {
            default_report_path(&root, &self.config.report_basename, self.config.format)
        });
        result.duration = started.elapsed();
        if let Err(source) = write_report(&result, self.config.format, &destination) {
            log::error!("Failed to write report {}: {}", destination.display(), source);
            transition(&mut state, ScanState::Failed);
            result.state = state;
            return Err(ScanFailure::Report {
                source,
                partial: Box::new(result),
            });
        }
        result.report_path = Some(destination);
        tracker.finish();

        transition(&mut state, ScanState::Done);
        result.state = state;
        result.duration = started.elapsed();
        Ok(result)
    }

    fn group(
        &self,
        mode: GroupingMode,
        tracker: &Arc<ProgressTracker>,
        result: &mut ScanResult,
    ) -> Result<(), ScanFailure> {
        let mut finder_config = FinderConfig::new(mode)
            .with_io_threads(self.config.io_threads)
            .with_buffer_size(self.config.hash_buffer_size)
            .with_progress(Arc::clone(tracker));
        if let Some(ref flag) = self.shutdown_flag {
            finder_config = finder_config.with_shutdown_flag(Arc::clone(flag));
        }

        if mode == GroupingMode::Content {
            tracker.start_phase(Phase::Hashing, result.files.len(), HASH_SPAN);
        }
        let grouping = DuplicateFinder::new(finder_config)
            .group(&result.files)
            .map_err(|e| match e {
                FinderError::Interrupted => ScanFailure::Interrupted { partial: None },
            })?;
        if mode == GroupingMode::Content {
            tracker.end_phase();
        }

        result.groups = grouping.groups;
        result.digests = grouping.digests;
        result.stats = grouping.stats;
        result.warnings.extend(grouping.warnings);
        Ok(())
    }

    fn copy(&self, root: &Path, tracker: &Arc<ProgressTracker>, result: &mut ScanResult) {
        let destination = root.join(&self.config.copy_dir_name);
        let mut copier = Copier::new(destination.clone(), self.config.collision_policy)
            .with_progress(Arc::clone(tracker));
        if let Some(ref flag) = self.shutdown_flag {
            copier = copier.with_shutdown_flag(Arc::clone(flag));
        }

        tracker.start_phase(Phase::Copying, result.files.len(), COPY_SPAN);
        match copier.copy_all(&result.files) {
            Ok(copied) => {
                result.copied_count = copied.copied_count();
                result.warnings.extend(copied.warnings);
                tracker.message(&format!(
                    "Copied {} files to {}",
                    result.copied_count,
                    destination.display()
                ));
            }
            Err(e) => {
                log::warn!("Copy skipped: {}", e);
                result
                    .warnings
                    .push(Warning::new(WarningKind::FileWrite, &destination, e.to_string()));
            }
        }
        tracker.end_phase();
        result.copy_dir = Some(destination);
    }

    fn delete(&self, tracker: &Arc<ProgressTracker>, result: &mut ScanResult) {
        let config = DeleteConfig {
            method: self.config.delete_method,
            ..DeleteConfig::default()
        };
        let mut deleter = DuplicateDeleter::new(config).with_progress(Arc::clone(tracker));
        if let Some(ref flag) = self.shutdown_flag {
            deleter = deleter.with_shutdown_flag(Arc::clone(flag));
        }

        tracker.start_phase(
            Phase::Deleting,
            DuplicateDeleter::target_count(&result.groups),
            DELETE_SPAN,
        );
        let deleted = deleter.run(&result.groups);
        tracker.end_phase();

        result.deleted_count = deleted.deleted_count();
        result.bytes_freed = deleted.bytes_freed;
        result.deletions = deleted.outcomes;
        result.warnings.extend(deleted.warnings);
    }
}

fn transition(state: &mut ScanState, next: ScanState) {
    log::debug!("Scan state: {} -> {}", state, next);
    *state = next;
}
