//! Report writers for scan results.
//!
//! Both formats share one row schema:
//!
//! | File Path | Size (Bytes) | Hash (if used) | Group ID (if duplicate) |
//!
//! With duplicate detection off every matched file gets a row with empty
//! hash and group columns, in traversal order or oldest first when
//! [`ListingOrder::Created`] is requested. With detection on only grouped files are listed,
//! group by group, each carrying its group ID and, in content mode, the
//! digest computed while grouping.
//!
//! Reports are rendered into a temporary file next to the destination and
//! renamed into place, so a failed run never leaves a half-written report.
//!
//! # Example
//!
//! ```no_run
//! use filesift::orchestrator::{ScanConfig, ScanOrchestrator};
//! use filesift::output::{write_report, ReportFormat};
//! use std::path::Path;
//!
//! let config = ScanConfig::new("/data".into(), ".pdf").with_detect_duplicates(true);
//! let result = ScanOrchestrator::new(config).run().unwrap();
//! write_report(&result, ReportFormat::Html, Path::new("/tmp/report.html")).unwrap();
//! ```

pub mod csv;
pub mod html;

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

pub use self::csv::CsvReport;
pub use self::html::HtmlReport;
use crate::orchestrator::ScanResult;
use crate::scanner::{hash_to_hex, MatchedFile};

/// Default report file stem, placed in the scan root.
pub const DEFAULT_REPORT_BASENAME: &str = "file_search_results";

/// Column headers, in order.
pub const REPORT_HEADERS: [&str; 4] = [
    "File Path",
    "Size (Bytes)",
    "Hash (if used)",
    "Group ID (if duplicate)",
];

/// Report file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Comma-separated values
    #[default]
    Csv,
    /// A single HTML table
    Html,
}

impl ReportFormat {
    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Row order of the plain listing (duplicate detection off).
///
/// Duplicate groups always keep traversal order, since the first member is
/// the one delete-duplicates keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingOrder {
    /// The order the walk matched files in
    #[default]
    Traversal,
    /// Oldest creation time first; ties keep traversal order
    Created,
}

impl fmt::Display for ListingOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Traversal => f.write_str("traversal"),
            Self::Created => f.write_str("created"),
        }
    }
}

/// `<root>/<basename>.<ext>`
#[must_use]
pub fn default_report_path(root: &Path, basename: &str, format: ReportFormat) -> PathBuf {
    root.join(format!("{basename}.{}", format.extension()))
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    /// Absolute path of the file
    #[serde(rename = "File Path")]
    pub path: String,
    /// Size captured at scan time
    #[serde(rename = "Size (Bytes)")]
    pub size: u64,
    /// Hex digest, empty unless grouped by content
    #[serde(rename = "Hash (if used)")]
    pub hash: String,
    /// Group identifier, empty outside a group
    #[serde(rename = "Group ID (if duplicate)")]
    pub group_id: Option<usize>,
}

/// Build the report rows for a result.
#[must_use]
pub fn build_rows(result: &ScanResult) -> Vec<ReportRow> {
    if !result.duplicate_detection {
        let mut files: Vec<&MatchedFile> = result.files.iter().collect();
        if result.listing_order == ListingOrder::Created {
            files.sort_by_key(|file| file.created);
        }
        return files
            .into_iter()
            .map(|file| ReportRow {
                path: file.path.to_string_lossy().into_owned(),
                size: file.size,
                hash: String::new(),
                group_id: None,
            })
            .collect();
    }

    result
        .groups
        .iter()
        .flat_map(|group| {
            group.files.iter().map(move |file| ReportRow {
                path: file.path.to_string_lossy().into_owned(),
                size: file.size,
                hash: result
                    .digests
                    .get(&file.path)
                    .map(hash_to_hex)
                    .unwrap_or_default(),
                group_id: Some(group.id),
            })
        })
        .collect()
}

/// Errors that can occur while writing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The destination has no usable parent directory.
    #[error("invalid report destination: {0}")]
    InvalidDestination(PathBuf),

    /// I/O error while creating or writing the temporary file.
    #[error("cannot write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// I/O error while streaming the rendered report.
    #[error("I/O error while writing report: {0}")]
    Write(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    /// Template rendering error.
    #[error("HTML template error: {0}")]
    Template(#[from] askama::Error),

    /// The finished report could not be moved into place.
    #[error("cannot move report into place at {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Render rows in the given format into a writer.
///
/// # Errors
///
/// Returns [`ReportError`] if rendering or writing fails.
pub fn render_to<W: Write>(
    rows: &[ReportRow],
    format: ReportFormat,
    writer: W,
) -> Result<(), ReportError> {
    match format {
        ReportFormat::Csv => CsvReport::new(rows).write_to(writer),
        ReportFormat::Html => HtmlReport::new(rows).write_to(writer),
    }
}

/// Write the report for `result` to `destination`, atomically.
///
/// # Errors
///
/// Returns [`ReportError`] when the destination directory is missing or not
/// writable, or rendering fails. The destination is left untouched then.
pub fn write_report(
    result: &ScanResult,
    format: ReportFormat,
    destination: &Path,
) -> Result<(), ReportError> {
    let rows = build_rows(result);
    let dir = match destination.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => return Err(ReportError::InvalidDestination(destination.to_path_buf())),
    };
    let io_err = |source| ReportError::Io {
        path: destination.to_path_buf(),
        source,
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(io_err)?;
    render_to(&rows, format, io::BufWriter::new(temp.as_file_mut()))?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(destination).map_err(|e| ReportError::Persist {
        path: destination.to_path_buf(),
        source: e.error,
    })?;

    log::info!(
        "Wrote {} report with {} rows to {}",
        format,
        rows.len(),
        destination.display()
    );
    Ok(())
}
