//! Command-line interface definitions for filesift.
//!
//! Global options (verbosity, color, config file) come first, followed by a
//! subcommand.
//!
//! # Example
//!
//! ```bash
//! # List every .txt file under ~/notes into a CSV report
//! filesift scan ~/notes --type txt
//!
//! # Group by content and remove all but the first copy of each duplicate
//! filesift scan ~/notes --type .txt --detect-duplicates --content-hash --delete-duplicates
//!
//! # Gather matches into a folder and write an HTML report
//! filesift -v scan ~/photos --type jpg --copy --format html
//!
//! # List every .pdf, oldest first
//! filesift scan ~/docs --type pdf --sort created
//!
//! # Show the effective settings
//! filesift config
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::actions::{CollisionPolicy, DeleteMethod};
use crate::output::{ListingOrder, ReportFormat};

/// Find files by type, group duplicates, copy or prune them, and report.
#[derive(Debug, Parser)]
#[command(name = "filesift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Settings file (default: config.toml in the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Search a directory tree for files of one type
    Scan(ScanArgs),
    /// Show or initialize the settings file
    Config(ConfigArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory to search
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// File type to match, with or without the leading dot (txt, .jpg)
    #[arg(short = 't', long = "type", value_name = "SUFFIX")]
    pub suffix: String,

    /// Copy every match into a folder under ROOT
    #[arg(long)]
    pub copy: bool,

    /// Group matches that are duplicates of each other
    #[arg(short = 'd', long)]
    pub detect_duplicates: bool,

    /// Compare by SHA-256 of the contents instead of by file name
    #[arg(long)]
    pub content_hash: bool,

    /// Delete every duplicate except the first file of each group
    ///
    /// Requires --detect-duplicates.
    #[arg(long, requires = "detect_duplicates")]
    pub delete_duplicates: bool,

    /// Report format [default: from settings, else csv]
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Number of I/O threads for hashing
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// How to handle two matches with the same name when copying
    #[arg(long, value_enum, value_name = "POLICY")]
    pub collision: Option<CollisionArg>,

    /// Move deleted duplicates to the system trash
    #[arg(long)]
    pub trash: bool,

    /// Write the report here instead of ROOT/file_search_results.<ext>
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Follow symbolic links during the walk
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Row order of the listing when duplicates are not detected
    #[arg(long, value_enum, value_name = "ORDER")]
    pub sort: Option<SortArg>,
}

/// Arguments for the config subcommand.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Write the default settings to the config file if none exists
    #[arg(long)]
    pub init: bool,
}

/// Report format as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Comma-separated values
    Csv,
    /// Single-table HTML page
    Html,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ReportFormat::Csv,
            FormatArg::Html => ReportFormat::Html,
        }
    }
}

/// Same-name policy as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CollisionArg {
    /// Keep both, appending " (1)", " (2)", ... to later names
    Rename,
    /// Later files replace earlier ones
    Overwrite,
}

impl From<CollisionArg> for CollisionPolicy {
    fn from(arg: CollisionArg) -> Self {
        match arg {
            CollisionArg::Rename => CollisionPolicy::Rename,
            CollisionArg::Overwrite => CollisionPolicy::Overwrite,
        }
    }
}

/// Listing order as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    /// Walk order, directories sorted by name
    Traversal,
    /// Oldest creation time first
    Created,
}

impl From<SortArg> for ListingOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Traversal => ListingOrder::Traversal,
            SortArg::Created => ListingOrder::Created,
        }
    }
}

impl ScanArgs {
    /// Delete method requested on the command line, if any.
    #[must_use]
    pub fn delete_method(&self) -> Option<DeleteMethod> {
        self.trash.then_some(DeleteMethod::Trash)
    }
}
