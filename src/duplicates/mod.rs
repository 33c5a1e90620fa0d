//! Duplicate detection.
//!
//! - [`groups`]: group types and order-preserving key grouping
//! - [`finder`]: filename or content grouping, with parallel hashing

pub mod finder;
pub mod groups;

pub use finder::{
    DuplicateFinder, FinderConfig, FinderError, Grouping, GroupingMode, DEFAULT_IO_THREADS,
};
pub use groups::{
    group_by_digest, group_by_filename, group_by_key, DuplicateGroup, GroupKey, GroupingStats,
};
