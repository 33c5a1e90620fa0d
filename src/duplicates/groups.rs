//! Duplicate groups and order-preserving key grouping.
//!
//! # Overview
//!
//! Files are partitioned by a key: the exact base name in filename mode, or
//! the SHA-256 digest in content mode. Keys with two or more members become
//! [`DuplicateGroup`]s. Two orders are preserved so results are reproducible:
//!
//! - groups are numbered 1.. in the order their key was first seen
//! - members keep the order in which the walker matched them, so the first
//!   member (the keeper) is the earliest file in traversal order
//!
//! # Example
//!
//! ```
//! use filesift::scanner::MatchedFile;
//! use filesift::duplicates::group_by_filename;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let files = vec![
//!     MatchedFile::new(PathBuf::from("/a/x.txt"), 2, SystemTime::now()),
//!     MatchedFile::new(PathBuf::from("/b/x.txt"), 5, SystemTime::now()),
//!     MatchedFile::new(PathBuf::from("/c/y.txt"), 3, SystemTime::now()),
//! ];
//!
//! let groups = group_by_filename(&files);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].id, 1);
//! assert_eq!(groups[0].keeper().path, PathBuf::from("/a/x.txt"));
//! ```

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::hash::Hash as StdHash;

use serde::Serialize;

use crate::scanner::{hash_to_hex, Hash, MatchedFile};

/// What a duplicate group has in common.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum GroupKey {
    /// Identical base name (case-sensitive)
    FileName(OsString),
    /// Identical SHA-256 digest
    Content(Hash),
}

impl GroupKey {
    /// The digest, for content groups.
    #[must_use]
    pub fn digest(&self) -> Option<&Hash> {
        match self {
            Self::Content(hash) => Some(hash),
            Self::FileName(_) => None,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileName(name) => write!(f, "name {}", name.to_string_lossy()),
            Self::Content(hash) => write!(f, "sha256 {}", hash_to_hex(hash)),
        }
    }
}

/// A set of two or more matched files considered equivalent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// 1-based identifier in discovery order
    pub id: usize,
    /// Shared key of all members
    pub key: GroupKey,
    /// Members in traversal order; the first one is the keeper
    pub files: Vec<MatchedFile>,
}

impl DuplicateGroup {
    /// The member preserved by delete-duplicates.
    ///
    /// # Panics
    ///
    /// Never for groups built by this module, which always hold 2+ files.
    #[must_use]
    pub fn keeper(&self) -> &MatchedFile {
        &self.files[0]
    }

    /// Members that delete-duplicates removes.
    #[must_use]
    pub fn duplicates(&self) -> &[MatchedFile] {
        self.files.get(1..).unwrap_or_default()
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Bytes freed by removing every member but the keeper.
    #[must_use]
    pub fn reclaimable_space(&self) -> u64 {
        self.duplicates().iter().map(|f| f.size).sum()
    }
}

/// Group files by key, preserving first-seen key order and member order.
///
/// Files for which `key_of` returns `None` are left out. Singleton keys are
/// dropped and the surviving groups are numbered from 1.
pub fn group_by_key<K, F>(files: &[MatchedFile], mut key_of: F) -> Vec<(K, Vec<MatchedFile>)>
where
    K: Eq + StdHash + Clone,
    F: FnMut(&MatchedFile) -> Option<K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut buckets: Vec<(K, Vec<MatchedFile>)> = Vec::new();

    for file in files {
        let Some(key) = key_of(file) else {
            continue;
        };
        match index.get(&key) {
            Some(&slot) => buckets[slot].1.push(file.clone()),
            None => {
                index.insert(key.clone(), buckets.len());
                buckets.push((key, vec![file.clone()]));
            }
        }
    }

    buckets.retain(|(_, members)| members.len() > 1);
    buckets
}

/// Number buckets 1.. into groups.
fn number_groups(buckets: Vec<(GroupKey, Vec<MatchedFile>)>) -> Vec<DuplicateGroup> {
    buckets
        .into_iter()
        .enumerate()
        .map(|(idx, (key, files))| DuplicateGroup {
            id: idx + 1,
            key,
            files,
        })
        .collect()
}

/// Group by exact base name.
#[must_use]
pub fn group_by_filename(files: &[MatchedFile]) -> Vec<DuplicateGroup> {
    let buckets = group_by_key(files, |file| {
        file.path
            .file_name()
            .map(|name| GroupKey::FileName(name.to_os_string()))
    });
    number_groups(buckets)
}

/// Group by precomputed digest; files missing from `digests` are skipped.
#[must_use]
pub fn group_by_digest(
    files: &[MatchedFile],
    digests: &HashMap<std::path::PathBuf, Hash>,
) -> Vec<DuplicateGroup> {
    let buckets = group_by_key(files, |file| {
        digests.get(&file.path).map(|hash| GroupKey::Content(*hash))
    });
    number_groups(buckets)
}

/// Statistics from the grouping phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupingStats {
    /// Matched files handed to the grouper
    pub total_files: usize,
    /// Files successfully hashed (content mode)
    pub files_hashed: usize,
    /// Files that could not be hashed
    pub hash_failures: usize,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Members beyond the keeper, summed over groups
    pub duplicate_files: usize,
    /// Bytes held by those extra members
    pub reclaimable_space: u64,
}

impl GroupingStats {
    /// Fill in the group-derived counters.
    pub fn record_groups(&mut self, groups: &[DuplicateGroup]) {
        self.duplicate_groups = groups.len();
        self.duplicate_files = groups.iter().map(|g| g.duplicates().len()).sum();
        self.reclaimable_space = groups.iter().map(DuplicateGroup::reclaimable_space).sum();
    }
}
