//! Side-effecting operations on scan results.
//!
//! Both run only after grouping has finished, copy before delete:
//!
//! - [`copy`]: copy every matched file into one folder under the root
//! - [`delete`]: remove every duplicate except the first member of its group
//!
//! ```no_run
//! use filesift::actions::{delete_duplicates, DeleteConfig};
//! use filesift::duplicates::DuplicateGroup;
//!
//! let groups: Vec<DuplicateGroup> = Vec::new();
//! let result = delete_duplicates(&groups, &DeleteConfig::trash());
//! println!("{}", result.summary());
//! ```

pub mod copy;
pub mod delete;

pub use copy::{copy_all, BatchCopyResult, CollisionPolicy, Copier, CopyError, DEFAULT_COPY_DIR};
pub use delete::{
    delete_duplicates, delete_to_trash, permanent_delete, verify_unchanged, BatchDeleteResult,
    DeleteConfig, DeleteError, DeleteMethod, DeleteOutcome, DeleteResult, DeleteStatus,
    DuplicateDeleter,
};
