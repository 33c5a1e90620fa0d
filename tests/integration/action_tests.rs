use filesift::actions::{copy_all, CollisionPolicy, DeleteStatus};
use filesift::error::WarningKind;
use filesift::orchestrator::{ScanConfig, ScanOrchestrator};
use filesift::scanner::MatchedFile;
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use tempfile::{tempdir, TempDir};

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// a/x.txt ("hi"), b/x.txt ("hi"), c/y.txt ("bye")
fn scenario_tree() -> TempDir {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/x.txt", b"hi");
    write(dir.path(), "b/x.txt", b"hi");
    write(dir.path(), "c/y.txt", b"bye");
    dir
}

fn delete_config(root: &Path, content: bool) -> ScanConfig {
    ScanConfig::new(root.to_path_buf(), ".txt")
        .with_detect_duplicates(true)
        .with_content_hash(content)
        .with_delete_duplicates(true)
}

#[test]
fn test_delete_keeps_first_in_traversal_order() {
    let dir = scenario_tree();

    let result = ScanOrchestrator::new(delete_config(dir.path(), true))
        .run()
        .unwrap();

    assert!(dir.path().join("a/x.txt").exists());
    assert!(!dir.path().join("b/x.txt").exists());
    assert!(dir.path().join("c/y.txt").exists());
    assert_eq!(result.deleted_count, 1);
    assert_eq!(result.bytes_freed, 2);
    assert_eq!(result.deletions.len(), 1);
    assert_eq!(result.deletions[0].status, DeleteStatus::Deleted);
    assert!(result.deletions[0].path.ends_with("b/x.txt"));
}

#[test]
fn test_delete_in_filename_mode_ignores_content() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/x.txt", b"first version");
    write(dir.path(), "b/x.txt", b"second version");

    let result = ScanOrchestrator::new(delete_config(dir.path(), false))
        .run()
        .unwrap();

    assert_eq!(result.deleted_count, 1);
    assert!(dir.path().join("a/x.txt").exists());
    assert!(!dir.path().join("b/x.txt").exists());
}

#[test]
fn test_delete_twice_on_same_result_is_idempotent() {
    use filesift::actions::{delete_duplicates, DeleteConfig};

    let dir = scenario_tree();
    let result = ScanOrchestrator::new(
        ScanConfig::new(dir.path().to_path_buf(), ".txt")
            .with_detect_duplicates(true)
            .with_content_hash(true),
    )
    .run()
    .unwrap();

    let first = delete_duplicates(&result.groups, &DeleteConfig::permanent());
    let second = delete_duplicates(&result.groups, &DeleteConfig::permanent());

    assert_eq!(first.deleted_count(), 1);
    assert_eq!(first.failure_count(), 0);
    assert_eq!(second.deleted_count(), 0);
    assert_eq!(second.absent_count(), 1);
    assert_eq!(second.failure_count(), 0);
    assert!(second
        .warnings
        .iter()
        .all(|w| w.kind == WarningKind::AlreadyAbsent));
    assert!(dir.path().join("a/x.txt").exists());
}

#[test]
fn test_second_scan_after_delete_finds_no_duplicates() {
    let dir = scenario_tree();
    ScanOrchestrator::new(delete_config(dir.path(), true))
        .run()
        .unwrap();

    let again = ScanOrchestrator::new(delete_config(dir.path(), true))
        .run()
        .unwrap();

    assert!(again.groups.is_empty());
    assert_eq!(again.deleted_count, 0);
    assert!(dir.path().join("a/x.txt").exists());
}

#[test]
fn test_copy_all_gathers_every_match() {
    let dir = scenario_tree();

    let result = ScanOrchestrator::new(ScanConfig::new(dir.path().to_path_buf(), "txt").with_copy(true))
        .run()
        .unwrap();

    let copy_dir = result.copy_dir.clone().unwrap();
    assert_eq!(copy_dir, result.root.join("copied_files"));
    assert_eq!(result.copied_count, 3);
    assert_eq!(fs::read(copy_dir.join("x.txt")).unwrap(), b"hi");
    assert_eq!(fs::read(copy_dir.join("x (1).txt")).unwrap(), b"hi");
    assert_eq!(fs::read(copy_dir.join("y.txt")).unwrap(), b"bye");
    // originals untouched
    assert!(dir.path().join("b/x.txt").exists());
}

#[test]
fn test_copy_overwrite_policy_keeps_last() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/x.txt", b"first");
    write(dir.path(), "b/x.txt", b"second");

    let result = ScanOrchestrator::new(
        ScanConfig::new(dir.path().to_path_buf(), "txt")
            .with_copy(true)
            .with_collision_policy(CollisionPolicy::Overwrite),
    )
    .run()
    .unwrap();

    let copy_dir = result.copy_dir.unwrap();
    assert_eq!(fs::read(copy_dir.join("x.txt")).unwrap(), b"second");
    assert!(!copy_dir.join("x (1).txt").exists());
}

#[test]
fn test_copy_then_delete_keeps_copies() {
    let dir = scenario_tree();

    let result = ScanOrchestrator::new(delete_config(dir.path(), true).with_copy(true))
        .run()
        .unwrap();

    let copy_dir = result.copy_dir.unwrap();
    assert_eq!(result.copied_count, 3);
    assert_eq!(result.deleted_count, 1);
    assert!(copy_dir.join("x (1).txt").exists());
    assert!(!dir.path().join("b/x.txt").exists());
}

#[test]
fn test_copy_missing_source_is_a_warning() {
    let dir = tempdir().unwrap();
    write(dir.path(), "present.txt", b"ok");
    let files = vec![
        MatchedFile::new(dir.path().join("present.txt"), 2, SystemTime::now()),
        MatchedFile::new(dir.path().join("vanished.txt"), 2, SystemTime::now()),
    ];

    let result = copy_all(&files, &dir.path().join("out"), CollisionPolicy::Rename).unwrap();

    assert_eq!(result.copied_count(), 1);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].kind, WarningKind::FileWrite);
    assert!(dir.path().join("out/present.txt").exists());
}
