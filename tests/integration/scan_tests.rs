use filesift::duplicates::GroupKey;
use filesift::orchestrator::{ScanConfig, ScanOrchestrator, ScanResult, ScanState};
use filesift::scanner::{Walker, WalkerConfig};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn write(root: &Path, rel: &str, content: &[u8]) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

/// a/x.txt ("hi"), b/x.txt ("hi"), c/y.txt ("bye")
fn scenario_tree() -> TempDir {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/x.txt", b"hi");
    write(dir.path(), "b/x.txt", b"hi");
    write(dir.path(), "c/y.txt", b"bye");
    dir
}

fn run(config: ScanConfig) -> ScanResult {
    ScanOrchestrator::new(config).run().unwrap()
}

fn relative(result: &ScanResult, paths: impl IntoIterator<Item = PathBuf>) -> Vec<String> {
    paths
        .into_iter()
        .map(|p| {
            p.strip_prefix(&result.root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

#[test]
fn test_match_set_is_exactly_the_suffix_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "notes.txt", b"1");
    write(dir.path(), "LOUD.TXT", b"2");
    write(dir.path(), "deep/er/still/mixed.TxT", b"3");
    write(dir.path(), "deep/image.png", b"4");
    write(dir.path(), "deep/txt", b"5");
    write(dir.path(), "deep/notes.txt.bak", b"6");
    fs::create_dir_all(dir.path().join("folder.txt")).unwrap();

    let result = run(ScanConfig::new(dir.path().to_path_buf(), ".txt"));

    let found: BTreeSet<String> =
        relative(&result, result.files.iter().map(|f| f.path.clone()))
            .into_iter()
            .collect();
    let expected: BTreeSet<String> = ["notes.txt", "LOUD.TXT", "deep/er/still/mixed.TxT"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(found, expected);
    assert_eq!(result.state, ScanState::Done);
}

#[test]
fn test_suffix_without_dot_is_normalized() {
    let dir = scenario_tree();
    let dotted = run(ScanConfig::new(dir.path().to_path_buf(), ".txt"));
    let bare = run(ScanConfig::new(dir.path().to_path_buf(), "txt"));

    let dotted_paths: Vec<_> = dotted.files.iter().map(|f| f.path.clone()).collect();
    let bare_paths: Vec<_> = bare.files.iter().map(|f| f.path.clone()).collect();
    assert_eq!(dotted_paths, bare_paths);
    assert_eq!(dotted_paths.len(), 3);
}

#[test]
fn test_traversal_order_is_stable() {
    let dir = scenario_tree();
    let result = run(ScanConfig::new(dir.path().to_path_buf(), "txt"));
    assert_eq!(
        relative(&result, result.files.iter().map(|f| f.path.clone())),
        vec!["a/x.txt", "b/x.txt", "c/y.txt"]
    );
}

#[test]
fn test_content_mode_scenario() {
    let dir = scenario_tree();
    let result = run(
        ScanConfig::new(dir.path().to_path_buf(), ".txt")
            .with_detect_duplicates(true)
            .with_content_hash(true),
    );

    assert_eq!(result.files.len(), 3);
    assert_eq!(result.groups.len(), 1);
    let group = &result.groups[0];
    assert!(matches!(group.key, GroupKey::Content(_)));
    assert_eq!(
        relative(&result, group.files.iter().map(|f| f.path.clone())),
        vec!["a/x.txt", "b/x.txt"]
    );
    assert_eq!(result.stats.duplicate_groups, 1);
    assert_eq!(result.stats.duplicate_files, 1);
    assert_eq!(result.stats.files_hashed, 3);
}

#[test]
fn test_filename_mode_scenario() {
    let dir = scenario_tree();
    let result = run(ScanConfig::new(dir.path().to_path_buf(), ".txt").with_detect_duplicates(true));

    assert_eq!(result.groups.len(), 1);
    let group = &result.groups[0];
    assert_eq!(group.key, GroupKey::FileName(OsString::from("x.txt")));
    assert_eq!(
        relative(&result, group.files.iter().map(|f| f.path.clone())),
        vec!["a/x.txt", "b/x.txt"]
    );
    assert!(result.digests.is_empty());
}

#[test]
fn test_content_mode_ignores_names_and_sizes_alone() {
    let dir = tempdir().unwrap();
    write(dir.path(), "one/alpha.log", b"same bytes");
    write(dir.path(), "two/beta.log", b"same bytes");
    write(dir.path(), "three/alpha.log", b"diff bytes");

    let result = run(
        ScanConfig::new(dir.path().to_path_buf(), "log")
            .with_detect_duplicates(true)
            .with_content_hash(true),
    );

    assert_eq!(result.groups.len(), 1);
    let mut members = relative(&result, result.groups[0].files.iter().map(|f| f.path.clone()));
    members.sort();
    assert_eq!(members, vec!["one/alpha.log", "two/beta.log"]);
}

#[test]
fn test_filename_mode_ignores_content() {
    let dir = tempdir().unwrap();
    write(dir.path(), "one/alpha.log", b"first");
    write(dir.path(), "two/alpha.log", b"completely different");
    write(dir.path(), "two/beta.log", b"first");

    let result = run(ScanConfig::new(dir.path().to_path_buf(), "log").with_detect_duplicates(true));

    assert_eq!(result.groups.len(), 1);
    assert_eq!(
        relative(&result, result.groups[0].files.iter().map(|f| f.path.clone())),
        vec!["one/alpha.log", "two/alpha.log"]
    );
}

#[test]
fn test_group_ids_are_unique_and_sequential() {
    let dir = tempdir().unwrap();
    for name in ["p", "q", "r"] {
        write(dir.path(), &format!("left/{name}.md"), name.as_bytes());
        write(dir.path(), &format!("right/{name}.md"), name.as_bytes());
    }

    let result = run(
        ScanConfig::new(dir.path().to_path_buf(), "md")
            .with_detect_duplicates(true)
            .with_content_hash(true),
    );

    let ids: Vec<usize> = result.groups.iter().map(|g| g.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn test_copy_folder_is_not_rescanned() {
    let dir = scenario_tree();
    let config = ScanConfig::new(dir.path().to_path_buf(), "txt").with_copy(true);

    let first = run(config.clone());
    let second = run(config);

    assert_eq!(first.files.len(), 3);
    assert_eq!(second.files.len(), 3);
    assert!(second
        .files
        .iter()
        .all(|f| !f.path.starts_with(second.root.join("copied_files"))));
}

#[test]
fn test_walker_counts_every_regular_file() {
    let dir = scenario_tree();
    write(dir.path(), "c/readme.md", b"#");

    let walker = Walker::new(dir.path(), WalkerConfig::new("txt").unwrap());

    assert_eq!(walker.count_candidates(), 4);
    assert_eq!(walker.walk().filter_map(Result::ok).count(), 3);
}

#[test]
fn test_empty_directory() {
    let dir = tempdir().unwrap();
    let result = run(
        ScanConfig::new(dir.path().to_path_buf(), ".anything")
            .with_detect_duplicates(true)
            .with_content_hash(true),
    );

    assert!(result.files.is_empty());
    assert!(result.groups.is_empty());
    assert!(!result.has_warnings());
    assert_eq!(result.candidates_total, 0);
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_followed_only_on_request() {
    let dir = tempdir().unwrap();
    let outside = tempdir().unwrap();
    write(outside.path(), "linked.txt", b"x");
    std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
    write(dir.path(), "local.txt", b"y");

    let plain = run(ScanConfig::new(dir.path().to_path_buf(), "txt"));
    let followed = run(ScanConfig::new(dir.path().to_path_buf(), "txt").with_follow_symlinks(true));

    assert_eq!(plain.files.len(), 1);
    assert_eq!(followed.files.len(), 2);
}
