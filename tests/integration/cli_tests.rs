use clap::Parser;
use filesift::cli::Cli;
use filesift::error::ExitCode;
use filesift::{exit_code_for, run_app};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn scenario_tree() -> TempDir {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/x.txt", b"hi");
    write(dir.path(), "b/x.txt", b"hi");
    write(dir.path(), "c/y.txt", b"bye");
    dir
}

/// Run quietly with an empty settings file so the user's config is ignored.
fn run(settings: &Path, args: &[&str]) -> anyhow::Result<ExitCode> {
    let settings_file = settings.join("settings.toml");
    if !settings_file.exists() {
        fs::write(&settings_file, "").unwrap();
    }
    let mut argv = vec!["filesift", "-q", "--config", settings_file.to_str().unwrap()];
    argv.extend_from_slice(args);
    run_app(Cli::try_parse_from(argv).unwrap())
}

#[test]
fn test_scan_succeeds_and_writes_report() {
    let dir = scenario_tree();
    let settings = tempdir().unwrap();
    let root = dir.path().to_str().unwrap();

    let code = run(settings.path(), &["scan", root, "--type", "txt", "-d", "--content-hash"]).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(dir.path().join("file_search_results.csv").exists());
}

#[test]
fn test_scan_html_with_delete() {
    let dir = scenario_tree();
    let settings = tempdir().unwrap();
    let root = dir.path().to_str().unwrap();

    let code = run(
        settings.path(),
        &["scan", root, "--type", ".TXT", "-d", "--delete-duplicates", "--format", "html"],
    )
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(dir.path().join("file_search_results.html").exists());
    assert!(dir.path().join("a/x.txt").exists());
    assert!(!dir.path().join("b/x.txt").exists());
}

#[test]
fn test_settings_file_supplies_defaults() {
    let dir = scenario_tree();
    let settings = tempdir().unwrap();
    fs::write(
        settings.path().join("settings.toml"),
        "report_basename = \"listing\"\ndefault_format = \"html\"\n",
    )
    .unwrap();
    let root = dir.path().to_str().unwrap();

    let code = run(settings.path(), &["scan", root, "--type", "txt"]).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(dir.path().join("listing.html").exists());
}

#[test]
fn test_missing_root_is_invalid_input() {
    let settings = tempdir().unwrap();
    let missing = settings.path().join("does-not-exist");

    let err = run(settings.path(), &["scan", missing.to_str().unwrap(), "--type", "txt"]).unwrap_err();

    assert_eq!(exit_code_for(&err), ExitCode::InvalidInput);
}

#[test]
fn test_blank_suffix_is_invalid_input() {
    let dir = scenario_tree();
    let settings = tempdir().unwrap();

    let err = run(settings.path(), &["scan", dir.path().to_str().unwrap(), "--type", " "]).unwrap_err();

    assert_eq!(exit_code_for(&err), ExitCode::InvalidInput);
}

#[test]
fn test_missing_config_file_is_invalid_input() {
    let dir = scenario_tree();
    let cli = Cli::try_parse_from([
        "filesift",
        "-q",
        "--config",
        "/nonexistent/filesift.toml",
        "scan",
        dir.path().to_str().unwrap(),
        "--type",
        "txt",
    ])
    .unwrap();

    let err = run_app(cli).unwrap_err();

    assert_eq!(exit_code_for(&err), ExitCode::InvalidInput);
}

#[cfg(unix)]
#[test]
fn test_unwritable_report_is_general_error() {
    use std::os::unix::fs::PermissionsExt;

    let dir = scenario_tree();
    let settings = tempdir().unwrap();
    let locked = tempdir().unwrap();
    fs::set_permissions(locked.path(), fs::Permissions::from_mode(0o555)).unwrap();
    // root ignores permission bits
    if fs::write(locked.path().join("write-check"), b"").is_ok() {
        return;
    }
    let report = locked.path().join("report.csv");

    let err = run(
        settings.path(),
        &[
            "scan",
            dir.path().to_str().unwrap(),
            "--type",
            "txt",
            "--report",
            report.to_str().unwrap(),
        ],
    )
    .unwrap_err();

    fs::set_permissions(locked.path(), fs::Permissions::from_mode(0o755)).unwrap();
    assert_eq!(exit_code_for(&err), ExitCode::GeneralError);
    assert!(!report.exists());
}

#[test]
fn test_config_init_writes_file() {
    let settings = tempdir().unwrap();
    let path = settings.path().join("fresh/config.toml");
    let cli = Cli::try_parse_from([
        "filesift",
        "-q",
        "--config",
        path.to_str().unwrap(),
        "config",
        "--init",
    ])
    .unwrap();

    let code = run_app(cli).unwrap();

    assert_eq!(code, ExitCode::Success);
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("copy_dir_name = \"copied_files\""));
}
