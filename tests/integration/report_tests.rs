use filesift::output::{build_rows, write_report, ListingOrder, ReportFormat, REPORT_HEADERS};
use filesift::orchestrator::{ScanConfig, ScanOrchestrator, ScanResult};
use filesift::scanner::{hash_to_hex, Hasher};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

const SHA256_HI: &str = "8f434346648f6b96df89dda901c5176b10a6d83961dd3c1ac88b59b2dc327aa4";

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Two content groups plus one singleton.
fn grouped_tree() -> TempDir {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/x.txt", b"hi");
    write(dir.path(), "b/x.txt", b"hi");
    write(dir.path(), "c/y.txt", b"bye");
    write(dir.path(), "d/z.txt", b"zzz");
    write(dir.path(), "e/z-copy.txt", b"zzz");
    dir
}

fn content_scan(root: &Path, format: ReportFormat) -> ScanResult {
    ScanOrchestrator::new(
        ScanConfig::new(root.to_path_buf(), "txt")
            .with_detect_duplicates(true)
            .with_content_hash(true)
            .with_format(format),
    )
    .run()
    .unwrap()
}

fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

fn unescape(cell: &str) -> String {
    cell.replace("&#x2f;", "/")
        .replace("&#x27;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// (path, group id) pairs from the HTML table body.
fn read_html(path: &Path) -> Vec<(String, String)> {
    let html = fs::read_to_string(path).unwrap();
    html.split("<tr class=\"row\">")
        .skip(1)
        .map(|row| {
            let cells: Vec<&str> = row
                .split("<td>")
                .skip(1)
                .map(|cell| cell.split("</td>").next().unwrap())
                .collect();
            (unescape(cells[0]), unescape(cells[3]))
        })
        .collect()
}

#[test]
fn test_csv_report_layout() {
    let dir = grouped_tree();
    let result = content_scan(dir.path(), ReportFormat::Csv);

    let report = result.report_path.clone().unwrap();
    assert_eq!(report, result.root.join("file_search_results.csv"));
    let (headers, rows) = read_csv(&report);
    assert_eq!(headers, REPORT_HEADERS);
    // singleton c/y.txt is not listed
    assert_eq!(rows.len(), 4);
    assert!(rows
        .iter()
        .all(|row| Path::new(&row[0]).file_name().unwrap() != "y.txt"));
    assert!(rows.iter().all(|row| row[2].len() == 64));
}

#[test]
fn test_group_ids_stable_across_formats() {
    let dir = grouped_tree();
    let csv_result = content_scan(dir.path(), ReportFormat::Csv);
    let html_result = content_scan(dir.path(), ReportFormat::Html);

    let (_, rows) = read_csv(csv_result.report_path.as_ref().unwrap());
    let csv_ids: HashMap<String, String> = rows
        .into_iter()
        .map(|row| (row[0].clone(), row[3].clone()))
        .collect();
    let html_ids: HashMap<String, String> =
        read_html(html_result.report_path.as_ref().unwrap()).into_iter().collect();

    assert_eq!(csv_ids.len(), 4);
    assert_eq!(csv_ids, html_ids);

    // one id per group, shared by its members
    let mut per_group: HashMap<String, Vec<String>> = HashMap::new();
    for (path, id) in &csv_ids {
        per_group.entry(id.clone()).or_default().push(path.clone());
    }
    assert_eq!(per_group.len(), 2);
    assert!(per_group.values().all(|members| members.len() == 2));
}

#[test]
fn test_report_digests_match_grouping_digests() {
    let dir = grouped_tree();
    let result = content_scan(dir.path(), ReportFormat::Csv);
    let hasher = Hasher::new();

    for row in build_rows(&result) {
        let group = result
            .groups
            .iter()
            .find(|g| Some(g.id) == row.group_id)
            .unwrap();
        let digest = group.key.digest().unwrap();
        assert_eq!(row.hash, hash_to_hex(digest));
        assert_eq!(row.hash, hash_to_hex(&hasher.full_hash(Path::new(&row.path)).unwrap()));
    }

    let (_, rows) = read_csv(result.report_path.as_ref().unwrap());
    let hi_row = rows.iter().find(|row| row[0].ends_with("x.txt")).unwrap();
    assert_eq!(hi_row[2], SHA256_HI);
}

#[test]
fn test_filename_mode_leaves_hash_column_empty() {
    let dir = grouped_tree();
    let result = ScanOrchestrator::new(ScanConfig::new(dir.path().to_path_buf(), "txt").with_detect_duplicates(true))
        .run()
        .unwrap();

    let (_, rows) = read_csv(result.report_path.as_ref().unwrap());
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row[2].is_empty() && row[3] == "1"));
}

#[test]
fn test_plain_listing_has_every_match() {
    let dir = grouped_tree();
    let result = ScanOrchestrator::new(ScanConfig::new(dir.path().to_path_buf(), "txt"))
        .run()
        .unwrap();

    let (_, rows) = read_csv(result.report_path.as_ref().unwrap());
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|row| row[2].is_empty() && row[3].is_empty()));
    let sizes: Vec<&str> = rows.iter().map(|row| row[1].as_str()).collect();
    assert_eq!(sizes, vec!["2", "2", "3", "3", "3"]);
}

#[test]
fn test_listing_sorted_by_creation_time() {
    let dir = tempdir().unwrap();
    // created in the reverse of walk order
    for rel in ["z/first.txt", "m/second.txt", "a/third.txt"] {
        write(dir.path(), rel, b"data");
        thread::sleep(Duration::from_millis(50));
    }

    let result = ScanOrchestrator::new(
        ScanConfig::new(dir.path().to_path_buf(), "txt").with_listing_order(ListingOrder::Created),
    )
    .run()
    .unwrap();

    let walked: Vec<String> = result.files.iter().map(|f| f.file_name_lossy()).collect();
    assert_eq!(walked, ["third.txt", "second.txt", "first.txt"]);
    let (_, rows) = read_csv(result.report_path.as_ref().unwrap());
    let listed: Vec<&str> = rows
        .iter()
        .map(|row| Path::new(&row[0]).file_name().unwrap().to_str().unwrap())
        .collect();
    assert_eq!(listed, ["first.txt", "second.txt", "third.txt"]);
}

#[test]
fn test_empty_directory_report_is_header_only() {
    for format in [ReportFormat::Csv, ReportFormat::Html] {
        let dir = tempdir().unwrap();
        let result = ScanOrchestrator::new(ScanConfig::new(dir.path().to_path_buf(), ".none").with_format(format))
            .run()
            .unwrap();

        let report = result.report_path.unwrap();
        match format {
            ReportFormat::Csv => {
                let (headers, rows) = read_csv(&report);
                assert_eq!(headers, REPORT_HEADERS);
                assert!(rows.is_empty());
            }
            ReportFormat::Html => {
                let html = fs::read_to_string(&report).unwrap();
                assert!(html.contains("<th>File Path</th>"));
                assert!(read_html(&report).is_empty());
            }
        }
    }
}

#[test]
fn test_custom_report_path() {
    let dir = grouped_tree();
    let out = tempdir().unwrap();
    let target = out.path().join("listing.html");

    let result = ScanOrchestrator::new(
        ScanConfig::new(dir.path().to_path_buf(), "txt")
            .with_format(ReportFormat::Html)
            .with_report_path(target.clone()),
    )
    .run()
    .unwrap();

    assert_eq!(result.report_path, Some(target.clone()));
    assert_eq!(read_html(&target).len(), 5);
    assert!(!dir.path().join("file_search_results.html").exists());
}

#[test]
fn test_rewriting_report_replaces_previous() {
    let dir = grouped_tree();
    let result = content_scan(dir.path(), ReportFormat::Csv);
    let report = result.report_path.clone().unwrap();

    fs::write(&report, "stale contents that are longer than the real report ".repeat(50)).unwrap();
    write_report(&result, ReportFormat::Csv, &report).unwrap();

    let (headers, rows) = read_csv(&report);
    assert_eq!(headers, REPORT_HEADERS);
    assert_eq!(rows.len(), 4);
}
