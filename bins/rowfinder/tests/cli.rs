use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const FEATURES: &str = r#"[
    {
        "name": "Line A",
        "geometry_type": "LineString",
        "coordinate_sequences": [[[29.9502, -95.0502, 0], [29.9507, -95.0502, 0]]]
    },
    {
        "name": "Line B",
        "geometry_type": "LineString",
        "coordinates": "-95.05015,29.9502,0 -95.05015,29.9507,0"
    },
    {
        "name": "Line C",
        "geometry_type": "LineString",
        "coordinate_sequences": [[[30.5, -96.0], [30.5005, -96.0]]]
    },
    {
        "name": "Marker",
        "geometry_type": "Point",
        "coordinates": "-95.05,29.95,0"
    }
]"#;

fn rowfinder(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("rowfinder").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("features.json"), FEATURES).unwrap();
    dir
}

#[test]
fn test_help() {
    let dir = tempfile::tempdir().unwrap();
    rowfinder(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("distance"));
}

#[test]
fn test_scan_without_find_pairs_writes_no_report() {
    let dir = workspace();
    rowfinder(dir.path())
        .args(["scan", "features.json", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--find-pairs"));

    assert!(!dir.path().join("outputs").exists());
}

#[test]
fn test_scan_finds_pairs_and_writes_report() {
    let dir = workspace();
    rowfinder(dir.path())
        .args(["scan", "features.json", "--find-pairs", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 matched pair"));

    let report = std::fs::read_to_string(dir.path().join("outputs/lines_in_same_row.txt")).unwrap();
    assert!(report.starts_with("Line A and Line B share the same ROW\n"));
    assert!(report.contains("Angle difference: 0.00 degrees"));
    assert!(!report.contains("Line C"));
}

#[test]
fn test_scan_json_output() {
    let dir = workspace();
    let output = rowfinder(dir.path())
        .args(["scan", "features.json", "--find-pairs", "--format", "json", "-o", "pairs.txt"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["summary"]["features"], 3);
    assert_eq!(value["summary"]["segments"], 3);
    assert_eq!(value["summary"]["pairs"], 1);
    assert_eq!(value["pairs"][0]["name_a"], "Line A");
    assert_eq!(value["pairs"][0]["name_b"], "Line B");
    assert!(value["pairs"][0]["distance_m"].as_f64().unwrap() < 10.0);
    assert!(dir.path().join("pairs.txt").exists());
}

#[test]
fn test_tight_threshold_finds_nothing() {
    let dir = workspace();
    let output = rowfinder(dir.path())
        .args(["scan", "features.json", "--find-pairs", "--proximity", "1", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["summary"]["pairs"], 0);
    assert_eq!(value["stats"]["rejected_distance"], 1);
}

#[test]
fn test_config_file_enables_matching() {
    let dir = workspace();
    let config = r#"
[general]
input = "features.json"
output_dir = "out"

[matching]
find_pairs = true

[report]
format = "json"
file_name = "pairs.json"
"#;
    std::fs::write(dir.path().join("rowfinder.toml"), config).unwrap();

    rowfinder(dir.path()).args(["scan", "--quiet"]).assert().success();

    let report = std::fs::read_to_string(dir.path().join("out/pairs.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(value.as_array().map(Vec::len), Some(1));
}

#[test]
fn test_index_json() {
    let dir = workspace();
    let output = rowfinder(dir.path())
        .args(["index", "features.json", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["segments"], 3);
    assert_eq!(value["cell_size_degrees"], 0.001);
    assert_eq!(value["max_cell_occupancy"], 2);
}

#[test]
fn test_distance_command() {
    let dir = tempfile::tempdir().unwrap();
    let output = rowfinder(dir.path())
        .args([
            "distance", "-37.95103342", "144.42486789", "0", "-37.65282114", "143.92649554", "0",
            "--format", "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let surface = value["surface_distance_m"].as_f64().unwrap();
    assert!((surface - 54_972.271).abs() < 0.01);
    assert_eq!(value["method"], "vincenty");
}

#[test]
fn test_non_array_input_is_input_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("features.json"), r#"{"name": "Line A"}"#).unwrap();

    rowfinder(dir.path())
        .args(["scan", "features.json", "--find-pairs"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("E4001"));
}

#[test]
fn test_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    rowfinder(dir.path())
        .args(["scan", "missing.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_invalid_cell_size_rejected() {
    let dir = workspace();
    rowfinder(dir.path())
        .args(["index", "features.json", "--cell-size", "0"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("cell_size_degrees"));
}

#[test]
fn test_explicit_missing_config() {
    let dir = workspace();
    rowfinder(dir.path())
        .args(["--config", "nope.toml", "index", "features.json"])
        .assert()
        .code(3);
}

#[test]
fn test_report_to_stdout() {
    let dir = workspace();
    rowfinder(dir.path())
        .args(["scan", "features.json", "--find-pairs", "--quiet", "-o", "-"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Line A and Line B share the same ROW\n"))
        .stdout(predicate::str::contains("Distance between segments: "));

    assert!(!dir.path().join("outputs").exists());
}

#[test]
fn test_json_format_switches_logs_and_errors_to_json() {
    let dir = workspace();
    let output = rowfinder(dir.path())
        .args(["scan", "features.json", "--find-pairs", "--format", "json", "-v"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(r#""level":"INFO""#));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["summary"]["pairs"], 1);

    std::fs::write(dir.path().join("bad.json"), "42").unwrap();
    rowfinder(dir.path())
        .args(["scan", "bad.json", "--format", "json"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains(r#""code_str":"E4001""#));
}

#[test]
fn test_small_cell_size_warns_before_indexing() {
    let dir = workspace();
    rowfinder(dir.path())
        .args(["index", "features.json", "--cell-size", "0.00001"])
        .assert()
        .success()
        .stderr(predicate::str::contains("smaller than the proximity threshold"));
}

#[test]
fn test_unknown_report_format() {
    let dir = workspace();
    rowfinder(dir.path())
        .args(["scan", "features.json", "--report-format", "pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown report format 'pdf'"))
        .stderr(predicate::str::contains("Invalid feature input").not());
}
