//! CLI tests - stack file editing, validation and simulation runs

mod common;

use common::{add_contributor, setup_gap_stack, setup_stack, tolstack};
use predicates::prelude::*;
use std::fs;

// ============================================================================
// Basic Commands
// ============================================================================

#[test]
fn test_help_displays() {
    tolstack()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Monte Carlo tolerance stackup"));
}

#[test]
fn test_version_displays() {
    tolstack()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tolstack"));
}

#[test]
fn test_completions_bash() {
    tolstack()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tolstack"));
}

#[test]
fn test_completions_to_dir() {
    let tmp = tempfile::TempDir::new().unwrap();
    tolstack()
        .args(["completions", "zsh", "--dir"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote zsh completions"));
    assert!(tmp.path().join("_tolstack").exists());
}

// ============================================================================
// Stack File Editing
// ============================================================================

#[test]
fn test_new_creates_versioned_file() {
    let (_tmp, path) = setup_stack("linear", &["--lsl", "4.8", "--usl", "5.2"]);

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("schema_version: 1"));
    assert!(content.contains("title: Gap"));
    assert!(content.contains("kind: linear"));
    assert!(content.contains("author: Test Author"));
    assert!(content.contains("id: STK-"));
}

#[test]
fn test_new_refuses_to_overwrite() {
    let (tmp, _path) = setup_stack("linear", &[]);

    tolstack()
        .current_dir(tmp.path())
        .args(["new", "gap.yaml", "--title", "Again"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    tolstack()
        .current_dir(tmp.path())
        .args(["new", "gap.yaml", "--title", "Again", "--force"])
        .assert()
        .success();
}

#[test]
fn test_new_rejects_inverted_limits() {
    let tmp = tempfile::TempDir::new().unwrap();
    tolstack()
        .current_dir(tmp.path())
        .args(["new", "bad.yaml", "--lsl", "5", "--usl", "4"])
        .assert()
        .failure();
    assert!(!tmp.path().join("bad.yaml").exists());
}

#[test]
fn test_add_contributors() {
    let (tmp, path) = setup_stack("linear", &[]);

    tolstack()
        .current_dir(tmp.path())
        .args(["add", "gap.yaml", "--label", "Housing", "--nominal", "10", "--tol", "0.3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added"))
        .stdout(predicate::str::contains("Housing"));

    add_contributor(
        &tmp,
        &[
            "--label",
            "Shim",
            "--dist",
            "uniform",
            "--min",
            "-0.1",
            "--max",
            "0.1",
            "--direction",
            "negative",
        ],
    );

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("label: Housing"));
    assert!(content.contains("type: normal"));
    assert!(content.contains("type: uniform"));
    assert!(content.contains("direction: negative"));
    assert!(content.contains("revision: 3"));
}

#[test]
fn test_add_rejects_invalid_distribution() {
    let (tmp, path) = setup_stack("linear", &[]);
    let before = fs::read_to_string(&path).unwrap();

    tolstack()
        .current_dir(tmp.path())
        .args(["add", "gap.yaml", "--label", "Bad", "--mean", "1", "--std", "-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("scale must be > 0"));

    // Window that holds essentially no probability mass
    tolstack()
        .current_dir(tmp.path())
        .args([
            "add", "gap.yaml", "--label", "Far", "--mean", "0", "--std", "1", "--lower", "50",
            "--upper", "60",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("negligible"));

    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn test_add_radial_placements() {
    let (tmp, path) = setup_stack("radial", &["--usl", "0.05"]);

    add_contributor(&tmp, &["--label", "Bearing", "--mean", "0.01", "--std", "0.003"]);
    add_contributor(
        &tmp,
        &["--label", "Shaft", "--mean", "0.02", "--std", "0.002", "--angle", "90"],
    );

    tolstack()
        .current_dir(tmp.path())
        .args(["add", "gap.yaml", "--label", "Bad", "--mean", "1", "--std", "0.1", "--direction", "negative"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("linear stacks"));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("mode: random"));
    assert!(content.contains("mode: fixed"));
    assert!(content.contains("angle: 90"));
}

#[test]
fn test_rm_by_label_and_index() {
    let (tmp, path) = setup_gap_stack();

    tolstack()
        .current_dir(tmp.path())
        .args(["rm", "gap.yaml", "housing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));

    tolstack()
        .current_dir(tmp.path())
        .args(["rm", "gap.yaml", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no contributor matches"));

    tolstack()
        .current_dir(tmp.path())
        .args(["rm", "gap.yaml", "1"])
        .assert()
        .success();

    let content = fs::read_to_string(&path).unwrap();
    assert!(!content.contains("Housing"));
    assert!(!content.contains("Shaft"));
}

#[test]
fn test_show_formats() {
    let (tmp, _path) = setup_gap_stack();

    tolstack()
        .current_dir(tmp.path())
        .args(["show", "gap.yaml", "-f", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Contributors (2)"))
        .stdout(predicate::str::contains("N(10, 0.1)"))
        .stdout(predicate::str::contains("RSS"));

    let output = tolstack()
        .current_dir(tmp.path())
        .args(["show", "gap.yaml", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["contributors"].as_array().unwrap().len(), 2);
    assert_eq!(json["schema_version"], 1);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_validate_ok_and_empty() {
    let (tmp, _path) = setup_gap_stack();
    tolstack()
        .current_dir(tmp.path())
        .args(["validate", "gap.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓"));

    fs::copy(tmp.path().join("gap.yaml"), tmp.path().join("copy.yaml")).unwrap();
    tolstack()
        .current_dir(tmp.path())
        .args(["new", "empty.yaml"])
        .assert()
        .success();
    tolstack()
        .current_dir(tmp.path())
        .args(["validate", "copy.yaml", "empty.yaml"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("no contributors"))
        .stderr(predicate::str::contains("1 of 2"));
}

#[test]
fn test_validate_rejects_unknown_schema_version() {
    let (tmp, path) = setup_gap_stack();
    let content = fs::read_to_string(&path).unwrap();
    fs::write(&path, content.replace("schema_version: 1", "schema_version: 2")).unwrap();

    tolstack()
        .current_dir(tmp.path())
        .args(["validate", "gap.yaml"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("unsupported schema_version 2"));
}

// ============================================================================
// Simulation Runs
// ============================================================================

#[test]
fn test_run_text_report() {
    let (tmp, _path) = setup_gap_stack();

    tolstack()
        .current_dir(tmp.path())
        .args(["run", "gap.yaml", "-n", "20000", "--seed", "1", "-f", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("seed 1"))
        .stdout(predicate::str::contains("Monte Carlo"))
        .stdout(predicate::str::contains("Cpk="))
        .stdout(predicate::str::contains("Sensitivity"));
}

#[test]
fn test_run_json_is_reproducible() {
    let (tmp, _path) = setup_gap_stack();
    let run = |workers: &str| {
        let output = tolstack()
            .current_dir(tmp.path())
            .args(["run", "gap.yaml", "-n", "5000", "--seed", "42", "-f", "json", "-j", workers])
            .output()
            .unwrap();
        assert!(output.status.success());
        serde_json::from_slice::<serde_json::Value>(&output.stdout).unwrap()
    };

    let first = run("1");
    let second = run("4");
    assert_eq!(first["seed"], 42);
    assert_eq!(first["samples"], 5000);
    assert_eq!(first["summary"], second["summary"]);
    assert_eq!(first["histogram"], second["histogram"]);

    let mean = first["summary"]["mean"].as_f64().unwrap();
    assert!((mean - 5.0).abs() < 0.01);
    assert!(first["summary"]["spec"]["cpk"].as_f64().is_some());
}

#[test]
fn test_run_custom_percentiles_and_limits() {
    let (tmp, _path) = setup_gap_stack();
    let output = tolstack()
        .current_dir(tmp.path())
        .args([
            "run",
            "gap.yaml",
            "-n",
            "2000",
            "--seed",
            "3",
            "--percentiles",
            "0,50,100",
            "--custom-lsl",
            "4.9",
            "--custom-usl",
            "5.1",
            "-f",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    let summary = &report["summary"];
    assert_eq!(summary["percentiles"].as_array().unwrap().len(), 3);
    assert_eq!(summary["percentiles"][0]["value"], summary["min"]);
    assert_eq!(summary["percentiles"][2]["value"], summary["max"]);
    assert_eq!(summary["custom"]["limits"]["lower"], 4.9);
}

#[test]
fn test_run_export_csv() {
    let (tmp, _path) = setup_gap_stack();

    tolstack()
        .current_dir(tmp.path())
        .args([
            "run", "gap.yaml", "-n", "100", "--seed", "9", "--export", "samples.csv", "-f", "text",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 100 samples"));

    let csv = fs::read_to_string(tmp.path().join("samples.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "index,value");
    assert_eq!(lines.len(), 101);
}

#[test]
fn test_run_radial_with_plot() {
    let (tmp, _path) = setup_stack("radial", &["--usl", "0.05"]);
    add_contributor(&tmp, &["--label", "Bearing", "--mean", "0.01", "--std", "0.003"]);
    add_contributor(&tmp, &["--label", "Housing", "--mean", "0.02", "--std", "0.004"]);

    tolstack()
        .current_dir(tmp.path())
        .args([
            "run", "gap.yaml", "-n", "3000", "--seed", "5", "--plot", "--export", "radial.csv",
            "-f", "text",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("eccentricity"))
        .stdout(predicate::str::contains("Radial Outcomes"));

    let csv = fs::read_to_string(tmp.path().join("radial.csv")).unwrap();
    assert!(csv.starts_with("index,x,y,magnitude,angle_deg"));
}

#[test]
fn test_run_empty_stack_fails() {
    let (tmp, _path) = setup_stack("linear", &[]);
    tolstack()
        .current_dir(tmp.path())
        .args(["run", "gap.yaml", "-n", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no contributors"));
}

#[test]
fn test_run_zero_samples_fails() {
    let (tmp, _path) = setup_gap_stack();
    tolstack()
        .current_dir(tmp.path())
        .args(["run", "gap.yaml", "-n", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sample count"));
}

#[test]
fn test_run_oversized_bin_count_fails() {
    let (tmp, _path) = setup_gap_stack();
    tolstack()
        .current_dir(tmp.path())
        .args(["run", "gap.yaml", "-n", "100", "--bins", "1000000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeds the limit"));
}

#[test]
fn test_run_reads_local_config() {
    let (tmp, _path) = setup_gap_stack();
    fs::write(tmp.path().join(".tolstack.yaml"), "samples: 1234\nseed: 77\n").unwrap();

    let output = tolstack()
        .current_dir(tmp.path())
        .args(["run", "gap.yaml", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["samples"], 1234);
    assert_eq!(report["seed"], 77);
}
