//! Shared test helpers for integration tests
//!
//! This module provides common utilities used across all test files.

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to get a tolstack command with a fixed author
pub fn tolstack() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("tolstack"));
    cmd.env("TOLSTACK_AUTHOR", "Test Author")
        .env_remove("TOLSTACK_SAMPLES")
        .env_remove("TOLSTACK_SEED")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to create a stack file in a temp directory
pub fn setup_stack(kind: &str, extra: &[&str]) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("gap.yaml");
    let mut args = vec!["new", "gap.yaml", "--title", "Gap", "--kind", kind];
    args.extend_from_slice(extra);
    tolstack()
        .current_dir(tmp.path())
        .args(&args)
        .assert()
        .success();
    (tmp, path)
}

/// Helper to add a contributor to the stack in `tmp`
pub fn add_contributor(tmp: &TempDir, args: &[&str]) {
    let mut full = vec!["add", "gap.yaml"];
    full.extend_from_slice(args);
    tolstack()
        .current_dir(tmp.path())
        .args(&full)
        .assert()
        .success();
}

/// Helper to build the housing/shaft gap stack used across tests
pub fn setup_gap_stack() -> (TempDir, PathBuf) {
    let (tmp, path) = setup_stack("linear", &["--lsl", "4.7", "--usl", "5.3"]);
    add_contributor(&tmp, &["--label", "Housing", "--mean", "10", "--std", "0.1"]);
    add_contributor(
        &tmp,
        &[
            "--label",
            "Shaft",
            "--mean",
            "5",
            "--std",
            "0.05",
            "--direction",
            "negative",
        ],
    );
    (tmp, path)
}
