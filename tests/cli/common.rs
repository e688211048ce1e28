//! Cross-cutting CLI tests (help, version, error handling)

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help() {
    cargo_bin_cmd!("restruct")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("reStructuredText"));
}

#[test]
fn test_version() {
    cargo_bin_cmd!("restruct")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_no_subcommand() {
    cargo_bin_cmd!("restruct")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_invalid_subcommand() {
    cargo_bin_cmd!("restruct")
        .arg("invalid")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_parse_help() {
    cargo_bin_cmd!("restruct")
        .args(["parse", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Parse"))
        .stdout(predicate::str::contains("--format"));
}

#[test]
fn test_report_level_out_of_range() {
    cargo_bin_cmd!("restruct")
        .args(["parse", "--report", "9"])
        .write_stdin("text\n")
        .assert()
        .failure()
        .code(2);
}
