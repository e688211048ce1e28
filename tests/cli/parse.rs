//! Parse subcommand tests

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const MALFORMED_TABLE: &str = "+---+---+\n| a | b |\n";

#[test]
fn test_parse_stdin() {
    cargo_bin_cmd!("restruct")
        .arg("parse")
        .write_stdin("hello\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("<document source=\"<string>\">"))
        .stdout(predicate::str::contains("<paragraph>"))
        .stdout(predicate::str::contains("hello"));
}

#[test]
fn test_parse_file() {
    let temp_dir = TempDir::new().unwrap();
    let test_file = temp_dir.path().join("doc.rst");
    fs::write(&test_file, "Some *emphasis* here.\n").unwrap();

    cargo_bin_cmd!("restruct")
        .args(["parse", test_file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("doc.rst"))
        .stdout(predicate::str::contains("<emphasis>"));
}

#[test]
fn test_parse_missing_file() {
    cargo_bin_cmd!("restruct")
        .args(["parse", "does-not-exist.rst"])
        .assert()
        .failure();
}

#[test]
fn test_parse_xml_format() {
    cargo_bin_cmd!("restruct")
        .args(["parse", "--format", "xml"])
        .write_stdin("hello\n")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("<?xml version=\"1.0\""))
        .stdout(predicate::str::contains("<document"))
        .stdout(predicate::str::contains("<paragraph>hello</paragraph>"));
}

#[test]
fn test_parse_promotes_title() {
    cargo_bin_cmd!("restruct")
        .arg("parse")
        .write_stdin("Title\n=====\n\nBody.\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("<document ids=\"title\" names=\"title\""))
        .stdout(predicate::str::contains("<section").not());
}

#[test]
fn test_parse_no_doctitle() {
    cargo_bin_cmd!("restruct")
        .args(["parse", "--no-doctitle"])
        .write_stdin("Title\n=====\n\nBody.\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("<section ids=\"title\" names=\"title\">"));
}

#[test]
fn test_parse_no_docinfo() {
    cargo_bin_cmd!("restruct")
        .args(["parse", "--no-docinfo"])
        .write_stdin(":Author: Me\n\nBody.\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("<field_list>"))
        .stdout(predicate::str::contains("<docinfo>").not());
}

#[test]
fn test_parse_reports_errors_to_stderr() {
    cargo_bin_cmd!("restruct")
        .arg("parse")
        .write_stdin(MALFORMED_TABLE)
        .assert()
        .success()
        .stdout(predicate::str::contains("Malformed table."))
        .stderr(predicate::str::contains("(ERROR/3) Malformed table."));
}

#[test]
fn test_parse_report_level_silences_stderr() {
    cargo_bin_cmd!("restruct")
        .args(["parse", "--report", "4"])
        .write_stdin(MALFORMED_TABLE)
        .assert()
        .success()
        .stderr(predicate::str::contains("Malformed table").not());
}

#[test]
fn test_parse_halt_level() {
    cargo_bin_cmd!("restruct")
        .args(["parse", "--halt", "3"])
        .write_stdin(MALFORMED_TABLE)
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Exiting due to level-3 system message."));
}

#[test]
fn test_parse_with_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("custom.toml");
    fs::write(&config_file, "doctitle_xform = false\n").unwrap();

    cargo_bin_cmd!("restruct")
        .args(["parse", "--config", config_file.to_str().unwrap()])
        .write_stdin("Title\n=====\n\nBody.\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("<section ids=\"title\" names=\"title\">"));
}

#[test]
fn test_parse_discovers_config_next_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let test_file = temp_dir.path().join("doc.rst");
    fs::write(&test_file, "Title\n=====\n\nBody.\n").unwrap();
    fs::write(temp_dir.path().join("restruct.toml"), "doctitle_xform = false\n").unwrap();

    cargo_bin_cmd!("restruct")
        .args(["parse", test_file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("<section"));
}

#[test]
fn test_parse_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("broken.toml");
    fs::write(&config_file, "report_level = \"loud\"\n").unwrap();

    cargo_bin_cmd!("restruct")
        .args(["parse", "--config", config_file.to_str().unwrap()])
        .write_stdin("hello\n")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_parse_command_line_overrides_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("custom.toml");
    fs::write(&config_file, "halt_level = 3\n").unwrap();

    cargo_bin_cmd!("restruct")
        .args(["parse", "--halt", "5", "--config", config_file.to_str().unwrap()])
        .write_stdin(MALFORMED_TABLE)
        .assert()
        .success();
}
