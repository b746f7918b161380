//! End-to-end CLI tests using `assert_cmd`
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get cargo binary or fail test
fn cargo_bin() -> Command {
    Command::cargo_bin("wordlens").unwrap_or_else(|err| panic!("Binary not found: {err}"))
}

/// Helper to create temp dir or fail test
fn temp_dir() -> TempDir {
    TempDir::new().unwrap_or_else(|err| panic!("Failed to create temp dir: {err}"))
}

/// Binary isolated from the caller's environment, homed in `home`.
fn wordlens_in(home: &TempDir) -> Command {
    let mut cmd = cargo_bin();
    cmd.env_remove("WORDLENS_API_KEY")
        .env_remove("WORDLENS_BASE_URL")
        .env_remove("RUST_LOG")
        .arg("--home")
        .arg(home.path());
    cmd
}

#[test]
fn test_cli_help() {
    cargo_bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("nearest"))
        .stdout(predicate::str::contains("bulk-images"))
        .stdout(predicate::str::contains("key"));
}

#[test]
fn test_cli_invalid_command() {
    cargo_bin().arg("invalid-command-xyz").assert().failure();
}

#[test]
fn test_key_round_trip() {
    let home = temp_dir();

    wordlens_in(&home)
        .args(["key", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No API key configured"));

    wordlens_in(&home)
        .args(["key", "set", "abcd1234wxyz"])
        .assert()
        .success();
    let settings = fs::read_to_string(home.path().join("settings.toml")).expect("settings file");
    assert!(settings.contains("abcd1234wxyz"));

    wordlens_in(&home)
        .args(["key", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("settings"))
        .stdout(predicate::str::contains("abcd1234wxyz").not());

    wordlens_in(&home)
        .args(["key", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed"));

    wordlens_in(&home)
        .args(["key", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No API key configured"));
}

#[test]
fn test_env_key_is_reported_as_source() {
    let home = temp_dir();

    wordlens_in(&home)
        .env("WORDLENS_API_KEY", "from-environment-key")
        .args(["key", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("environment"));
}

#[test]
fn test_blank_key_is_rejected() {
    let home = temp_dir();

    wordlens_in(&home)
        .args(["key", "set", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not be empty"));
}

#[test]
fn test_blank_words_are_rejected() {
    let home = temp_dir();

    wordlens_in(&home)
        .args(["nearest", " , "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Enter at least one word."));
}

#[test]
fn test_missing_key_fails_before_network() {
    let home = temp_dir();

    wordlens_in(&home)
        .args(["--base-url", "http://127.0.0.1:9", "embed", "cat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key configured"));
}

#[test]
fn test_unreachable_server_reports_connection_problem() {
    let home = temp_dir();

    wordlens_in(&home)
        .env("WORDLENS_API_KEY", "some-key")
        .args(["--base-url", "http://127.0.0.1:9", "nearest", "cat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not reach the server"));
}

#[test]
fn test_config_file_is_created_in_home() {
    let home = temp_dir();

    wordlens_in(&home).args(["key", "show"]).assert().success();

    let config = fs::read_to_string(home.path().join("config.toml")).expect("config file");
    assert!(config.contains("base_url"));
}
