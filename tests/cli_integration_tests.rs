/// Integration tests for the CLI interface
///
/// Only paths that finish before the PC/SC context is opened are exercised
/// here, so no reader or pcscd is needed.
use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

/// Helper function to create a command for testing
fn bridge_cmd() -> Command {
    Command::cargo_bin("nfc-bridge").expect("Failed to find nfc-bridge binary")
}

#[test]
fn test_help_command() {
    bridge_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Relay NFC card identifiers"))
        .stdout(predicate::str::contains("--beep"))
        .stdout(predicate::str::contains("--keypress"))
        .stdout(predicate::str::contains("--user"))
        .stdout(predicate::str::contains("--systemd"));
}

#[test]
fn test_version_command() {
    bridge_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nfc-bridge"));
}

#[test]
fn test_invalid_flag() {
    bridge_cmd()
        .arg("--no-such-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_invalid_port() {
    bridge_cmd()
        .args(["--port", "not-a-port"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));

    bridge_cmd()
        .args(["--port", "65536"])
        .assert()
        .failure();
}

#[test]
fn test_port_zero_rejected() {
    bridge_cmd()
        .args(["--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("port must not be 0"));
}

#[test]
fn test_zero_timeout_rejected() {
    bridge_cmd()
        .args(["--timeout", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Timeout must be at least one second"));
}

#[test]
fn test_missing_config_file() {
    bridge_cmd()
        .args(["--config", "/nonexistent/nfc-bridge.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_invalid_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{{ not json").unwrap();

    bridge_cmd()
        .arg("--config")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config file"));
}

#[test]
fn test_config_file_with_unknown_field() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"beep": true, "volume": 11}}"#).unwrap();

    bridge_cmd()
        .arg("--config")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config file"));
}

#[test]
fn test_config_file_validated() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"host": ""}}"#).unwrap();

    bridge_cmd()
        .arg("--config")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("host must not be empty"));
}
