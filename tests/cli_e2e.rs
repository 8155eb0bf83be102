//! End-to-end CLI tests for the fetcher binary.

// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

fn fetcher() -> Command {
    let mut cmd = Command::cargo_bin("fetcher").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

async fn mount_ok_and_missing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/ok.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

/// Test that the binary exits 0 when there is nothing to download.
#[test]
fn test_binary_empty_stdin_returns_zero() {
    fetcher().write_stdin("").assert().success();
}

#[test]
fn test_binary_help_displays_usage() {
    fetcher()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fetch a batch of files"))
        .stdout(predicate::str::contains("--workers"));
}

#[test]
fn test_binary_version_displays_version() {
    fetcher()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetcher"));
}

#[test]
fn test_binary_invalid_flag_returns_usage_error() {
    let assert = fetcher()
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
    assert_eq!(assert.get_output().status.code(), Some(2));
}

#[test]
fn test_binary_inverted_delays_exit_with_config_error() {
    let assert = fetcher()
        .args(["--min-delay", "5", "--max-delay", "1", "http://127.0.0.1:9/never.bin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("min_delay"));
    assert_eq!(assert.get_output().status.code(), Some(2));
}

#[test]
fn test_binary_zero_workers_exit_with_config_error() {
    let assert = fetcher()
        .args(["-w", "0", "http://127.0.0.1:9/never.bin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("worker limit"));
    assert_eq!(assert.get_output().status.code(), Some(2));
}

#[test]
fn test_binary_missing_input_file_fails() {
    fetcher()
        .args(["--input", "/definitely/not/here/urls.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read input file"));
}

#[tokio::test]
async fn test_binary_downloads_positional_url() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_ok_and_missing(&mock_server).await;
    let tempdir = TempDir::new().unwrap();

    fetcher()
        .args(["--min-delay", "0", "--max-delay", "0", "--no-progress"])
        .arg("--output-dir")
        .arg(tempdir.path())
        .arg(format!("{}/ok.txt", mock_server.uri()))
        .assert()
        .success()
        .stdout(predicate::str::contains("1 succeeded, 0 failed, 1 total"));

    assert_eq!(
        std::fs::read(tempdir.path().join("ok.txt")).unwrap(),
        b"hello"
    );
}

#[tokio::test]
async fn test_binary_reads_urls_from_stdin_and_input_file() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_ok_and_missing(&mock_server).await;
    let tempdir = TempDir::new().unwrap();
    let out = tempdir.path().join("out");
    let list = tempdir.path().join("urls.txt");
    std::fs::write(
        &list,
        format!("# test list\n\n{}/ok.txt\n", mock_server.uri()),
    )
    .unwrap();

    fetcher()
        .args(["--min-delay", "0", "--max-delay", "0", "-q"])
        .arg("--input")
        .arg(&list)
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success();
    assert!(out.join("ok.txt").exists());

    fetcher()
        .args(["--min-delay", "0", "--max-delay", "0", "-q"])
        .arg("--output-dir")
        .arg(&out)
        .write_stdin(format!("{}/ok.txt\n", mock_server.uri()))
        .assert()
        .success();
    assert!(out.join("ok_1.txt").exists());
}

/// Partial failure exits 1 and the JSON report names the failure category.
#[tokio::test]
async fn test_binary_partial_failure_json_report_exit_one() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_ok_and_missing(&mock_server).await;
    let tempdir = TempDir::new().unwrap();

    let assert = fetcher()
        .args(["--min-delay", "0", "--max-delay", "0", "--json"])
        .arg("--output-dir")
        .arg(tempdir.path())
        .arg(format!("{}/ok.txt", mock_server.uri()))
        .arg(format!("{}/missing.txt", mock_server.uri()))
        .assert()
        .failure();
    let output = assert.get_output();
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["succeeded"], 1);
    assert_eq!(report["failed"], 1);
    let outcomes = report["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0]["status"], "succeeded");
    assert_eq!(outcomes[1]["status"], "failed");
    assert_eq!(outcomes[1]["code"], "http_error");
    assert_eq!(outcomes[1]["category"]["kind"], "http_error");
    assert_eq!(outcomes[1]["category"]["status"], 404);
    assert_eq!(outcomes[1]["attempts"], 3);
}
