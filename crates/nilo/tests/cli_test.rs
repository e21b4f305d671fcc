//! Integration tests for the `nilo` CLI binary.
//!
//! Argument parsing, help, completions and error exits, plus one listing
//! against a mock inventory API.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// A `nilo` command that never sees the user's config or environment.
fn nilo_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("nilo");
    cmd.env("HOME", "/tmp/nilo-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/nilo-cli-test-nonexistent")
        .env_remove("NILO_PROFILE")
        .env_remove("NILO_API_URL")
        .env_remove("NILO_TENANT")
        .env_remove("NILO_API_KEY")
        .env_remove("NILO_OUTPUT")
        .env_remove("NILO_INSECURE")
        .env_remove("NILO_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = nilo_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    nilo_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("devices")
            .and(predicate::str::contains("clients"))
            .and(predicate::str::contains("authorize"))
            .and(predicate::str::contains("keys")),
    );
}

#[test]
fn test_version_flag() {
    nilo_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nilo"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    nilo_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    nilo_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = nilo_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_devices_without_profile_points_at_init() {
    nilo_cmd()
        .arg("devices")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config init"));
}

#[test]
fn test_unknown_profile_is_reported() {
    nilo_cmd()
        .args(["--profile", "nope", "sites"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_config_show_no_config() {
    nilo_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_all_pages_conflicts_with_page() {
    let output = nilo_cmd()
        .args(["clients", "--all", "--page", "2"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("cannot be used with"));
}

#[test]
fn test_invalid_output_format() {
    let output = nilo_cmd()
        .args(["--output", "invalid", "sites"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("possible values"));
}

#[test]
fn test_unknown_status_rejected_before_any_request() {
    // Nothing listens on port 9; reaching the network would fail differently
    nilo_cmd()
        .args([
            "--api-url",
            "http://127.0.0.1:9/api/",
            "--api-key",
            "k",
            "authorize",
            "--id",
            "c1",
            "--mac",
            "AA:BB:CC:DD:EE:FF",
            "--status",
            "Maybe",
            "--segment",
            "seg-1",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Maybe"));
}

// ── Against a mock backend ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_sites_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sites"))
        .and(header("x-nile-api-key", "cli-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": [
            {"id": "S1", "name": "HQ"},
            {"id": "S2", "name": "Lab"}
        ]})))
        .expect(1)
        .mount(&server)
        .await;

    let api_url = format!("{}/api/", server.uri());
    let output = tokio::task::spawn_blocking(move || {
        nilo_cmd()
            .args(["--api-url", &api_url, "--api-key", "cli-key", "-o", "json", "sites"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let sites: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(sites[0]["id"], "S1");
    assert_eq!(sites[1]["name"], "Lab");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sites_plain_prints_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "S1", "name": "HQ"}
        ])))
        .mount(&server)
        .await;

    let api_url = format!("{}/api/", server.uri());
    let output = tokio::task::spawn_blocking(move || {
        nilo_cmd()
            .args(["--api-url", &api_url, "--api-key", "k", "-o", "plain", "sites"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "S1");
}
