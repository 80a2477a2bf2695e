//! Integration tests for the `emsmon` CLI binary.
//!
//! Argument parsing, help output, completions, and error exit codes run
//! without any server. The end-to-end cases drive a local WebSocket server.
#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;

use assert_cmd::cargo::cargo_bin_cmd;
use futures_util::{SinkExt, StreamExt};
use predicates::prelude::*;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `emsmon` binary with env isolation.
///
/// Clears all `EMSMON_*` env vars and points config directories at a
/// temporary path so tests never touch the user's real configuration.
fn emsmon_cmd(home: &tempfile::TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("emsmon");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("EMSMON_PROFILE")
        .env_remove("EMSMON_ENDPOINT")
        .env_remove("EMSMON_TOKEN")
        .env_remove("EMSMON_OUTPUT")
        .env_remove("EMSMON_DEFAULTS__OUTPUT")
        .env_remove("EMSMON_DEFAULTS__COLOR");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// A local port with nothing listening on it.
fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Serve one scripted session per connection: answer the menu request,
/// answer the rtv subscription with one batch, then idle.
async fn spawn_plant() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    let Message::Text(text) = msg else { continue };
                    let request: Value = serde_json::from_str(text.as_str()).unwrap();
                    let reply = match request["func"].as_str() {
                        Some("menu") => json!({
                            "func": "menu",
                            "data": {
                                "d_grid": [{ "chnName": "Grid", "rtvList": [
                                    { "id": 301, "fieldChnName": "Voltage" }
                                ]}],
                                "d_bms": [{ "chnName": "BMS-1", "rtvList": [
                                    { "id": 101, "fieldChnName": "SOC" },
                                    { "id": 102, "fieldChnName": "SOH" }
                                ]}]
                            }
                        }),
                        Some("rtv") => json!({
                            "func": "rtv",
                            "data": [
                                { "id": 101, "value": "87.5" },
                                { "id": 301, "value": 230 }
                            ]
                        }),
                        _ => continue,
                    };
                    if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    addr
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = emsmon_cmd(&home).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    emsmon_cmd(&home).arg("--help").assert().success().stdout(
        predicate::str::contains("tree")
            .and(predicate::str::contains("snapshot"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    emsmon_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("emsmon"));
}

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    emsmon_cmd(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_selection_flags_conflict() {
    let home = tempfile::tempdir().unwrap();
    emsmon_cmd(&home)
        .args(["snapshot", "--group", "bms", "--point", "101"])
        .assert()
        .code(2);
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path() {
    let home = tempfile::tempdir().unwrap();
    emsmon_cmd(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_redacts_token() {
    let home = tempfile::tempdir().unwrap();
    emsmon_cmd(&home)
        .args([
            "config",
            "show",
            "--endpoint",
            "ws://ems.example.net:8888/",
            "--token",
            "SECRET-TOKEN-VALUE",
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("ws://ems.example.net:8888/")
                .and(predicate::str::contains("<redacted>"))
                .and(predicate::str::contains("SECRET-TOKEN-VALUE").not()),
        );
}

#[test]
fn test_config_default_output_applies() {
    let home = tempfile::tempdir().unwrap();
    let args = [
        "--endpoint",
        "ws://ems.example.net:8888/",
        "--token",
        "t",
        "config",
        "show",
    ];

    emsmon_cmd(&home)
        .env("EMSMON_DEFAULTS__OUTPUT", "json-compact")
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(r#"{"profile":"default""#));

    emsmon_cmd(&home)
        .env("EMSMON_DEFAULTS__OUTPUT", "json-compact")
        .args(["-o", "yaml"])
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains("profile: default"));
}

#[test]
fn test_config_set_and_use_persist_profile() {
    let home = tempfile::tempdir().unwrap();

    emsmon_cmd(&home)
        .args(["-p", "site", "config", "set", "endpoint", "ws://ems.example.net:8888/"])
        .assert()
        .success();
    emsmon_cmd(&home)
        .args(["config", "use", "site"])
        .assert()
        .success();

    emsmon_cmd(&home)
        .args(["--token", "t", "-o", "json-compact", "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains(r#""profile":"site""#)
                .and(predicate::str::contains("ws://ems.example.net:8888/")),
        );
}

#[test]
fn test_config_use_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    emsmon_cmd(&home)
        .args(["config", "use", "nowhere"])
        .assert()
        .code(3);
}

// ── Error exit codes ────────────────────────────────────────────────

#[test]
fn test_missing_endpoint_is_config_error() {
    let home = tempfile::tempdir().unwrap();
    let output = emsmon_cmd(&home).arg("tree").output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("No endpoint configured"));
}

#[test]
fn test_unknown_profile_is_config_error() {
    let home = tempfile::tempdir().unwrap();
    let output = emsmon_cmd(&home)
        .args(["--profile", "nowhere", "tree"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("nowhere"));
}

#[test]
fn test_http_endpoint_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    emsmon_cmd(&home)
        .args(["--endpoint", "http://ems.example.net/", "--token", "t", "tree"])
        .assert()
        .code(2);
}

#[test]
fn test_unreachable_endpoint_is_connection_error() {
    let home = tempfile::tempdir().unwrap();
    let endpoint = format!("ws://{}/", closed_port());
    let output = emsmon_cmd(&home)
        .args(["--endpoint", &endpoint, "--token", "t", "tree", "--wait", "1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
    assert!(combined_output(&output).contains("No device menu received"));
}

// ── End to end ──────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_tree_against_local_server() {
    let addr = spawn_plant().await;
    let home = tempfile::tempdir().unwrap();
    let mut cmd = emsmon_cmd(&home);
    cmd.args([
        "--endpoint",
        &format!("ws://{addr}/"),
        "--token",
        "E6F7D5412A20?abc",
        "tree",
        "--wait",
        "5",
    ]);

    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0), "{}", combined_output(&output));
    assert!(stdout.contains("101 - BMS-1"), "{stdout}");
    assert!(stdout.contains("    102 - SOH"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_snapshot_groups_in_fixed_order() {
    let addr = spawn_plant().await;
    let home = tempfile::tempdir().unwrap();
    let mut cmd = emsmon_cmd(&home);
    cmd.args([
        "--endpoint",
        &format!("ws://{addr}/"),
        "--token",
        "E6F7D5412A20?abc",
        "-o",
        "plain",
        "snapshot",
        "--wait",
        "5",
    ]);

    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0), "{}", combined_output(&output));

    let bms = stdout.find("===== d_bms =====").unwrap();
    let grid = stdout.find("===== d_grid =====").unwrap();
    assert!(bms < grid, "{stdout}");
    assert!(stdout.contains("ID: 101  SOC  87.5"), "{stdout}");
    assert!(stdout.contains("ID: 102  SOH  N/A"), "{stdout}");
    assert!(stdout.contains("ID: 301  Voltage  230"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_snapshot_device_selection_as_json() {
    let addr = spawn_plant().await;
    let home = tempfile::tempdir().unwrap();
    let mut cmd = emsmon_cmd(&home);
    cmd.args([
        "--endpoint",
        &format!("ws://{addr}/"),
        "--token",
        "t",
        "-o",
        "json-compact",
        "snapshot",
        "--device",
        "101",
    ]);

    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "{}", combined_output(&output));

    let groups: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(groups.as_array().unwrap().len(), 1);
    assert_eq!(groups[0]["device_type"], "d_bms");
    let ids: Vec<i64> = groups[0]["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![101, 102]);
}
