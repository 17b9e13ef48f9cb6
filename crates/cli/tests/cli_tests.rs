// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end CLI tests via the built binary.

use assert_cmd::Command;
use serde_json::json;
use std::path::Path;

fn write_def(dir: &Path, name: &str, def: serde_json::Value) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(&def).unwrap()).unwrap();
    path
}

fn linear_def() -> serde_json::Value {
    json!({
        "id": "def-cli-linear",
        "version": 1,
        "name": "cli-linear",
        "initial_node": "a",
        "nodes": [
            {
                "id": "a",
                "name": "a",
                "action": {"kind": "task", "action_id": "action.a"},
                "input_mapping": {"q": "input.q"},
                "output_mapping": {"state.echo": "$"}
            }
        ],
        "transitions": [],
        "output_mapping": {"echo": "state.echo"}
    })
}

fn stdout_of(assert: assert_cmd::assert::Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stdout).into_owned()
}

#[test]
fn check_accepts_valid_definition() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_def(dir.path(), "wf.json", linear_def());

    let assert = Command::cargo_bin("wonder")
        .unwrap()
        .arg("check")
        .arg(&path)
        .assert()
        .success();
    assert!(stdout_of(assert).contains("ok:"));
}

#[test]
fn check_rejects_malformed_json_with_exit_1() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{ not json").unwrap();

    Command::cargo_bin("wonder")
        .unwrap()
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .code(1);
}

#[test]
fn validate_rejects_broken_graph_with_exit_1() {
    let dir = tempfile::tempdir().unwrap();
    let mut def = linear_def();
    def["transitions"] = json!([
        {"id": "t", "from_node": "a", "to_node": "ghost"}
    ]);
    let path = write_def(dir.path(), "broken.json", def);

    // check only parses; validate catches the graph error
    Command::cargo_bin("wonder").unwrap().arg("check").arg(&path).assert().success();
    Command::cargo_bin("wonder")
        .unwrap()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .code(1);
}

#[test]
fn run_executes_workflow_and_prints_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_def(dir.path(), "wf.json", linear_def());

    // The mock executor echoes task input, so the workflow output
    // carries the input value back.
    let assert = Command::cargo_bin("wonder")
        .unwrap()
        .arg("run")
        .arg(&path)
        .args(["--input", r#"{"q": "hello"}"#])
        .assert()
        .success();
    assert!(stdout_of(assert).contains("hello"));
}

#[test]
fn test_command_runs_fixture_cases() {
    let dir = tempfile::tempdir().unwrap();
    write_def(dir.path(), "wf.json", linear_def());
    let fixture = json!({
        "workflow": "wf.json",
        "cases": [
            {
                "name": "echoes input",
                "input": {"q": "ping"},
                "expected_output": {"echo": {"q": "ping"}}
            }
        ]
    });
    let fixture_path = dir.path().join("wf.wtest.json");
    std::fs::write(&fixture_path, serde_json::to_string(&fixture).unwrap()).unwrap();

    let assert = Command::cargo_bin("wonder")
        .unwrap()
        .arg("test")
        .arg(&fixture_path)
        .assert()
        .success();
    assert!(stdout_of(assert).contains("1 case(s) passed"));
}

#[test]
fn failing_fixture_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    write_def(dir.path(), "wf.json", linear_def());
    let fixture = json!({
        "workflow": "wf.json",
        "cases": [
            {"name": "wrong", "input": {"q": 1}, "expected_output": {"echo": "other"}}
        ]
    });
    let fixture_path = dir.path().join("wf.wtest.json");
    std::fs::write(&fixture_path, serde_json::to_string(&fixture).unwrap()).unwrap();

    Command::cargo_bin("wonder")
        .unwrap()
        .arg("test")
        .arg(&fixture_path)
        .assert()
        .failure()
        .code(1);
}

#[test]
fn deploy_without_service_is_a_network_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_def(dir.path(), "wf.json", linear_def());

    Command::cargo_bin("wonder")
        .unwrap()
        .arg("--socket")
        .arg(dir.path().join("absent.sock"))
        .arg("deploy")
        .arg(&path)
        .assert()
        .failure()
        .code(2);
}

#[test]
fn pull_without_service_is_a_network_error() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("wonder")
        .unwrap()
        .arg("--socket")
        .arg(dir.path().join("absent.sock"))
        .args(["pull", "def-anything"])
        .assert()
        .failure()
        .code(2);
}
