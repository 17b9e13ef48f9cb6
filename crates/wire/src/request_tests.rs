// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    ping = { Request::Ping, "\"type\":\"Ping\"" },
    status = { Request::Status, "\"type\":\"Status\"" },
    list = { Request::ListDefs, "\"type\":\"ListDefs\"" },
)]
fn unit_requests_tag_by_type(request: Request, fragment: &str) {
    let json = serde_json::to_string(&request).unwrap();
    assert!(json.contains(fragment), "{json}");
    let back: Request = serde_json::from_str(&json).unwrap();
    assert_eq!(back, request);
}

#[test]
fn pull_omits_absent_version() {
    let request = Request::Pull { id: DefId::from_string("def-x"), version: None };
    let json = serde_json::to_string(&request).unwrap();
    assert!(!json.contains("version"));

    let request = Request::Pull { id: DefId::from_string("def-x"), version: Some(3) };
    let json = serde_json::to_string(&request).unwrap();
    assert!(json.contains("\"version\":3"));
}

#[test]
fn deploy_round_trips_definition() {
    let def = sample_def();
    let request = Request::Deploy { def: Box::new(def.clone()) };
    let json = serde_json::to_string(&request).unwrap();
    let back: Request = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Request::Deploy { def: Box::new(def) });
}

fn sample_def() -> WorkflowDef {
    serde_json::from_str(
        r#"{
        "id": "def-sample",
        "version": 1,
        "name": "sample",
        "initial_node": "a",
        "nodes": [{"id": "a", "name": "a"}],
        "transitions": []
    }"#,
    )
    .unwrap()
}
