// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::types::DiffKind;

#[test]
fn error_response_round_trips() {
    let response = Response::Error { message: "unknown definition".into() };
    let json = serde_json::to_string(&response).unwrap();
    let back: Response = serde_json::from_str(&json).unwrap();
    assert_eq!(back, response);
}

#[test]
fn diff_entries_serialize_kind_snake_case() {
    let response = Response::Diff {
        entries: vec![DiffEntry {
            kind: DiffKind::Changed,
            element: "node:review".into(),
            detail: Some("action changed".into()),
        }],
    };
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["entries"][0]["kind"], "changed");
}

#[test]
fn status_defaults_runs_to_empty() {
    let json = r#"{"type":"Status","uptime_secs":5,"defs":2}"#;
    let response: Response = serde_json::from_str(json).unwrap();
    match response {
        Response::Status { runs, defs, uptime_secs } => {
            assert!(runs.is_empty());
            assert_eq!(defs, 2);
            assert_eq!(uptime_secs, 5);
        }
        other => panic!("unexpected: {other:?}"),
    }
}
