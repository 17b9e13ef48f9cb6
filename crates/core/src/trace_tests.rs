// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    decision = { TraceEvent::decision("routing.transition_matched", 5), "decision.routing.transition_matched", "decision" },
    operation = { TraceEvent::operation("tokens.created", 5), "operation.tokens.created", "operation" },
    dispatch = { TraceEvent::dispatch("batch.start", 5), "dispatch.batch.start", "dispatch" },
)]
fn constructors_build_layered_names(ev: TraceEvent, name: &str, layer: &str) {
    assert_eq!(ev.name, name);
    assert_eq!(ev.layer(), layer);
    assert_eq!(ev.ts_ms, 5);
    assert_eq!(ev.seq, 0);
}

#[test]
fn fields_accumulate_in_data_object() {
    let ev = TraceEvent::dispatch("batch.complete", 1)
        .field("decisions", 4)
        .field("command", "task_result");
    assert_eq!(ev.data["decisions"], 4);
    assert_eq!(ev.data["command"], "task_result");
}

#[test]
fn token_and_node_attach() {
    let ev = TraceEvent::operation("tokens.status_updated", 9)
        .token(TokenId::from_seq(3))
        .node(NodeId::new("review"));
    assert_eq!(ev.token_id, Some(TokenId::from_seq(3)));
    assert_eq!(ev.node_id, Some(NodeId::new("review")));
}

#[test]
fn serializes_without_empty_fields() {
    let ev = TraceEvent::decision("sync.arrival", 2);
    let json = serde_json::to_value(&ev).unwrap();
    assert!(json.get("token_id").is_none());
    assert!(json.get("data").is_none());
}
