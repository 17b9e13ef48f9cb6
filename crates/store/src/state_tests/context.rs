// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use wonder_core::decision::ContextWrite;
use wonder_core::{ContextPath, MergeStrategy, WaitFor};

fn write(path: &str, value: serde_json::Value) -> ContextWrite {
    ContextWrite { path: ContextPath::parse(path).unwrap(), value }
}

#[test]
fn set_context_field_writes_section() {
    let mut state = RunState::default();
    apply(
        &mut state,
        Decision::SetContextField { write: write("state.answer", json!(42)) },
    );
    assert_eq!(state.context.state["answer"], 42);
}

#[test]
fn output_mapping_applies_all_writes() {
    let mut state = RunState::default();
    let trace = apply(
        &mut state,
        Decision::ApplyOutputMapping {
            token_id: TokenId::from_seq(0),
            writes: vec![
                write("state.a", json!(1)),
                write("output.b.c", json!("x")),
            ],
        },
    );
    assert_eq!(state.context.state["a"], 1);
    assert_eq!(state.context.output["b"]["c"], "x");
    assert_eq!(trace[0].name, "operation.context.output_mapped");
}

#[test]
fn branch_table_lifecycle() {
    let mut state = RunState::default();
    let id = TokenId::from_seq(3);

    apply(&mut state, Decision::InitBranchTable { token_id: id });
    assert_eq!(state.branch_outputs.get(&id), Some(&json!({})));

    apply(
        &mut state,
        Decision::ApplyBranchOutput { token_id: id, output: json!({"x": 3}) },
    );
    assert_eq!(state.branch_outputs.get(&id), Some(&json!({"x": 3})));

    let trace = apply(&mut state, Decision::DropBranchTables { token_ids: vec![id] });
    assert!(state.branch_outputs.is_empty());
    assert_eq!(trace[0].name, "operation.context.branch_table.dropped");
}

#[test]
fn init_branch_table_preserves_existing_output() {
    let mut state = RunState::default();
    let id = TokenId::from_seq(3);
    apply(
        &mut state,
        Decision::ApplyBranchOutput { token_id: id, output: json!({"x": 1}) },
    );
    apply(&mut state, Decision::InitBranchTable { token_id: id });
    assert_eq!(state.branch_outputs.get(&id), Some(&json!({"x": 1})));
}

#[test]
fn merge_branches_writes_target_and_counts() {
    let mut state = RunState::default();
    apply(
        &mut state,
        Decision::TryCreateFanIn {
            sibling_group: "0.split".into(),
            fan_in_node_id: NodeId::new("branch"),
            wait_for: WaitFor::All,
            total: 2,
            deadline_at_ms: None,
        },
    );

    let merged = wonder_core::merge::merge_branches(
        MergeStrategy::Append,
        &[(0, json!({"x": 0})), (1, json!({"x": 1}))],
    );
    let trace = apply(
        &mut state,
        Decision::MergeBranches {
            sibling_group: "0.split".into(),
            fan_in_node_id: NodeId::new("branch"),
            source_tokens: vec![TokenId::from_seq(1), TokenId::from_seq(2)],
            target: ContextPath::parse("state.results").unwrap(),
            merged,
        },
    );

    assert_eq!(state.context.state["results"], json!([{"x": 0}, {"x": 1}]));
    let rec = state.fan_in("0.split", &NodeId::new("branch")).unwrap();
    assert_eq!(rec.merge_count, 1);
    assert_eq!(trace[0].name, "operation.context.merged");
}

#[test]
fn view_combines_sections() {
    let mut state = RunState::default();
    apply(
        &mut state,
        Decision::SetContextField { write: write("input.q", json!("hi")) },
    );
    apply(
        &mut state,
        Decision::SetContextField { write: write("state.n", json!(2)) },
    );
    let view = state.context.view();
    assert_eq!(view["input"]["q"], "hi");
    assert_eq!(view["state"]["n"], 2);
    assert!(view["output"].is_object());
}

#[test]
fn drop_missing_tables_reports_zero() {
    let mut state = RunState::default();
    let trace = apply(
        &mut state,
        Decision::DropBranchTables { token_ids: vec![TokenId::from_seq(8)] },
    );
    assert_eq!(trace[0].data["count"], 0);
}
