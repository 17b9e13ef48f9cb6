// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out spawning and fan-in merging.

use super::*;
use wonder_core::test_support::{fan_out_def, task_node, transition, workflow_def};
use wonder_core::{MergeSpec, MergeStrategy, NodeId, SyncSpec, Transition, WaitFor};

/// src spawns 5 onto branch (wait all, append into state.results), then
/// continues to "after". Each branch writes its whole output at the
/// merge target.
fn append_def(n: u32) -> WorkflowDef {
    let mut def = fan_out_def(n, "results", Some("after"));
    def.nodes[1].output_mapping.insert("state.results".into(), "$".into());
    def
}

#[test]
fn five_branch_append_merge() {
    let mut ctx = Ctx::new(append_def(5));
    ctx.start();

    let plan = ctx.complete(0, json!({}));
    assert_eq!(dispatched(&plan).len(), 5);
    // Five isolated branch tables were created.
    assert_eq!(ctx.run().branch_outputs.len(), 5);
    let branches: Vec<_> = ctx.run().tokens.values().filter(|t| t.node_id == "branch").collect();
    assert_eq!(branches.len(), 5);
    for (i, b) in branches.iter().enumerate() {
        assert_eq!(b.branch_index as usize, i);
        assert_eq!(b.branch_total, 5);
        assert_eq!(b.path_id, format!("0.split.{i}"));
        assert_eq!(b.sibling_group.as_deref(), Some("0.split"));
    }

    // Branches complete in scrambled order; each writes {x: index}.
    let mut activations = 0;
    for token in [3u64, 1, 5, 2, 4] {
        let index = ctx.run().tokens[&seq(token)].branch_index;
        let plan = ctx.complete(token, json!({"x": index}));
        activations += trace_names(&plan)
            .iter()
            .filter(|n| *n == "dispatch.sync.fan_in_activated")
            .count();
    }
    assert_eq!(activations, 1);

    // Merged in branch-index order regardless of arrival order.
    assert_eq!(
        ctx.run().context.state["results"],
        json!([{"x": 0}, {"x": 1}, {"x": 2}, {"x": 3}, {"x": 4}])
    );
    // Branch tables were dropped at the merge.
    assert!(ctx.run().branch_outputs.is_empty());

    // One merged continuation token at the fan-in node, carrying the
    // fan-in lineage.
    let merged: Vec<_> = ctx
        .run()
        .tokens
        .values()
        .filter(|t| t.path_id == "0.split.fanin" && t.node_id == "branch")
        .collect();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].status, TokenStatus::Completed);

    // The continuation dispatched the "after" node.
    let after: Vec<_> = ctx.run().tokens.values().filter(|t| t.node_id == "after").collect();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].status, TokenStatus::Dispatched);
}

#[test]
fn fan_in_record_lifecycle() {
    let mut ctx = Ctx::new(append_def(2));
    ctx.start();
    ctx.complete(0, json!({}));

    assert!(ctx.run().fan_ins.is_empty());
    ctx.complete(1, json!({"x": 0}));

    let rec = ctx.run().fan_in("0.split", &NodeId::new("branch")).unwrap();
    assert_eq!(rec.arrived_count(), 1);
    assert!(!rec.is_activated());
    assert_eq!(ctx.token_status(1), TokenStatus::WaitingForSiblings);

    ctx.complete(2, json!({"x": 1}));
    let rec = ctx.run().fan_in("0.split", &NodeId::new("branch")).unwrap();
    assert!(rec.is_activated());
    assert_eq!(rec.merge_count, 1);
    // Both siblings completed; their work is preserved in the merge.
    assert_eq!(ctx.token_status(1), TokenStatus::Completed);
    assert_eq!(ctx.token_status(2), TokenStatus::Completed);
}

#[test]
fn merged_output_array_length_matches_width() {
    for n in [1u32, 2, 7] {
        let mut ctx = Ctx::new(append_def(n));
        ctx.start();
        ctx.complete(0, json!({}));
        for token in 1..=u64::from(n) {
            let index = ctx.run().tokens[&seq(token)].branch_index;
            ctx.complete(token, json!({"x": index}));
        }
        let results = ctx.run().context.state["results"].as_array().unwrap();
        assert_eq!(results.len(), n as usize, "width {n}");
    }
}

#[test]
fn spawn_count_one_with_sync_still_merges() {
    let mut ctx = Ctx::new(append_def(1));
    ctx.start();
    ctx.complete(0, json!({}));

    let plan = ctx.complete(1, json!({"x": 0}));
    assert!(trace_names(&plan).contains(&"dispatch.sync.fan_in_activated".to_string()));
    assert_eq!(ctx.run().context.state["results"], json!([{"x": 0}]));
}

#[test]
fn sequential_fan_outs_nest_by_lineage() {
    // src fans out onto mid (merge state.outer); the merged continuation
    // fans out again onto leaf (merge state.inner). The second sibling
    // group hangs off the fan-in lineage, and its branch tables are keyed
    // by token id, independent of the first group's.
    let mut def = workflow_def(
        "nested",
        "src",
        vec![task_node("src"), task_node("mid"), task_node("leaf")],
        vec![
            Transition {
                spawn: Some(wonder_core::test_support::spawn_count(2)),
                sync: Some(wonder_core::test_support::sync_all_append("outer")),
                ..transition("outer_split", "src", Some("mid"))
            },
            Transition {
                spawn: Some(wonder_core::test_support::spawn_count(2)),
                sync: Some(SyncSpec {
                    wait_for: WaitFor::All,
                    timeout_ms: None,
                    on_timeout: Default::default(),
                    on_early_complete: Default::default(),
                    merge: MergeSpec {
                        strategy: MergeStrategy::Append,
                        target: "state.inner".into(),
                    },
                }),
                ..transition("inner_split", "mid", Some("leaf"))
            },
        ],
    );
    def.nodes[1].output_mapping.insert("state.outer".into(), "$".into());
    def.nodes[2].output_mapping.insert("state.inner".into(), "$".into());

    let mut ctx = Ctx::new(def);
    ctx.start();
    ctx.complete(0, json!({})); // spawns mid tokens 1 and 2

    // The mid branches rendezvous at their own node before anything
    // fans out further.
    ctx.complete(1, json!({"mid": 0}));
    assert_eq!(ctx.token_status(1), TokenStatus::WaitingForSiblings);
    let plan = ctx.complete(2, json!({"mid": 1}));

    assert_eq!(ctx.run().context.state["outer"], json!([{"mid": 0}, {"mid": 1}]));
    // The merged continuation (token 3) immediately fanned out the
    // second group.
    assert_eq!(dispatched(&plan).len(), 2);
    let leaf_group: Vec<_> = ctx
        .run()
        .tokens
        .values()
        .filter(|t| t.sibling_group.as_deref() == Some("0.outer_split.fanin.inner_split"))
        .collect();
    assert_eq!(leaf_group.len(), 2);

    ctx.complete(4, json!({"leaf": "a"}));
    ctx.complete(5, json!({"leaf": "b"}));
    assert_eq!(ctx.run().context.state["inner"], json!([{"leaf": "a"}, {"leaf": "b"}]));
    assert_eq!(ctx.status(), RunStatus::Completed);
}
