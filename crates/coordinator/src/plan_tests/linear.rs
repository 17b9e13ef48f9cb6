// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Linear workflows: start, advance, complete.

use super::*;
use wonder_core::test_support::{linear_def, routing_node, transition, workflow_def};

#[test]
fn three_node_chain_completes() {
    // a -> b -> c, c terminal
    let mut ctx = Ctx::new(linear_def(&["a", "b", "c"]));

    let plan = ctx.start();
    assert_eq!(dispatched(&plan), vec![seq(0)]);
    assert_eq!(ctx.token_status(0), TokenStatus::Dispatched);
    assert_eq!(ctx.status(), RunStatus::Running);

    let plan = ctx.complete(0, json!({"step": "a"}));
    assert_eq!(dispatched(&plan), vec![seq(1)]);
    assert_eq!(ctx.token_status(0), TokenStatus::Completed);

    let plan = ctx.complete(1, json!({"step": "b"}));
    assert_eq!(dispatched(&plan), vec![seq(2)]);

    let plan = ctx.complete(2, json!({"step": "c"}));
    assert!(dispatched(&plan).is_empty());
    assert_eq!(ctx.status(), RunStatus::Completed);
    assert!(trace_names(&plan).contains(&"dispatch.workflow.completed".to_string()));

    // The lineage stays on one path: every token keeps the root path.
    assert!(ctx.run().tokens.values().all(|t| t.path_id == "0"));
    // Exactly three node completions.
    assert_eq!(
        ctx.run().tokens.values().filter(|t| t.status == TokenStatus::Completed).count(),
        3
    );
}

#[test]
fn node_completed_trace_per_node() {
    let mut ctx = Ctx::new(linear_def(&["a", "b", "c"]));
    ctx.start();
    let mut completions = 0;
    for token in 0..3u64 {
        let plan = ctx.complete(token, json!({}));
        completions += trace_names(&plan)
            .iter()
            .filter(|n| *n == "decision.routing.node_completed")
            .count();
    }
    assert_eq!(completions, 3);
}

#[test]
fn start_is_idempotent() {
    let mut ctx = Ctx::new(linear_def(&["a", "b"]));
    ctx.start();
    let second = ctx.start();
    assert!(second.decisions.iter().all(|d| matches!(d, Decision::ScheduleAlarm { .. })));
    assert!(trace_names(&second).contains(&"dispatch.start.ignored".to_string()));
    assert_eq!(ctx.run().tokens.len(), 1);
}

#[test]
fn mark_executing_moves_token() {
    let mut ctx = Ctx::new(linear_def(&["a", "b"]));
    ctx.start();
    ctx.send(CommandKind::MarkExecuting { token_id: seq(0) });
    assert_eq!(ctx.token_status(0), TokenStatus::Executing);
}

#[test]
fn routing_nodes_pass_through_without_dispatch() {
    // a (task) -> hub (routing) -> b (task)
    let def = workflow_def(
        "hub",
        "a",
        vec![
            wonder_core::test_support::task_node("a"),
            routing_node("hub"),
            wonder_core::test_support::task_node("b"),
        ],
        vec![transition("to_hub", "a", Some("hub")), transition("to_b", "hub", Some("b"))],
    );
    let mut ctx = Ctx::new(def);
    ctx.start();

    // Completing a routes through hub straight to b in one plan.
    let plan = ctx.complete(0, json!({}));
    assert_eq!(dispatched(&plan), vec![seq(2)]);
    assert!(trace_names(&plan).contains(&"decision.routing.pass_through".to_string()));
    assert_eq!(ctx.token_status(1), TokenStatus::Completed); // the hub token
    assert_eq!(ctx.token_status(2), TokenStatus::Dispatched);
}

#[test]
fn output_mapping_writes_shared_context() {
    let mut def = linear_def(&["a", "b"]);
    def.nodes[0].output_mapping.insert("state.answer".into(), "$.text".into());
    let mut ctx = Ctx::new(def);
    ctx.start();

    ctx.complete(0, json!({"text": "forty-two"}));
    assert_eq!(ctx.run().context.state["answer"], "forty-two");
}

#[test]
fn input_mapping_reads_context() {
    let mut def = linear_def(&["a", "b"]);
    def.nodes[1].input_mapping.insert("question".into(), "input.q".into());
    let mut ctx = Ctx::new(def);
    ctx.start_with(json!({"q": "why?"}));

    let plan = ctx.complete(0, json!({}));
    let input = plan
        .decisions
        .iter()
        .find_map(|d| match d {
            Decision::DispatchToken { input, .. } => Some(input.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(input, json!({"question": "why?"}));
}

#[test]
fn workflow_output_mapping_shapes_final_output() {
    let mut def = linear_def(&["a"]);
    def.nodes[0].output_mapping.insert("state.result".into(), "$".into());
    def.output_mapping.insert("result".into(), "state.result".into());
    let mut ctx = Ctx::new(def);
    ctx.start();

    ctx.complete(0, json!({"ok": true}));
    assert_eq!(ctx.status(), RunStatus::Completed);
    assert_eq!(
        ctx.run().status.final_output,
        Some(json!({"result": {"ok": true}}))
    );
}

#[test]
fn invalid_input_fails_the_run() {
    let mut def = linear_def(&["a", "b"]);
    def.input_schema = json!({
        "type": "object",
        "required": ["q"],
        "properties": {"q": {"type": "string"}}
    });
    let mut ctx = Ctx::new(def);
    let plan = ctx.start_with(json!({}));

    assert_eq!(ctx.status(), RunStatus::Failed);
    assert_eq!(ctx.run().status.error.as_ref().unwrap().code, "invalid_input");
    assert!(dispatched(&plan).is_empty());
}

#[test]
fn unknown_token_result_is_dropped() {
    let mut ctx = Ctx::new(linear_def(&["a", "b"]));
    ctx.start();
    let plan = ctx.complete(99, json!({}));
    assert!(plan.decisions.iter().all(|d| matches!(d, Decision::ScheduleAlarm { .. })));
    assert!(trace_names(&plan).contains(&"dispatch.result.unknown_token".to_string()));
}
