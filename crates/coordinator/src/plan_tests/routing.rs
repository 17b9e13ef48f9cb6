// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conditional routing, priority tiers, loops, terminal edges.

use super::*;
use wonder_core::test_support::{linear_def, task_node, transition, workflow_def};
use wonder_core::{LoopSpec, NodeId, SpawnSpec, Transition};

/// a with three outgoing transitions: approved -> b (p1),
/// rejected -> c (p2), default -> d (p3).
fn conditional_def() -> WorkflowDef {
    let mut def = workflow_def(
        "conditional",
        "a",
        vec![task_node("a"), task_node("b"), task_node("c"), task_node("d")],
        vec![
            Transition {
                priority: 1,
                condition: Some("state.approved == true".into()),
                ..transition("to_b", "a", Some("b"))
            },
            Transition {
                priority: 2,
                condition: Some("state.approved == false".into()),
                ..transition("to_c", "a", Some("c"))
            },
            Transition { priority: 3, ..transition("to_d", "a", Some("d")) },
        ],
    );
    def.nodes[0].output_mapping.insert("state.approved".into(), "$.approved".into());
    def
}

#[test]
fn first_matching_tier_wins() {
    let mut ctx = Ctx::new(conditional_def());
    ctx.start();

    // Conditions see the post-mapping context: the task's own output
    // decides the route.
    let plan = ctx.complete(0, json!({"approved": true}));
    assert_eq!(dispatched(&plan), vec![seq(1)]);
    let token = &ctx.run().tokens[&seq(1)];
    assert_eq!(token.node_id, NodeId::new("b"));

    // Neither c nor d was reached.
    assert!(ctx.run().tokens.values().all(|t| t.node_id != "c" && t.node_id != "d"));
}

#[test]
fn lower_tiers_fire_when_upper_misses() {
    let mut ctx = Ctx::new(conditional_def());
    ctx.start();

    let plan = ctx.complete(0, json!({"approved": false}));
    assert_eq!(dispatched(&plan).len(), 1);
    let token = &ctx.run().tokens[&seq(1)];
    assert_eq!(token.node_id, NodeId::new("c"));
}

#[test]
fn default_tier_fires_when_no_condition_matches() {
    let mut ctx = Ctx::new(conditional_def());
    ctx.start();

    let plan = ctx.complete(0, json!({"approved": "maybe"}));
    assert_eq!(dispatched(&plan).len(), 1);
    assert_eq!(ctx.run().tokens[&seq(1)].node_id, NodeId::new("d"));
}

#[test]
fn all_matches_in_winning_tier_fire() {
    // Two unconditioned transitions in the same tier: parallel
    // multi-choice, both targets run.
    let def = workflow_def(
        "multi",
        "a",
        vec![task_node("a"), task_node("b"), task_node("c")],
        vec![
            transition("to_b", "a", Some("b")),
            transition("to_c", "a", Some("c")),
        ],
    );
    let mut ctx = Ctx::new(def);
    ctx.start();

    let plan = ctx.complete(0, json!({}));
    assert_eq!(dispatched(&plan).len(), 2);
    let nodes: Vec<&str> = dispatched(&plan)
        .iter()
        .map(|id| ctx.run().tokens[id].node_id.as_str())
        .collect();
    assert_eq!(nodes, ["b", "c"]);
}

#[test]
fn no_match_with_outgoing_edges_fails_run() {
    let def = workflow_def(
        "stuck",
        "a",
        vec![task_node("a"), task_node("b")],
        vec![Transition {
            condition: Some("state.never == true".into()),
            ..transition("to_b", "a", Some("b"))
        }],
    );
    let mut ctx = Ctx::new(def);
    ctx.start();

    let plan = ctx.complete(0, json!({}));
    assert_eq!(ctx.status(), RunStatus::Failed);
    assert_eq!(
        ctx.run().status.error.as_ref().unwrap().code,
        "no_transition_matched"
    );
    assert!(trace_names(&plan).contains(&"decision.routing.no_match".to_string()));
}

#[test]
fn terminal_edge_ends_the_path() {
    // a -> (terminal edge): matching a transition with no target node
    // ends the path, and with it the run.
    let def = workflow_def(
        "edge",
        "a",
        vec![task_node("a")],
        vec![transition("out", "a", None)],
    );
    let mut ctx = Ctx::new(def);
    ctx.start();

    let plan = ctx.complete(0, json!({}));
    assert!(trace_names(&plan).contains(&"decision.routing.terminal_edge".to_string()));
    assert_eq!(ctx.status(), RunStatus::Completed);
}

#[test]
fn loop_runs_until_max_iterations() {
    // a -> a with max_iterations 3, plus a conditioned exit that never
    // fires: the third re-entry attempt fails the run.
    let def = workflow_def(
        "looper",
        "a",
        vec![task_node("a")],
        vec![Transition {
            loop_config: Some(LoopSpec { max_iterations: 3 }),
            ..transition("again", "a", Some("a"))
        }],
    );
    let mut ctx = Ctx::new(def);
    ctx.start();

    // Iteration 1 was recorded at start; two more loop entries fit.
    ctx.complete(0, json!({}));
    assert_eq!(ctx.status(), RunStatus::Running);
    ctx.complete(1, json!({}));
    assert_eq!(ctx.status(), RunStatus::Running);

    ctx.complete(2, json!({}));
    assert_eq!(ctx.status(), RunStatus::Failed);
    assert_eq!(
        ctx.run().status.error.as_ref().unwrap().code,
        "max_iterations_exceeded"
    );
}

#[test]
fn foreach_binds_items_into_task_input() {
    let mut def = linear_def(&["a", "b"]);
    def.nodes[0].output_mapping.insert("state.items".into(), "$.items".into());
    def.transitions[0].spawn = Some(SpawnSpec::ForEach {
        collection: "state.items".into(),
        item_var: "item".into(),
    });
    def.transitions[0].sync = Some(wonder_core::test_support::sync_all_append("collected"));
    def.nodes[1].output_mapping.insert("state.collected".into(), "$".into());

    let mut ctx = Ctx::new(def);
    ctx.start();

    let plan = ctx.complete(0, json!({"items": ["x", "y", "z"]}));
    let inputs: Vec<Value> = plan
        .decisions
        .iter()
        .filter_map(|d| match d {
            Decision::DispatchToken { input, .. } => Some(input.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(inputs.len(), 3);
    assert_eq!(inputs[0]["item"], "x");
    assert_eq!(inputs[2]["item"], "z");

    // Branch totals match the collection length.
    let branch = &ctx.run().tokens[&seq(1)];
    assert_eq!(branch.branch_total, 3);
    assert_eq!(branch.branch_index, 0);
}

#[test]
fn foreach_over_non_array_fails_run() {
    let mut def = linear_def(&["a", "b"]);
    def.transitions[0].spawn = Some(SpawnSpec::ForEach {
        collection: "state.items".into(),
        item_var: "item".into(),
    });
    let mut ctx = Ctx::new(def);
    ctx.start();

    ctx.complete(0, json!({}));
    assert_eq!(ctx.status(), RunStatus::Failed);
    assert_eq!(ctx.run().status.error.as_ref().unwrap().code, "invalid_input");
}

#[test]
fn task_error_routes_through_conditioned_transition() {
    let def = workflow_def(
        "recover",
        "a",
        vec![task_node("a"), task_node("handler"), task_node("b")],
        vec![
            transition("to_b", "a", Some("b")),
            Transition {
                priority: 1,
                condition: Some("output.error.code == boom".into()),
                ..transition("on_boom", "a", Some("handler"))
            },
        ],
    );
    let mut ctx = Ctx::new(def);
    ctx.start();

    let plan = ctx.fail_task(0, "boom");
    assert_eq!(ctx.status(), RunStatus::Running);
    assert_eq!(ctx.token_status(0), TokenStatus::Failed);
    assert_eq!(dispatched(&plan).len(), 1);
    assert_eq!(ctx.run().tokens[&seq(1)].node_id, NodeId::new("handler"));
    // The unconditioned success edge did not fire.
    assert!(ctx.run().tokens.values().all(|t| t.node_id != "b"));
}

#[test]
fn task_error_without_failure_route_fails_run() {
    let mut ctx = Ctx::new(linear_def(&["a", "b"]));
    ctx.start();

    ctx.fail_task(0, "boom");
    assert_eq!(ctx.status(), RunStatus::Failed);
    assert_eq!(ctx.run().status.error.as_ref().unwrap().code, "boom");
    assert_eq!(ctx.token_status(0), TokenStatus::Failed);
}
