// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sub-workflow invocation, outcomes, and the trampoline.

use super::*;
use wonder_core::test_support::{task_node, transition, workflow_def};
use wonder_core::{ActionRef, DefId, DispatchKind, Node, OnFailure, TokenId, Transition};

/// p invokes the child workflow, then continues to "next" (which routes
/// on output.error when the child was caught failing).
fn parent_def(on_failure: OnFailure) -> WorkflowDef {
    let child_node = Node {
        id: "p".into(),
        name: "p".into(),
        action: Some(ActionRef::Workflow {
            definition_id: DefId::from_string("def-child"),
            version: Some(1),
            on_failure,
            timeout_ms: None,
        }),
        input_mapping: [("q".to_string(), "input.q".to_string())].into_iter().collect(),
        output_mapping: [("state.child".to_string(), "$".to_string())].into_iter().collect(),
    };
    workflow_def(
        "parent",
        "p",
        vec![child_node, task_node("next"), task_node("recover")],
        vec![
            transition("to_next", "p", Some("next")),
            Transition {
                priority: -1,
                condition: Some("output.error.code == boom".into()),
                ..transition("on_error", "p", Some("recover"))
            },
        ],
    )
}

#[test]
fn invocation_parks_token_and_persists_dispatch() {
    let mut ctx = Ctx::new(parent_def(OnFailure::Propagate));
    let plan = ctx.start_with(json!({"q": "hello"}));

    assert_eq!(ctx.token_status(0), TokenStatus::WaitingForSubworkflow);
    let record = ctx.run().subworkflow(&seq(0)).unwrap();
    assert_eq!(record.definition_id, "def-child");

    // The start is persisted, not fired inline; an immediate alarm was
    // scheduled to drain it on a fresh stack.
    assert_eq!(ctx.run().pending_dispatches.len(), 1);
    assert!(matches!(
        ctx.run().pending_dispatches[0].kind,
        DispatchKind::StartSubworkflow { ref input, .. } if input == &json!({"q": "hello"})
    ));
    let alarm = plan.decisions.iter().find_map(|d| match d {
        Decision::ScheduleAlarm { at_ms } => Some(*at_ms),
        _ => None,
    });
    assert_eq!(alarm, Some(1_000));
}

#[test]
fn alarm_drains_the_start_dispatch() {
    let mut ctx = Ctx::new(parent_def(OnFailure::Propagate));
    ctx.start();

    let plan = ctx.send(CommandKind::Alarm);
    assert!(ctx.run().pending_dispatches.is_empty());
    assert!(plan
        .decisions
        .iter()
        .any(|d| matches!(d, Decision::StartSubworkflow { .. })));
    assert!(trace_names(&plan).contains(&"dispatch.trampoline.fired".to_string()));
}

#[test]
fn child_result_maps_output_and_continues() {
    let mut ctx = Ctx::new(parent_def(OnFailure::Propagate));
    ctx.start();
    ctx.send(CommandKind::Alarm);

    let plan = ctx.send(CommandKind::SubworkflowResult {
        token_id: seq(0),
        output: json!({"answer": 42}),
    });

    assert_eq!(ctx.token_status(0), TokenStatus::Completed);
    assert_eq!(ctx.run().context.state["child"], json!({"answer": 42}));
    assert!(ctx.run().subworkflow(&seq(0)).is_none());
    // Continued to "next".
    assert_eq!(dispatched(&plan).len(), 1);
    assert_eq!(ctx.run().tokens[&seq(1)].node_id, "next");
}

#[test]
fn caught_child_failure_completes_parent_and_routes_on_error() {
    let mut ctx = Ctx::new(parent_def(OnFailure::Catch));
    ctx.start();
    ctx.send(CommandKind::Alarm);

    let plan = ctx.send(CommandKind::SubworkflowError {
        token_id: seq(0),
        error: ErrorObject::new("boom", "child exploded"),
    });

    // The parent token completed; no parent failure.
    assert_eq!(ctx.token_status(0), TokenStatus::Completed);
    assert_eq!(ctx.status(), RunStatus::Running);
    assert_eq!(
        ctx.run().context.output["error"],
        json!({"code": "boom", "message": "child exploded"})
    );
    // Downstream routing saw the error and took the recovery edge.
    assert_eq!(dispatched(&plan).len(), 1);
    assert_eq!(ctx.run().tokens[&seq(1)].node_id, "recover");
}

#[test]
fn propagated_child_failure_fails_parent_token() {
    // No failure-conditioned transition matches "crash", so the run
    // fails.
    let mut ctx = Ctx::new(parent_def(OnFailure::Propagate));
    ctx.start();
    ctx.send(CommandKind::Alarm);

    ctx.send(CommandKind::SubworkflowError {
        token_id: seq(0),
        error: ErrorObject::new("crash", "child died"),
    });

    assert_eq!(ctx.token_status(0), TokenStatus::Failed);
    assert_eq!(ctx.status(), RunStatus::Failed);
    assert_eq!(ctx.run().status.error.as_ref().unwrap().code, "crash");
}

#[test]
fn propagated_failure_can_route_through_failure_edge() {
    let mut ctx = Ctx::new(parent_def(OnFailure::Propagate));
    ctx.start();
    ctx.send(CommandKind::Alarm);

    let plan = ctx.send(CommandKind::SubworkflowError {
        token_id: seq(0),
        error: ErrorObject::new("boom", "known failure"),
    });

    assert_eq!(ctx.token_status(0), TokenStatus::Failed);
    assert_eq!(ctx.status(), RunStatus::Running);
    assert_eq!(dispatched(&plan).len(), 1);
    assert_eq!(ctx.run().tokens[&seq(1)].node_id, "recover");
}

#[test]
fn child_run_id_is_deterministic() {
    let mut a = Ctx::new(parent_def(OnFailure::Propagate));
    a.start();
    let mut b = Ctx::new(parent_def(OnFailure::Propagate));
    b.start();

    let id_a = a.run().subworkflow(&seq(0)).unwrap().child_run_id;
    let id_b = b.run().subworkflow(&seq(0)).unwrap().child_run_id;
    assert_eq!(id_a, id_b);
}

#[test]
fn completion_notifies_parent_via_trampoline() {
    let def = workflow_def("leaf", "a", vec![task_node("a")], vec![]);
    let mut ctx = Ctx::new(def).with_parent("run-parent-00000000000", 7);
    ctx.start();
    ctx.complete(0, json!({}));

    assert_eq!(ctx.status(), RunStatus::Completed);
    // The parent notification is a pending dispatch, not an inline call.
    assert_eq!(ctx.run().pending_dispatches.len(), 1);
    assert!(matches!(
        ctx.run().pending_dispatches[0].kind,
        DispatchKind::NotifyParent { parent_token_id, .. }
            if parent_token_id == TokenId::from_seq(7)
    ));

    // Drained on the next alarm.
    let plan = ctx.send(CommandKind::Alarm);
    assert!(plan.decisions.iter().any(|d| matches!(
        d,
        Decision::NotifyParent { outcome: wonder_core::RunOutcome::Completed { .. }, .. }
    )));
    assert!(ctx.run().pending_dispatches.is_empty());
}
