// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation semantics.

use super::*;
use wonder_core::test_support::{fan_out_def, linear_def};
use wonder_core::DispatchKind;

#[test]
fn cancel_terminates_all_active_tokens() {
    let mut def = fan_out_def(3, "results", None);
    def.nodes[1].output_mapping.insert("state.results".into(), "$".into());
    let mut ctx = Ctx::new(def);
    ctx.start();
    ctx.complete(0, json!({}));
    ctx.complete(1, json!({"x": 0})); // one branch waiting

    let plan = ctx.send(CommandKind::Cancel { reason: Some("operator".into()) });

    assert_eq!(ctx.status(), RunStatus::Cancelled);
    for token in 1..=3u64 {
        let status = ctx.token_status(token);
        assert!(
            status == TokenStatus::Cancelled || status == TokenStatus::Completed,
            "token {token} ended as {status}"
        );
    }
    assert!(trace_names(&plan).contains(&"dispatch.workflow.cancelled".to_string()));
}

#[test]
fn results_after_cancel_are_accepted_and_dropped() {
    let mut ctx = Ctx::new(linear_def(&["a", "b"]));
    ctx.start();
    ctx.send(CommandKind::Cancel { reason: None });
    assert_eq!(ctx.token_status(0), TokenStatus::Cancelled);

    let plan = ctx.complete(0, json!({"late": true}));
    assert!(trace_names(&plan).contains(&"dispatch.result.dropped".to_string()));
    // Terminal status unchanged, no new flow.
    assert_eq!(ctx.token_status(0), TokenStatus::Cancelled);
    assert_eq!(ctx.run().tokens.len(), 1);
    assert_eq!(ctx.status(), RunStatus::Cancelled);
}

#[test]
fn cancel_twice_is_ignored() {
    let mut ctx = Ctx::new(linear_def(&["a", "b"]));
    ctx.start();
    ctx.send(CommandKind::Cancel { reason: None });
    let plan = ctx.send(CommandKind::Cancel { reason: None });
    assert!(trace_names(&plan).contains(&"dispatch.cancel.ignored".to_string()));
}

#[test]
fn cancel_propagates_to_child_runs() {
    let mut ctx = Ctx::new(super::subworkflow_fixture());
    ctx.start();
    ctx.send(CommandKind::Alarm); // drain the start dispatch

    ctx.send(CommandKind::Cancel { reason: None });
    assert!(ctx
        .run()
        .pending_dispatches
        .iter()
        .any(|d| matches!(d.kind, DispatchKind::CancelSubworkflow { .. })));

    let plan = ctx.send(CommandKind::Alarm);
    assert!(plan
        .decisions
        .iter()
        .any(|d| matches!(d, Decision::CancelSubworkflow { .. })));
}

#[test]
fn cancel_notifies_waiting_parent() {
    let mut ctx =
        Ctx::new(linear_def(&["a", "b"])).with_parent("run-parent-00000000000", 3);
    ctx.start();
    ctx.send(CommandKind::Cancel { reason: None });

    assert!(ctx.run().pending_dispatches.iter().any(|d| matches!(
        d.kind,
        DispatchKind::NotifyParent { outcome: wonder_core::RunOutcome::Cancelled, .. }
    )));
}
