// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-in timeouts: alarm scheduling and the two timeout policies.

use super::*;
use wonder_core::test_support::fan_out_def;
use wonder_core::{NodeId, OnTimeout};

fn timeout_def(on_timeout: OnTimeout) -> WorkflowDef {
    let mut def = fan_out_def(3, "results", Some("after"));
    def.nodes[1].output_mapping.insert("state.results".into(), "$".into());
    let sync = def.transitions[0].sync.as_mut().unwrap();
    sync.timeout_ms = Some(1_000);
    sync.on_timeout = on_timeout;
    def
}

#[test]
fn first_arrival_schedules_the_deadline_alarm() {
    let mut ctx = Ctx::new(timeout_def(OnTimeout::ProceedWithAvailable));
    ctx.start();
    ctx.complete(0, json!({}));

    let arrival_now = ctx.now;
    let plan = ctx.complete(1, json!({"x": 0}));
    let alarm = plan.decisions.iter().find_map(|d| match d {
        Decision::ScheduleAlarm { at_ms } => Some(*at_ms),
        _ => None,
    });
    assert_eq!(alarm, Some(arrival_now + 1_000));
}

#[test]
fn proceed_with_available_merges_partial_and_cancels_rest() {
    let mut ctx = Ctx::new(timeout_def(OnTimeout::ProceedWithAvailable));
    ctx.start();
    ctx.complete(0, json!({}));

    // Two of three branches complete.
    ctx.complete(1, json!({"x": 0}));
    ctx.complete(2, json!({"x": 1}));
    assert!(!ctx.run().fan_in("0.split", &NodeId::new("branch")).unwrap().is_activated());

    // The deadline passes and the alarm fires.
    ctx.now += 2_000;
    let plan = ctx.send(CommandKind::Alarm);

    assert!(trace_names(&plan).contains(&"decision.sync.timeout".to_string()));
    assert!(trace_names(&plan).contains(&"dispatch.sync.fan_in_activated".to_string()));
    // Merge proceeds with the two arrived branches.
    assert_eq!(ctx.run().context.state["results"], json!([{"x": 0}, {"x": 1}]));
    // The straggler was cancelled.
    assert_eq!(ctx.token_status(3), TokenStatus::Cancelled);
    // The continuation kept going.
    assert!(ctx.run().tokens.values().any(|t| t.node_id == "after"));

    // The straggler's late result is accepted and dropped.
    let plan = ctx.complete(3, json!({"x": 2}));
    assert!(trace_names(&plan).contains(&"dispatch.result.dropped".to_string()));
    assert_eq!(ctx.run().context.state["results"], json!([{"x": 0}, {"x": 1}]));
}

#[test]
fn fail_policy_fails_the_run() {
    let mut ctx = Ctx::new(timeout_def(OnTimeout::Fail));
    ctx.start();
    ctx.complete(0, json!({}));
    ctx.complete(1, json!({"x": 0}));

    ctx.now += 2_000;
    ctx.send(CommandKind::Alarm);

    assert_eq!(ctx.status(), RunStatus::Failed);
    assert_eq!(ctx.run().status.error.as_ref().unwrap().code, "fan_in_timeout");
    // Remaining branches were cancelled with the run.
    assert_eq!(ctx.token_status(2), TokenStatus::Cancelled);
    assert_eq!(ctx.token_status(3), TokenStatus::Cancelled);
}

#[test]
fn alarm_with_nothing_due_plans_nothing() {
    let mut ctx = Ctx::new(timeout_def(OnTimeout::Fail));
    ctx.start();
    ctx.complete(0, json!({}));
    ctx.complete(1, json!({"x": 0}));

    // Fires before the deadline: the planner re-arms and does nothing
    // else.
    let plan = ctx.send(CommandKind::Alarm);
    assert!(plan
        .decisions
        .iter()
        .all(|d| matches!(d, Decision::ScheduleAlarm { .. })));
    assert_eq!(ctx.status(), RunStatus::Running);
}
