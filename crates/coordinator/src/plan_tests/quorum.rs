// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Quorum waits (`m_of_n`) and early-completion policies.

use super::*;
use wonder_core::test_support::fan_out_def;
use wonder_core::{NodeId, OnEarlyComplete, WaitFor};

/// Fan-out of 5 with an m-of-3 quorum and the given late-arrival policy.
fn quorum_def(policy: OnEarlyComplete) -> WorkflowDef {
    let mut def = fan_out_def(5, "results", Some("after"));
    def.nodes[1].output_mapping.insert("state.results".into(), "$".into());
    let sync = def.transitions[0].sync.as_mut().unwrap();
    sync.wait_for = WaitFor::MOfN { n: 3 };
    sync.on_early_complete = policy;
    def
}

/// Branch index -> token seq (branches are tokens 1..=5).
fn token_of(index: u64) -> u64 {
    index + 1
}

#[test]
fn quorum_fires_on_third_arrival_and_abandons_late() {
    let mut ctx = Ctx::new(quorum_def(OnEarlyComplete::Abandon));
    ctx.start();
    ctx.complete(0, json!({}));

    // Completion order by branch index: 2, 0, 4, 1, 3.
    ctx.complete(token_of(2), json!({"x": 2}));
    ctx.complete(token_of(0), json!({"x": 0}));
    assert!(!ctx.run().fan_in("0.split", &NodeId::new("branch")).unwrap().is_activated());

    // Third arrival meets the quorum.
    let plan = ctx.complete(token_of(4), json!({"x": 4}));
    assert!(trace_names(&plan).contains(&"dispatch.sync.fan_in_activated".to_string()));
    // Merge holds exactly the arrived branches, in branch-index order.
    assert_eq!(
        ctx.run().context.state["results"],
        json!([{"x": 0}, {"x": 2}, {"x": 4}])
    );

    // Late branches complete but their outputs are dropped.
    let plan = ctx.complete(token_of(1), json!({"x": 1}));
    assert!(trace_names(&plan).contains(&"decision.sync.late_arrival_dropped".to_string()));
    assert_eq!(ctx.token_status(token_of(1)), TokenStatus::Completed);

    ctx.complete(token_of(3), json!({"x": 3}));
    assert_eq!(ctx.token_status(token_of(3)), TokenStatus::Completed);

    // The merge result did not change.
    assert_eq!(
        ctx.run().context.state["results"],
        json!([{"x": 0}, {"x": 2}, {"x": 4}])
    );
    let rec = ctx.run().fan_in("0.split", &NodeId::new("branch")).unwrap();
    assert_eq!(rec.merge_count, 1);
}

#[test]
fn cancel_policy_cancels_unfinished_siblings() {
    let mut ctx = Ctx::new(quorum_def(OnEarlyComplete::Cancel));
    ctx.start();
    ctx.complete(0, json!({}));

    ctx.complete(token_of(0), json!({"x": 0}));
    ctx.complete(token_of(1), json!({"x": 1}));
    ctx.complete(token_of(2), json!({"x": 2}));

    // Quorum met: the two still-dispatched siblings were cancelled.
    assert_eq!(ctx.token_status(token_of(3)), TokenStatus::Cancelled);
    assert_eq!(ctx.token_status(token_of(4)), TokenStatus::Cancelled);

    // A result for a cancelled sibling is accepted and dropped.
    let plan = ctx.complete(token_of(3), json!({"x": 3}));
    assert!(trace_names(&plan).contains(&"dispatch.result.dropped".to_string()));
    assert_eq!(ctx.token_status(token_of(3)), TokenStatus::Cancelled);
}

#[test]
fn allow_late_merge_remerges_up_to_width() {
    let mut ctx = Ctx::new(quorum_def(OnEarlyComplete::AllowLateMerge));
    ctx.start();
    ctx.complete(0, json!({}));

    for index in [0u64, 1, 2] {
        ctx.complete(token_of(index), json!({"x": index}));
    }
    assert_eq!(
        ctx.run().context.state["results"],
        json!([{"x": 0}, {"x": 1}, {"x": 2}])
    );

    // A late arrival re-merges.
    let plan = ctx.complete(token_of(3), json!({"x": 3}));
    assert!(trace_names(&plan).contains(&"decision.sync.late_merge".to_string()));
    assert_eq!(
        ctx.run().context.state["results"],
        json!([{"x": 0}, {"x": 1}, {"x": 2}, {"x": 3}])
    );

    ctx.complete(token_of(4), json!({"x": 4}));
    assert_eq!(
        ctx.run().context.state["results"],
        json!([{"x": 0}, {"x": 1}, {"x": 2}, {"x": 3}, {"x": 4}])
    );
    let rec = ctx.run().fan_in("0.split", &NodeId::new("branch")).unwrap();
    assert_eq!(rec.merge_count, 3);
}

#[test]
fn any_wait_activates_on_first_arrival() {
    let mut def = fan_out_def(3, "results", None);
    def.nodes[1].output_mapping.insert("state.results".into(), "$".into());
    def.transitions[0].sync.as_mut().unwrap().wait_for = WaitFor::Any;
    let mut ctx = Ctx::new(def);
    ctx.start();
    ctx.complete(0, json!({}));

    let plan = ctx.complete(1, json!({"x": 0}));
    assert!(trace_names(&plan).contains(&"dispatch.sync.fan_in_activated".to_string()));
    assert_eq!(ctx.run().context.state["results"], json!([{"x": 0}]));
}
