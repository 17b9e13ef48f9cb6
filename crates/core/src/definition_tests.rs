// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{linear_def, task_node, transition, workflow_def};
use yare::parameterized;

#[test]
fn linear_def_validates() {
    let def = linear_def(&["a", "b", "c"]);
    assert!(def.validate().is_ok());
}

#[test]
fn transitions_from_sorts_by_priority_then_id() {
    let mut def = linear_def(&["a", "b"]);
    def.transitions = vec![
        Transition { priority: 2, ..transition("t_high", "a", Some("b")) },
        Transition { priority: 1, ..transition("t_z", "a", Some("b")) },
        Transition { priority: 1, ..transition("t_a", "a", Some("b")) },
    ];
    let ids: Vec<&str> =
        def.transitions_from(&NodeId::new("a")).iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["t_a", "t_z", "t_high"]);
}

#[test]
fn tiers_group_equal_priorities() {
    let mut def = linear_def(&["a", "b"]);
    def.transitions = vec![
        Transition { priority: 1, ..transition("t1", "a", Some("b")) },
        Transition { priority: 1, ..transition("t2", "a", Some("b")) },
        Transition { priority: 3, ..transition("t3", "a", Some("b")) },
    ];
    let tiers = def.tiers_from(&NodeId::new("a"));
    assert_eq!(tiers.len(), 2);
    assert_eq!(tiers[0].len(), 2);
    assert_eq!(tiers[1].len(), 1);
}

#[test]
fn terminal_node_has_no_outgoing() {
    let def = linear_def(&["a", "b"]);
    assert!(!def.is_terminal_node(&NodeId::new("a")));
    assert!(def.is_terminal_node(&NodeId::new("b")));
}

#[parameterized(
    met_all = { WaitFor::All, 5, 5, true },
    unmet_all = { WaitFor::All, 4, 5, false },
    met_any = { WaitFor::Any, 1, 5, true },
    unmet_any = { WaitFor::Any, 0, 5, false },
    met_quorum = { WaitFor::MOfN { n: 3 }, 3, 5, true },
    unmet_quorum = { WaitFor::MOfN { n: 3 }, 2, 5, false },
)]
fn wait_for_is_met(wait: WaitFor, arrived: u32, total: u32, expected: bool) {
    assert_eq!(wait.is_met(arrived, total), expected);
}

#[test]
fn validate_rejects_unknown_references() {
    let def = workflow_def(
        "bad",
        "a",
        vec![task_node("a")],
        vec![transition("t", "a", Some("ghost"))],
    );
    let err = def.validate().unwrap_err();
    assert!(err.issues.iter().any(|i| i.contains("unknown node: ghost")), "{err}");
}

#[test]
fn validate_rejects_duplicate_ids() {
    let def = workflow_def(
        "dup",
        "a",
        vec![task_node("a"), task_node("a")],
        vec![
            transition("t", "a", None),
            transition("t", "a", None),
        ],
    );
    let err = def.validate().unwrap_err();
    assert!(err.issues.iter().any(|i| i.contains("duplicate node id")));
    assert!(err.issues.iter().any(|i| i.contains("duplicate transition id")));
}

#[test]
fn validate_rejects_bad_merge_target() {
    let mut def = linear_def(&["a", "b"]);
    def.transitions[0].sync = Some(SyncSpec {
        wait_for: WaitFor::All,
        timeout_ms: None,
        on_timeout: OnTimeout::default(),
        on_early_complete: OnEarlyComplete::default(),
        merge: MergeSpec { strategy: crate::merge::MergeStrategy::Append, target: "nope.x".into() },
    });
    let err = def.validate().unwrap_err();
    assert!(err.issues.iter().any(|i| i.contains("invalid merge target")));
}

#[test]
fn validate_rejects_missing_initial_node() {
    let def = workflow_def("noinit", "ghost", vec![task_node("a")], vec![]);
    let err = def.validate().unwrap_err();
    assert!(err.issues.iter().any(|i| i.contains("initial node not found")));
}

#[test]
fn validate_rejects_zero_quorum_and_zero_iterations() {
    let mut def = linear_def(&["a", "b"]);
    def.transitions[0].sync = Some(SyncSpec {
        wait_for: WaitFor::MOfN { n: 0 },
        timeout_ms: None,
        on_timeout: OnTimeout::default(),
        on_early_complete: OnEarlyComplete::default(),
        merge: MergeSpec {
            strategy: crate::merge::MergeStrategy::Append,
            target: "state.out".into(),
        },
    });
    def.transitions[0].loop_config = Some(LoopSpec { max_iterations: 0 });
    let err = def.validate().unwrap_err();
    assert!(err.issues.iter().any(|i| i.contains("quorum of 0")));
    assert!(err.issues.iter().any(|i| i.contains("max_iterations of 0")));
}

#[test]
fn def_round_trips_serde() {
    let def = linear_def(&["a", "b", "c"]);
    let json = serde_json::to_string(&def).unwrap();
    let back: WorkflowDef = serde_json::from_str(&json).unwrap();
    assert_eq!(back, def);
}
