// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use wonder_core::WaitFor;

fn try_create(total: u32) -> Decision {
    Decision::TryCreateFanIn {
        sibling_group: "0.split".into(),
        fan_in_node_id: NodeId::new("branch"),
        wait_for: WaitFor::All,
        total,
        deadline_at_ms: Some(5_000),
    }
}

fn arrival(seq: u64) -> Decision {
    Decision::RecordFanInArrival {
        sibling_group: "0.split".into(),
        fan_in_node_id: NodeId::new("branch"),
        token_id: TokenId::from_seq(seq),
    }
}

fn activate(merged_seq: u64) -> Decision {
    Decision::SetFanInActivated {
        sibling_group: "0.split".into(),
        fan_in_node_id: NodeId::new("branch"),
        merged_token_id: TokenId::from_seq(merged_seq),
        activated_at_ms: 2_000,
    }
}

#[test]
fn try_create_inserts_once() {
    let mut state = RunState::default();
    let first = apply(&mut state, try_create(3));
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].name, "operation.fan_in.created");

    // Second insert is a no-op, not an error
    let second = apply(&mut state, try_create(3));
    assert!(second.is_empty());
    assert_eq!(state.fan_ins.len(), 1);
}

#[test]
fn arrivals_record_in_order_and_dedupe() {
    let mut state = RunState::default();
    apply(&mut state, try_create(3));
    apply(&mut state, arrival(2));
    apply(&mut state, arrival(1));
    let repeat = apply(&mut state, arrival(2));
    assert!(repeat.is_empty());

    let rec = state.fan_in("0.split", &NodeId::new("branch")).unwrap();
    assert_eq!(rec.arrived, vec![TokenId::from_seq(2), TokenId::from_seq(1)]);
    assert_eq!(rec.arrived_count(), 2);
}

#[test]
fn arrival_without_record_is_an_error() {
    let mut state = RunState::default();
    let err = state.apply(&arrival(0), 1_000).unwrap_err();
    assert!(matches!(err, ApplyError::UnknownFanIn(_)));
}

#[test]
fn activation_happens_at_most_once() {
    let mut state = RunState::default();
    apply(&mut state, try_create(2));
    apply(&mut state, arrival(1));

    let first = apply(&mut state, activate(7));
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].name, "operation.fan_in.activated");

    // A second activation attempt is a no-op and keeps the first winner.
    let second = apply(&mut state, activate(9));
    assert!(second.is_empty());

    let rec = state.fan_in("0.split", &NodeId::new("branch")).unwrap();
    assert_eq!(rec.merged_token_id, Some(TokenId::from_seq(7)));
    assert_eq!(rec.activated_at_ms, Some(2_000));
}

#[test]
fn records_keep_deadline_and_wait_for() {
    let mut state = RunState::default();
    apply(&mut state, try_create(5));
    let rec = state.fan_in("0.split", &NodeId::new("branch")).unwrap();
    assert_eq!(rec.total, 5);
    assert_eq!(rec.deadline_at_ms, Some(5_000));
    assert!(!rec.is_activated());
    assert_eq!(rec.merge_count, 0);
}

#[test]
fn key_is_group_plus_node() {
    assert_eq!(fan_in_key("0.split", &NodeId::new("branch")), "0.split|branch");
}
