// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

use TokenStatus::*;

const ALL: [TokenStatus; 9] = [
    Pending,
    Dispatched,
    Executing,
    WaitingForSiblings,
    WaitingForSubworkflow,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
];

#[parameterized(
    pending_dispatched = { Pending, Dispatched },
    pending_completed = { Pending, Completed },
    pending_cancelled = { Pending, Cancelled },
    pending_waiting_siblings = { Pending, WaitingForSiblings },
    pending_waiting_subworkflow = { Pending, WaitingForSubworkflow },
    dispatched_executing = { Dispatched, Executing },
    dispatched_failed = { Dispatched, Failed },
    dispatched_timed_out = { Dispatched, TimedOut },
    executing_completed = { Executing, Completed },
    executing_waiting_siblings = { Executing, WaitingForSiblings },
    executing_failed = { Executing, Failed },
    waiting_siblings_completed = { WaitingForSiblings, Completed },
    waiting_siblings_timed_out = { WaitingForSiblings, TimedOut },
    waiting_subworkflow_completed = { WaitingForSubworkflow, Completed },
    waiting_subworkflow_failed = { WaitingForSubworkflow, Failed },
)]
fn allowed_transitions(from: TokenStatus, to: TokenStatus) {
    assert!(from.can_transition_to(to), "{from} -> {to} should be allowed");
}

#[parameterized(
    pending_executing = { Pending, Executing },
    pending_failed = { Pending, Failed },
    dispatched_completed = { Dispatched, Completed },
    dispatched_waiting = { Dispatched, WaitingForSiblings },
    executing_dispatched = { Executing, Dispatched },
    waiting_siblings_failed = { WaitingForSiblings, Failed },
    completed_anything = { Completed, Pending },
    failed_completed = { Failed, Completed },
)]
fn forbidden_transitions(from: TokenStatus, to: TokenStatus) {
    assert!(!from.can_transition_to(to), "{from} -> {to} should be forbidden");
}

#[test]
fn terminal_statuses_admit_nothing() {
    for from in ALL {
        if !from.is_terminal() {
            continue;
        }
        for to in ALL {
            assert!(!from.can_transition_to(to), "{from} -> {to}");
        }
    }
}

#[test]
fn terminal_partition() {
    for status in ALL {
        assert_eq!(status.is_terminal(), !status.is_active());
    }
    assert!(Completed.is_terminal());
    assert!(Failed.is_terminal());
    assert!(TimedOut.is_terminal());
    assert!(Cancelled.is_terminal());
    assert!(Pending.is_active());
}

#[test]
fn no_transition_targets_pending() {
    // Pending is only ever an initial status.
    for from in ALL {
        assert!(!from.can_transition_to(Pending), "{from} -> pending");
    }
}

#[test]
fn root_token_shape() {
    let token = Token::root(TokenId::from_seq(0), NodeId::new("start"), 123);
    assert!(token.is_root());
    assert_eq!(token.path_id, ROOT_PATH);
    assert_eq!(token.status, Pending);
    assert_eq!(token.branch_total, 1);
    assert_eq!(token.created_at_ms, 123);
}

#[test]
fn sibling_group_joins_path_and_transition() {
    let token = Token::builder().path_id("0.review.1").build();
    assert_eq!(
        token.sibling_group_for(&TransitionId::new("split")),
        "0.review.1.split"
    );
}

#[test]
fn status_serializes_snake_case() {
    let json = serde_json::to_string(&WaitingForSiblings).unwrap();
    assert_eq!(json, "\"waiting_for_siblings\"");
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn status() -> impl Strategy<Value = TokenStatus> {
        prop::sample::select(ALL.to_vec())
    }

    proptest! {
        /// Walking allowed edges never escapes a terminal status.
        #[test]
        fn terminal_states_are_absorbing(path in prop::collection::vec(status(), 1..12)) {
            let mut cur = TokenStatus::Pending;
            for next in path {
                if cur.can_transition_to(next) {
                    cur = next;
                }
                if cur.is_terminal() {
                    for target in ALL {
                        prop_assert!(!cur.can_transition_to(target));
                    }
                }
            }
        }
    }
}
