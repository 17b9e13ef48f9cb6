// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use wonder_core::ErrorObject;

#[test]
fn create_token_inserts_and_bumps_watermark() {
    let mut state = RunState::default();
    let trace = apply(&mut state, Decision::CreateToken { token: token(0, "a") });

    assert_eq!(state.tokens.len(), 1);
    assert_eq!(state.next_token_seq, 1);
    assert_eq!(trace.len(), 1);
    assert_eq!(trace[0].name, "operation.tokens.created");
}

#[test]
fn duplicate_token_is_an_error() {
    let mut state = RunState::default();
    apply(&mut state, Decision::CreateToken { token: token(0, "a") });
    let err = state
        .apply(&Decision::CreateToken { token: token(0, "a") }, 1_000)
        .unwrap_err();
    assert_eq!(err, ApplyError::DuplicateToken(TokenId::from_seq(0)));
}

#[test]
fn second_root_is_an_error() {
    let mut state = RunState::default();
    apply(&mut state, Decision::CreateToken { token: token(0, "a") });
    let mut another_root = token(5, "b");
    another_root.parent_token_id = None;
    let err = state
        .apply(&Decision::CreateToken { token: another_root }, 1_000)
        .unwrap_err();
    assert_eq!(err, ApplyError::DuplicateRoot(TokenId::from_seq(5)));
}

#[test]
fn batch_create_inserts_all() {
    let mut state = RunState::default();
    apply(&mut state, Decision::CreateToken { token: token(0, "a") });
    let trace = apply(
        &mut state,
        Decision::BatchCreateTokens {
            tokens: vec![
                branch_token(1, "b", 0, 2, "split"),
                branch_token(2, "b", 1, 2, "split"),
            ],
        },
    );
    assert_eq!(state.tokens.len(), 3);
    assert_eq!(state.next_token_seq, 3);
    assert_eq!(trace.len(), 2);
}

#[test]
fn status_walk_sets_timestamps() {
    let mut state = RunState::default();
    seed_token_at(&mut state, 0, "a", TokenStatus::Completed);

    let t = state.token(&TokenId::from_seq(0)).unwrap();
    assert_eq!(t.status, TokenStatus::Completed);
    assert_eq!(t.completed_at_ms, Some(1_000));
}

#[test]
fn illegal_transition_is_rejected() {
    let mut state = RunState::default();
    apply(&mut state, Decision::CreateToken { token: token(0, "a") });

    let err = state
        .apply(
            &Decision::UpdateTokenStatus {
                token_id: TokenId::from_seq(0),
                status: TokenStatus::Executing,
                error: None,
            },
            1_000,
        )
        .unwrap_err();
    assert_eq!(
        err,
        ApplyError::InvalidTransition {
            token_id: TokenId::from_seq(0),
            from: TokenStatus::Pending,
            to: TokenStatus::Executing,
        }
    );
}

#[test]
fn reapplying_same_status_is_a_noop() {
    let mut state = RunState::default();
    seed_token_at(&mut state, 0, "a", TokenStatus::Dispatched);

    let trace = apply(
        &mut state,
        Decision::UpdateTokenStatus {
            token_id: TokenId::from_seq(0),
            status: TokenStatus::Dispatched,
            error: None,
        },
    );
    assert!(trace.is_empty());
}

#[test]
fn terminal_status_is_immutable() {
    let mut state = RunState::default();
    seed_token_at(&mut state, 0, "a", TokenStatus::Completed);

    for target in [TokenStatus::Pending, TokenStatus::Failed, TokenStatus::Cancelled] {
        let result = state.apply(
            &Decision::UpdateTokenStatus {
                token_id: TokenId::from_seq(0),
                status: target,
                error: None,
            },
            2_000,
        );
        assert!(result.is_err(), "completed -> {target} must fail");
    }
}

#[test]
fn error_is_recorded_on_failure() {
    let mut state = RunState::default();
    seed_token_at(&mut state, 0, "a", TokenStatus::Executing);

    apply(
        &mut state,
        Decision::UpdateTokenStatus {
            token_id: TokenId::from_seq(0),
            status: TokenStatus::Failed,
            error: Some(ErrorObject::new("boom", "task exploded")),
        },
    );
    let t = state.token(&TokenId::from_seq(0)).unwrap();
    assert_eq!(t.error.as_ref().unwrap().code, "boom");
}

#[test]
fn cancel_token_is_noop_on_terminal() {
    let mut state = RunState::default();
    seed_token_at(&mut state, 0, "a", TokenStatus::Completed);

    let trace = apply(&mut state, Decision::CancelToken { token_id: TokenId::from_seq(0) });
    assert!(trace.is_empty());
    assert_eq!(
        state.token(&TokenId::from_seq(0)).unwrap().status,
        TokenStatus::Completed
    );
}

#[test]
fn cancel_token_cancels_active() {
    let mut state = RunState::default();
    seed_token_at(&mut state, 0, "a", TokenStatus::Dispatched);

    let trace = apply(&mut state, Decision::CancelToken { token_id: TokenId::from_seq(0) });
    assert_eq!(trace[0].name, "operation.tokens.cancelled");
    assert_eq!(
        state.token(&TokenId::from_seq(0)).unwrap().status,
        TokenStatus::Cancelled
    );
}

#[test]
fn unknown_token_is_an_error() {
    let mut state = RunState::default();
    let err = state
        .apply(
            &Decision::UpdateTokenStatus {
                token_id: TokenId::from_seq(9),
                status: TokenStatus::Dispatched,
                error: None,
            },
            1_000,
        )
        .unwrap_err();
    assert_eq!(err, ApplyError::UnknownToken(TokenId::from_seq(9)));
}

#[test]
fn record_iteration_counts_visits() {
    let mut state = RunState::default();
    let node = NodeId::new("loop");
    for _ in 0..3 {
        apply(
            &mut state,
            Decision::RecordIteration { node_id: node.clone(), path_id: "0".into() },
        );
    }
    assert_eq!(state.iteration_count(&node, "0"), 3);
    assert_eq!(state.iteration_count(&node, "0.x.1"), 0);
}

#[test]
fn effect_decision_is_rejected_by_state_executor() {
    let mut state = RunState::default();
    let err = state
        .apply(&Decision::ScheduleAlarm { at_ms: 1 }, 1_000)
        .unwrap_err();
    assert_eq!(err, ApplyError::EffectPhase("schedule_alarm"));
}
