// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay property: applying the same decision stream to an empty state
//! reproduces the same final state, bit for bit.

use super::*;
use serde_json::json;
use wonder_core::{ContextPath, DefId, MergeStrategy, RunId, WaitFor};

fn sample_stream() -> Vec<(Decision, u64)> {
    let mut stream: Vec<(Decision, u64)> = vec![(
        Decision::InitializeWorkflow {
            run_id: RunId::from_string("run-replay"),
            definition_id: DefId::from_string("def-replay"),
            version: 1,
            input: json!({"q": "go"}),
            parent: None,
            trace_enabled: true,
        },
        100,
    )];
    stream.push((Decision::CreateToken { token: token(0, "src") }, 100));
    for (status, ts) in [
        (TokenStatus::Dispatched, 100),
        (TokenStatus::Executing, 150),
        (TokenStatus::Completed, 200),
    ] {
        stream.push((
            Decision::UpdateTokenStatus {
                token_id: TokenId::from_seq(0),
                status,
                error: None,
            },
            ts,
        ));
    }
    stream.push((
        Decision::BatchCreateTokens {
            tokens: vec![
                branch_token(1, "branch", 0, 2, "split"),
                branch_token(2, "branch", 1, 2, "split"),
            ],
        },
        200,
    ));
    stream.push((
        Decision::TryCreateFanIn {
            sibling_group: "0.split".into(),
            fan_in_node_id: NodeId::new("branch"),
            wait_for: WaitFor::All,
            total: 2,
            deadline_at_ms: None,
        },
        200,
    ));
    for seq in [1u64, 2] {
        stream.push((
            Decision::ApplyBranchOutput {
                token_id: TokenId::from_seq(seq),
                output: json!({"x": seq}),
            },
            300,
        ));
        stream.push((
            Decision::RecordFanInArrival {
                sibling_group: "0.split".into(),
                fan_in_node_id: NodeId::new("branch"),
                token_id: TokenId::from_seq(seq),
            },
            300,
        ));
    }
    stream.push((
        Decision::SetFanInActivated {
            sibling_group: "0.split".into(),
            fan_in_node_id: NodeId::new("branch"),
            merged_token_id: TokenId::from_seq(3),
            activated_at_ms: 300,
        },
        300,
    ));
    stream.push((
        Decision::MergeBranches {
            sibling_group: "0.split".into(),
            fan_in_node_id: NodeId::new("branch"),
            source_tokens: vec![TokenId::from_seq(1), TokenId::from_seq(2)],
            target: ContextPath::parse("state.results").unwrap(),
            merged: wonder_core::merge::merge_branches(
                MergeStrategy::Append,
                &[(0, json!({"x": 1})), (1, json!({"x": 2}))],
            ),
        },
        300,
    ));
    stream.push((
        Decision::DropBranchTables {
            token_ids: vec![TokenId::from_seq(1), TokenId::from_seq(2)],
        },
        300,
    ));
    stream.push((
        Decision::SetWorkflowStatus {
            status: wonder_core::RunStatus::Completed,
            final_output: Some(json!({"results": [{"x": 1}, {"x": 2}]})),
            error: None,
        },
        400,
    ));
    stream
}

fn run_stream(stream: &[(Decision, u64)]) -> RunState {
    let mut state = RunState::default();
    for (decision, now_ms) in stream {
        state.apply(decision, *now_ms).unwrap();
    }
    state
}

#[test]
fn replay_reproduces_state_bit_exact() {
    let stream = sample_stream();
    let first = run_stream(&stream);
    let second = run_stream(&stream);

    let a = serde_json::to_string(&first).unwrap();
    let b = serde_json::to_string(&second).unwrap();
    assert_eq!(a, b);
}

#[test]
fn replayed_tokens_match_created_events() {
    // Every operation.tokens.created event corresponds to a token in the
    // final store and vice versa.
    let stream = sample_stream();
    let mut state = RunState::default();
    let mut created = Vec::new();
    for (decision, now_ms) in &stream {
        for ev in state.apply(decision, *now_ms).unwrap() {
            if ev.name == "operation.tokens.created" {
                created.push(ev.token_id.unwrap());
            }
        }
    }
    let in_store: Vec<TokenId> = state.tokens.keys().copied().collect();
    assert_eq!(created, in_store);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any prefix of the stream replays deterministically.
        #[test]
        fn prefixes_replay_deterministically(len in 0usize..14) {
            let stream = sample_stream();
            let prefix = &stream[..len.min(stream.len())];
            let a = serde_json::to_string(&run_stream(prefix)).unwrap();
            let b = serde_json::to_string(&run_stream(prefix)).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
