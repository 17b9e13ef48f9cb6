// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized-state tests

mod context;
mod fan_ins;
mod replay;
mod tokens;

use super::*;
use wonder_core::{Decision, NodeId, Token, TokenStatus};

/// Apply a decision, panicking on error.
fn apply(state: &mut RunState, decision: Decision) -> Vec<TraceEvent> {
    state.apply(&decision, 1_000).unwrap()
}

/// Sequential test token at `node`. Seq 0 is the root; later tokens are
/// plain successors of it (one root per run).
fn token(seq: u64, node: &str) -> Token {
    let builder = Token::builder().id(TokenId::from_seq(seq)).node_id(NodeId::new(node));
    if seq == 0 {
        builder.build()
    } else {
        builder
            .parent_token_id(TokenId::from_seq(0))
            .fan_out_transition_id(format!("t{seq}").as_str())
            .build()
    }
}

/// Branch token `index` of `total`, spawned by `transition` from tok-0.
fn branch_token(seq: u64, node: &str, index: u32, total: u32, transition: &str) -> Token {
    Token::builder()
        .id(TokenId::from_seq(seq))
        .node_id(NodeId::new(node))
        .parent_token_id(TokenId::from_seq(0))
        .fan_out_transition_id(transition)
        .branch_index(index)
        .branch_total(total)
        .path_id(format!("0.{transition}.{index}"))
        .sibling_group(format!("0.{transition}"))
        .build()
}

/// Root token plus a status walk to `status` (legal path only).
fn seed_token_at(state: &mut RunState, seq: u64, node: &str, status: TokenStatus) {
    let t = token(seq, node);
    apply(state, Decision::CreateToken { token: t });
    let id = TokenId::from_seq(seq);
    let path: &[TokenStatus] = match status {
        TokenStatus::Pending => &[],
        TokenStatus::Dispatched => &[TokenStatus::Dispatched],
        TokenStatus::Executing => &[TokenStatus::Dispatched, TokenStatus::Executing],
        TokenStatus::Completed => {
            &[TokenStatus::Dispatched, TokenStatus::Executing, TokenStatus::Completed]
        }
        _ => panic!("unsupported seed status"),
    };
    for s in path {
        apply(
            state,
            Decision::UpdateTokenStatus { token_id: id, status: *s, error: None },
        );
    }
}
