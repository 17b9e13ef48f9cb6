// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token-table handlers: creation, status transitions, cancellation,
//! loop counters.

use super::{iteration_key, ApplyError, RunState};
use wonder_core::{Decision, Token, TokenId, TokenStatus, TraceEvent};

/// Parse the numeric suffix of a sequential token id (`tok-7` → 7).
fn token_seq(id: &TokenId) -> Option<u64> {
    id.as_str().strip_prefix(TokenId::PREFIX)?.parse().ok()
}

fn insert_token(state: &mut RunState, token: &Token, now_ms: u64) -> Result<TraceEvent, ApplyError> {
    if state.tokens.contains_key(&token.id) {
        return Err(ApplyError::DuplicateToken(token.id));
    }
    if token.parent_token_id.is_none() && state.tokens.values().any(|t| t.is_root()) {
        return Err(ApplyError::DuplicateRoot(token.id));
    }
    if let Some(seq) = token_seq(&token.id) {
        state.next_token_seq = state.next_token_seq.max(seq + 1);
    }
    state.tokens.insert(token.id, token.clone());
    Ok(TraceEvent::operation("tokens.created", now_ms)
        .token(token.id)
        .node(token.node_id.clone())
        .field("path_id", token.path_id.clone())
        .field("branch_index", token.branch_index)
        .field("branch_total", token.branch_total))
}

fn set_status(
    state: &mut RunState,
    token_id: &TokenId,
    status: TokenStatus,
    error: Option<&wonder_core::ErrorObject>,
    now_ms: u64,
) -> Result<Vec<TraceEvent>, ApplyError> {
    let token = state
        .tokens
        .get_mut(token_id)
        .ok_or(ApplyError::UnknownToken(*token_id))?;

    // Re-applying the same status is a no-op.
    if token.status == status {
        return Ok(vec![]);
    }
    if !token.status.can_transition_to(status) {
        return Err(ApplyError::InvalidTransition {
            token_id: *token_id,
            from: token.status,
            to: status,
        });
    }

    let from = token.status;
    token.status = status;
    token.updated_at_ms = now_ms;
    if let Some(err) = error {
        token.error = Some(err.clone());
    }
    if status.is_terminal() {
        token.completed_at_ms = Some(now_ms);
    }

    Ok(vec![TraceEvent::operation("tokens.status_updated", now_ms)
        .token(*token_id)
        .node(token.node_id.clone())
        .field("from", from.to_string())
        .field("to", status.to_string())])
}

pub(super) fn apply(
    state: &mut RunState,
    decision: &Decision,
    now_ms: u64,
) -> Result<Vec<TraceEvent>, ApplyError> {
    match decision {
        Decision::CreateToken { token } => Ok(vec![insert_token(state, token, now_ms)?]),

        Decision::BatchCreateTokens { tokens } => {
            let mut trace = Vec::with_capacity(tokens.len());
            for token in tokens {
                trace.push(insert_token(state, token, now_ms)?);
            }
            Ok(trace)
        }

        Decision::UpdateTokenStatus { token_id, status, error } => {
            set_status(state, token_id, *status, error.as_ref(), now_ms)
        }

        Decision::MarkWaiting { token_id, status } => {
            debug_assert!(matches!(
                status,
                TokenStatus::WaitingForSiblings | TokenStatus::WaitingForSubworkflow
            ));
            set_status(state, token_id, *status, None, now_ms)
        }

        Decision::CancelToken { token_id } => {
            let token = state
                .tokens
                .get(token_id)
                .ok_or(ApplyError::UnknownToken(*token_id))?;
            // Cancelling an already-terminal token is a no-op; late
            // cancellations race benignly with completion.
            if token.is_terminal() {
                return Ok(vec![]);
            }
            let mut trace =
                set_status(state, token_id, TokenStatus::Cancelled, None, now_ms)?;
            for ev in &mut trace {
                ev.name = "operation.tokens.cancelled".to_string();
            }
            Ok(trace)
        }

        Decision::RecordIteration { node_id, path_id } => {
            let key = iteration_key(node_id, path_id);
            *state.iterations.entry(key).or_insert(0) += 1;
            Ok(vec![])
        }

        _ => unreachable!("non-token decision routed to tokens::apply"),
    }
}
