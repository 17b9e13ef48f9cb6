// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sub-workflow records and pending trampoline dispatches.

use super::{ApplyError, RunState};
use wonder_core::{Decision, TraceEvent};

pub(super) fn apply(
    state: &mut RunState,
    decision: &Decision,
    now_ms: u64,
) -> Result<Vec<TraceEvent>, ApplyError> {
    match decision {
        Decision::InitSubworkflowRecord { record } => {
            if state.subworkflows.contains_key(&record.parent_token_id) {
                return Ok(vec![]);
            }
            state.subworkflows.insert(record.parent_token_id, record.clone());
            Ok(vec![TraceEvent::operation("subworkflow.recorded", now_ms)
                .token(record.parent_token_id)
                .field("child_run_id", record.child_run_id.to_string())])
        }

        Decision::ClearSubworkflowRecord { parent_token_id } => {
            if state.subworkflows.shift_remove(parent_token_id).is_none() {
                return Ok(vec![]);
            }
            Ok(vec![TraceEvent::operation("subworkflow.cleared", now_ms)
                .token(*parent_token_id)])
        }

        Decision::PersistDispatch { dispatch } => {
            if state.pending_dispatches.iter().any(|d| d.id == dispatch.id) {
                return Ok(vec![]);
            }
            state.next_dispatch_id = state.next_dispatch_id.max(dispatch.id + 1);
            state.pending_dispatches.push(dispatch.clone());
            Ok(vec![TraceEvent::operation("dispatch.persisted", now_ms)
                .field("dispatch_id", dispatch.id)
                .field("kind", dispatch.kind.name())])
        }

        Decision::ClearDispatch { dispatch_id } => {
            let before = state.pending_dispatches.len();
            state.pending_dispatches.retain(|d| d.id != *dispatch_id);
            if state.pending_dispatches.len() == before {
                return Ok(vec![]);
            }
            Ok(vec![TraceEvent::operation("dispatch.cleared", now_ms)
                .field("dispatch_id", *dispatch_id)])
        }

        _ => unreachable!("non-subworkflow decision routed to subworkflows::apply"),
    }
}
