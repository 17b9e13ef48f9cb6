// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized run state, built by applying committed decisions.
//!
//! Decisions are facts about what the planner decided; state is derived
//! from those facts. Handlers are deterministic and enforce the token
//! state machine, terminal immutability, and the two fan-in atomicity
//! guards (unique rendezvous row, at-most-one activation). Conditional
//! decisions (`TryCreateFanIn`, `SetFanInActivated`) are no-ops when
//! their guard fails, never errors: the planner may legitimately emit
//! them redundantly.
//!
//! Each applied decision yields its past-tense `operation.*` trace
//! events.

mod context;
mod fan_ins;
mod subworkflows;
mod tokens;

pub use context::ContextSections;
pub use fan_ins::{fan_in_key, FanInRecord};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wonder_core::{
    Decision, PendingDispatch, RunMeta, RunStatus, SubworkflowRecord, Token, TokenId, TokenStatus,
    TraceEvent, WorkflowStatus,
};

#[derive(Debug, Error, PartialEq)]
pub enum ApplyError {
    #[error("unknown token: {0}")]
    UnknownToken(TokenId),

    #[error("invalid token transition {from} -> {to} for {token_id}")]
    InvalidTransition {
        token_id: TokenId,
        from: TokenStatus,
        to: TokenStatus,
    },

    #[error("token {0} already exists")]
    DuplicateToken(TokenId),

    #[error("second root token: {0}")]
    DuplicateRoot(TokenId),

    #[error("unknown fan-in record: {0}")]
    UnknownFanIn(String),

    #[error("effect decision {0} reached the state-mutation executor")]
    EffectPhase(&'static str),
}

/// Materialized per-run tables.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub meta: RunMeta,
    /// Tokens in creation order.
    pub tokens: IndexMap<TokenId, Token>,
    /// Fan-in rendezvous rows keyed by `fan_in_key(sibling_group, node)`.
    /// Map-key uniqueness is the at-most-one-record guarantee.
    pub fan_ins: IndexMap<String, FanInRecord>,
    pub context: ContextSections,
    /// Per-token branch tables, keyed by token id so nested fan-out
    /// resolves its immediate siblings without touching outer tables.
    pub branch_outputs: IndexMap<TokenId, serde_json::Value>,
    pub subworkflows: IndexMap<TokenId, SubworkflowRecord>,
    pub pending_dispatches: Vec<PendingDispatch>,
    pub status: WorkflowStatus,
    /// Loop visit counters keyed `"{node_id}|{path_id}"`.
    pub iterations: IndexMap<String, u32>,
    /// Watermark for sequential token ids.
    pub next_token_seq: u64,
    /// Watermark for pending-dispatch row ids.
    pub next_dispatch_id: u64,
}

/// Loop-counter key.
pub(crate) fn iteration_key(node_id: &wonder_core::NodeId, path_id: &str) -> String {
    format!("{node_id}|{path_id}")
}

impl RunState {
    pub fn token(&self, id: &TokenId) -> Option<&Token> {
        self.tokens.get(id)
    }

    /// Tokens that are not in a terminal status.
    pub fn active_tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values().filter(|t| !t.is_terminal())
    }

    pub fn fan_in(&self, sibling_group: &str, node: &wonder_core::NodeId) -> Option<&FanInRecord> {
        self.fan_ins.get(&fan_in_key(sibling_group, node))
    }

    pub fn iteration_count(&self, node_id: &wonder_core::NodeId, path_id: &str) -> u32 {
        self.iterations.get(&iteration_key(node_id, path_id)).copied().unwrap_or(0)
    }

    pub fn subworkflow(&self, parent_token: &TokenId) -> Option<&SubworkflowRecord> {
        self.subworkflows.get(parent_token)
    }

    /// Apply one state decision. `now_ms` is the command's enqueue
    /// timestamp (carried by the WAL entry on replay), used for the
    /// bookkeeping timestamps.
    pub fn apply(
        &mut self,
        decision: &Decision,
        now_ms: u64,
    ) -> Result<Vec<TraceEvent>, ApplyError> {
        match decision {
            Decision::InitializeWorkflow {
                run_id,
                definition_id,
                version,
                input,
                parent,
                trace_enabled,
            } => {
                self.meta = RunMeta {
                    run_id: *run_id,
                    definition_id: *definition_id,
                    version: *version,
                    parent: parent.clone(),
                    trace_enabled: *trace_enabled,
                };
                self.context.input = input.clone();
                self.status.status = RunStatus::Running;
                self.status.created_at_ms = now_ms;
                self.status.updated_at_ms = now_ms;
                Ok(vec![TraceEvent::operation("workflow.initialized", now_ms)
                    .field("definition_id", definition_id.to_string())
                    .field("version", *version)])
            }

            Decision::CreateToken { .. }
            | Decision::BatchCreateTokens { .. }
            | Decision::UpdateTokenStatus { .. }
            | Decision::MarkWaiting { .. }
            | Decision::CancelToken { .. }
            | Decision::RecordIteration { .. } => tokens::apply(self, decision, now_ms),

            Decision::SetContextField { .. }
            | Decision::ApplyOutputMapping { .. }
            | Decision::InitBranchTable { .. }
            | Decision::ApplyBranchOutput { .. }
            | Decision::MergeBranches { .. }
            | Decision::DropBranchTables { .. } => context::apply(self, decision, now_ms),

            Decision::TryCreateFanIn { .. }
            | Decision::RecordFanInArrival { .. }
            | Decision::SetFanInActivated { .. } => fan_ins::apply(self, decision, now_ms),

            Decision::InitSubworkflowRecord { .. }
            | Decision::ClearSubworkflowRecord { .. }
            | Decision::PersistDispatch { .. }
            | Decision::ClearDispatch { .. } => subworkflows::apply(self, decision, now_ms),

            Decision::SetWorkflowStatus { status, final_output, error } => {
                // The first terminal status wins; later writes are no-ops.
                if self.status.status.is_terminal() && *status != self.status.status {
                    return Ok(vec![]);
                }
                self.status.status = *status;
                self.status.final_output = final_output.clone();
                self.status.error = error.clone();
                self.status.updated_at_ms = now_ms;
                Ok(vec![TraceEvent::operation("workflow.status_updated", now_ms)
                    .field("status", status.to_string())])
            }

            // Effect-phase decisions must never reach the state executor.
            Decision::DispatchToken { .. }
            | Decision::StartSubworkflow { .. }
            | Decision::NotifyParent { .. }
            | Decision::CancelSubworkflow { .. }
            | Decision::UpdateResourcesStatus { .. }
            | Decision::ScheduleAlarm { .. }
            | Decision::EnqueueCommandSelf { .. } => {
                Err(ApplyError::EffectPhase(decision.name()))
            }
        }
    }
}

#[cfg(test)]
#[path = "../state_tests/mod.rs"]
mod tests;
