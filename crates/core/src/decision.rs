// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decisions: the value-typed output of planning.
//!
//! Planning returns one flat, ordered decision list per command. State
//! decisions (phase 1) are applied inside a single local-store
//! transaction; effect decisions (phase 2) fire external RPCs after
//! commit. Every value a decision writes is resolved at planning time, so
//! apply is mechanical and a run's decision stream replays bit-exact.

use crate::command::CommandKind;
use crate::definition::WaitFor;
use crate::error::ErrorObject;
use crate::id::{DefId, NodeId, RunId, TokenId};
use crate::path::ContextPath;
use crate::run::{OnFailure, ParentRef, PendingDispatch, RunOutcome, RunStatus, SubworkflowRecord};
use crate::token::{Token, TokenStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which apply phase a decision belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Applied in the store transaction.
    State,
    /// External RPC after commit.
    Effect,
}

/// One resolved context write: `(path, value)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextWrite {
    pub path: ContextPath,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decision {
    // === Phase 1: state mutations ===
    /// First decision of a run: meta, validated input, running status.
    InitializeWorkflow {
        run_id: RunId,
        definition_id: DefId,
        version: u32,
        input: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<ParentRef>,
        #[serde(default)]
        trace_enabled: bool,
    },

    CreateToken { token: Token },

    BatchCreateTokens { tokens: Vec<Token> },

    UpdateTokenStatus {
        token_id: TokenId,
        status: TokenStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorObject>,
    },

    /// Move a token into one of the waiting states.
    MarkWaiting { token_id: TokenId, status: TokenStatus },

    CancelToken { token_id: TokenId },

    SetContextField { write: ContextWrite },

    /// A completed token's output mapping, resolved to shared-context
    /// writes.
    ApplyOutputMapping { token_id: TokenId, writes: Vec<ContextWrite> },

    /// Create the isolated branch table for a fan-out token.
    InitBranchTable { token_id: TokenId },

    /// Write a branch token's output into its branch table.
    ApplyBranchOutput { token_id: TokenId, output: Value },

    /// Write the computed merge value to the target path and count the
    /// merge against the sibling group's fan-in record.
    MergeBranches {
        sibling_group: String,
        fan_in_node_id: NodeId,
        source_tokens: Vec<TokenId>,
        target: ContextPath,
        merged: Value,
    },

    DropBranchTables { token_ids: Vec<TokenId> },

    /// Conditional insert of the fan-in rendezvous row; a no-op when the
    /// row already exists. This is the first fan-in atomicity point.
    TryCreateFanIn {
        sibling_group: String,
        fan_in_node_id: NodeId,
        wait_for: WaitFor,
        total: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deadline_at_ms: Option<u64>,
    },

    RecordFanInArrival {
        sibling_group: String,
        fan_in_node_id: NodeId,
        token_id: TokenId,
    },

    /// Conditional activation (`activated_at` must be null); a no-op when
    /// already activated. The second fan-in atomicity point.
    SetFanInActivated {
        sibling_group: String,
        fan_in_node_id: NodeId,
        merged_token_id: TokenId,
        activated_at_ms: u64,
    },

    SetWorkflowStatus {
        status: RunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        final_output: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorObject>,
    },

    InitSubworkflowRecord { record: SubworkflowRecord },

    ClearSubworkflowRecord { parent_token_id: TokenId },

    /// Count a visit to `(node_id, path_id)` for loop enforcement.
    RecordIteration { node_id: NodeId, path_id: String },

    /// Persist a coordinator-to-coordinator call for the trampoline.
    PersistDispatch { dispatch: PendingDispatch },

    ClearDispatch { dispatch_id: u64 },

    // === Phase 2: external effects ===
    /// Hand a task to the executor. Idempotency key: the token id.
    DispatchToken {
        token_id: TokenId,
        node_id: NodeId,
        action_id: String,
        input: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Start a child coordinator (always via trampoline drain).
    StartSubworkflow {
        child_run_id: RunId,
        definition_id: DefId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<u32>,
        input: Value,
        parent_token_id: TokenId,
        #[serde(default)]
        on_failure: OnFailure,
    },

    /// Deliver this run's outcome to the waiting parent (always via
    /// trampoline drain). Idempotency key: `(child_run_id, parent_token)`.
    NotifyParent {
        parent_run_id: RunId,
        parent_token_id: TokenId,
        child_run_id: RunId,
        outcome: RunOutcome,
    },

    /// Propagate cancellation into a child run.
    CancelSubworkflow { child_run_id: RunId },

    /// Last-write-wins status mirror in the resources catalog.
    UpdateResourcesStatus {
        status: RunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorObject>,
    },

    /// Arm the run's single alarm; replaces any pending alarm.
    ScheduleAlarm { at_ms: u64 },

    /// Enqueue a follow-up command on this run's own queue.
    EnqueueCommandSelf { command: CommandKind },
}

impl Decision {
    pub fn phase(&self) -> Phase {
        match self {
            Decision::DispatchToken { .. }
            | Decision::StartSubworkflow { .. }
            | Decision::NotifyParent { .. }
            | Decision::CancelSubworkflow { .. }
            | Decision::UpdateResourcesStatus { .. }
            | Decision::ScheduleAlarm { .. }
            | Decision::EnqueueCommandSelf { .. } => Phase::Effect,
            _ => Phase::State,
        }
    }

    pub fn is_effect(&self) -> bool {
        self.phase() == Phase::Effect
    }

    /// Decision name for log spans (e.g. "create_token", "dispatch_token").
    pub fn name(&self) -> &'static str {
        match self {
            Decision::InitializeWorkflow { .. } => "initialize_workflow",
            Decision::CreateToken { .. } => "create_token",
            Decision::BatchCreateTokens { .. } => "batch_create_tokens",
            Decision::UpdateTokenStatus { .. } => "update_token_status",
            Decision::MarkWaiting { .. } => "mark_waiting",
            Decision::CancelToken { .. } => "cancel_token",
            Decision::SetContextField { .. } => "set_context_field",
            Decision::ApplyOutputMapping { .. } => "apply_output_mapping",
            Decision::InitBranchTable { .. } => "init_branch_table",
            Decision::ApplyBranchOutput { .. } => "apply_branch_output",
            Decision::MergeBranches { .. } => "merge_branches",
            Decision::DropBranchTables { .. } => "drop_branch_tables",
            Decision::TryCreateFanIn { .. } => "try_create_fan_in",
            Decision::RecordFanInArrival { .. } => "record_fan_in_arrival",
            Decision::SetFanInActivated { .. } => "set_fan_in_activated",
            Decision::SetWorkflowStatus { .. } => "set_workflow_status",
            Decision::InitSubworkflowRecord { .. } => "init_subworkflow_record",
            Decision::ClearSubworkflowRecord { .. } => "clear_subworkflow_record",
            Decision::RecordIteration { .. } => "record_iteration",
            Decision::PersistDispatch { .. } => "persist_dispatch",
            Decision::ClearDispatch { .. } => "clear_dispatch",
            Decision::DispatchToken { .. } => "dispatch_token",
            Decision::StartSubworkflow { .. } => "start_subworkflow",
            Decision::NotifyParent { .. } => "notify_parent",
            Decision::CancelSubworkflow { .. } => "cancel_subworkflow",
            Decision::UpdateResourcesStatus { .. } => "update_resources_status",
            Decision::ScheduleAlarm { .. } => "schedule_alarm",
            Decision::EnqueueCommandSelf { .. } => "enqueue_command_self",
        }
    }

    /// Key-value pairs for structured logging
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Decision::InitializeWorkflow { run_id, definition_id, version, .. } => vec![
                ("run_id", run_id.to_string()),
                ("definition_id", definition_id.to_string()),
                ("version", version.to_string()),
            ],
            Decision::CreateToken { token } => vec![
                ("token_id", token.id.to_string()),
                ("node_id", token.node_id.to_string()),
                ("path_id", token.path_id.clone()),
            ],
            Decision::BatchCreateTokens { tokens } => {
                vec![("count", tokens.len().to_string())]
            }
            Decision::UpdateTokenStatus { token_id, status, .. } => vec![
                ("token_id", token_id.to_string()),
                ("status", status.to_string()),
            ],
            Decision::MarkWaiting { token_id, status } => vec![
                ("token_id", token_id.to_string()),
                ("status", status.to_string()),
            ],
            Decision::CancelToken { token_id } => vec![("token_id", token_id.to_string())],
            Decision::SetContextField { write } => vec![("path", write.path.to_string())],
            Decision::ApplyOutputMapping { token_id, writes } => vec![
                ("token_id", token_id.to_string()),
                ("writes", writes.len().to_string()),
            ],
            Decision::InitBranchTable { token_id } => {
                vec![("token_id", token_id.to_string())]
            }
            Decision::ApplyBranchOutput { token_id, .. } => {
                vec![("token_id", token_id.to_string())]
            }
            Decision::MergeBranches { sibling_group, target, source_tokens, .. } => vec![
                ("sibling_group", sibling_group.clone()),
                ("target", target.to_string()),
                ("branches", source_tokens.len().to_string()),
            ],
            Decision::DropBranchTables { token_ids } => {
                vec![("count", token_ids.len().to_string())]
            }
            Decision::TryCreateFanIn { sibling_group, fan_in_node_id, total, .. } => vec![
                ("sibling_group", sibling_group.clone()),
                ("node_id", fan_in_node_id.to_string()),
                ("total", total.to_string()),
            ],
            Decision::RecordFanInArrival { sibling_group, token_id, .. } => vec![
                ("sibling_group", sibling_group.clone()),
                ("token_id", token_id.to_string()),
            ],
            Decision::SetFanInActivated { sibling_group, merged_token_id, .. } => vec![
                ("sibling_group", sibling_group.clone()),
                ("merged_token_id", merged_token_id.to_string()),
            ],
            Decision::SetWorkflowStatus { status, .. } => {
                vec![("status", status.to_string())]
            }
            Decision::InitSubworkflowRecord { record } => vec![
                ("parent_token_id", record.parent_token_id.to_string()),
                ("child_run_id", record.child_run_id.to_string()),
            ],
            Decision::ClearSubworkflowRecord { parent_token_id } => {
                vec![("parent_token_id", parent_token_id.to_string())]
            }
            Decision::RecordIteration { node_id, path_id } => vec![
                ("node_id", node_id.to_string()),
                ("path_id", path_id.clone()),
            ],
            Decision::PersistDispatch { dispatch } => vec![
                ("dispatch_id", dispatch.id.to_string()),
                ("kind", dispatch.kind.name().to_string()),
            ],
            Decision::ClearDispatch { dispatch_id } => {
                vec![("dispatch_id", dispatch_id.to_string())]
            }
            Decision::DispatchToken { token_id, node_id, action_id, .. } => vec![
                ("token_id", token_id.to_string()),
                ("node_id", node_id.to_string()),
                ("action_id", action_id.clone()),
            ],
            Decision::StartSubworkflow { child_run_id, definition_id, .. } => vec![
                ("child_run_id", child_run_id.to_string()),
                ("definition_id", definition_id.to_string()),
            ],
            Decision::NotifyParent { parent_run_id, child_run_id, outcome, .. } => vec![
                ("parent_run_id", parent_run_id.to_string()),
                ("child_run_id", child_run_id.to_string()),
                ("outcome", outcome.name().to_string()),
            ],
            Decision::CancelSubworkflow { child_run_id } => {
                vec![("child_run_id", child_run_id.to_string())]
            }
            Decision::UpdateResourcesStatus { status, .. } => {
                vec![("status", status.to_string())]
            }
            Decision::ScheduleAlarm { at_ms } => vec![("at_ms", at_ms.to_string())],
            Decision::EnqueueCommandSelf { command } => {
                vec![("command", command.name().to_string())]
            }
        }
    }

    /// Whether to log 'started' and 'completed' separately, or just one
    /// 'executed' line for frequent, cheap decisions.
    pub fn verbose(&self) -> bool {
        !matches!(
            self,
            Decision::ScheduleAlarm { .. }
                | Decision::RecordIteration { .. }
                | Decision::RecordFanInArrival { .. }
        )
    }
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
