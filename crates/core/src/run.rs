// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-level records: workflow status, parent linkage, sub-workflow
//! tracking, and pending cross-coordinator dispatches (the trampoline).

use crate::error::ErrorObject;
use crate::id::{DefId, RunId, TokenId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Workflow-run status as visible to parents and the resources catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
    Waiting,
}

crate::simple_display! {
    RunStatus {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
        Waiting => "waiting",
    }
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled)
    }
}

/// Reference to the parent run awaiting this run as a sub-workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentRef {
    pub run_id: RunId,
    pub token_id: TokenId,
}

/// Immutable identity of a run, fixed at initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: RunId,
    pub definition_id: DefId,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
    #[serde(default)]
    pub trace_enabled: bool,
}

impl RunMeta {
    pub fn new(run_id: RunId, definition_id: DefId, version: u32) -> Self {
        Self { run_id, definition_id, version, parent: None, trace_enabled: false }
    }
}

// An uninitialized run has empty ids, not random ones: the default state
// must be deterministic for the replay property.
impl Default for RunMeta {
    fn default() -> Self {
        Self {
            run_id: RunId::from_string(""),
            definition_id: DefId::from_string(""),
            version: 0,
            parent: None,
            trace_enabled: false,
        }
    }
}

/// Local mirror of the run's parent-visible state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStatus {
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        Self {
            status: RunStatus::Running,
            final_output: None,
            error: None,
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }
}

/// Failure handling for a sub-workflow invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    /// Child failure fails the parent token.
    #[default]
    Propagate,
    /// Child failure completes the parent token with the error written
    /// into context output for downstream routing.
    Catch,
}

crate::simple_display! {
    OnFailure {
        Propagate => "propagate",
        Catch => "catch",
    }
}

/// Tracks a parent token awaiting a child run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubworkflowRecord {
    pub parent_token_id: TokenId,
    pub child_run_id: RunId,
    pub definition_id: DefId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Context path → path into the child's final output.
    #[serde(default)]
    pub output_mapping: IndexMap<String, String>,
    #[serde(default)]
    pub on_failure: OnFailure,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_at_ms: Option<u64>,
    pub created_at_ms: u64,
}

/// Final outcome of a run, as delivered to its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed { output: Value },
    Failed { error: ErrorObject },
    Cancelled,
}

impl RunOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            RunOutcome::Completed { .. } => "completed",
            RunOutcome::Failed { .. } => "failed",
            RunOutcome::Cancelled => "cancelled",
        }
    }
}

/// A persisted coordinator-to-coordinator call awaiting the trampoline.
///
/// Cross-coordinator effects are never fired inline: they are written to
/// the pending-dispatch table and drained by the immediate alarm that
/// follows, resetting call-stack depth between coordinators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDispatch {
    pub id: u64,
    pub kind: DispatchKind,
    pub created_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchKind {
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
    NotifyParent {
        parent_run_id: RunId,
        parent_token_id: TokenId,
        outcome: RunOutcome,
    },
    CancelSubworkflow {
        child_run_id: RunId,
    },
}

impl DispatchKind {
    pub fn name(&self) -> &'static str {
        match self {
            DispatchKind::StartSubworkflow { .. } => "start_subworkflow",
            DispatchKind::NotifyParent { .. } => "notify_parent",
            DispatchKind::CancelSubworkflow { .. } => "cancel_subworkflow",
        }
    }
}
