// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter traits for the Coordinator's external collaborators.
//!
//! The Coordinator is the only caller; every adapter call must be
//! idempotent under the documented keys (dispatch by token id, parent
//! notification by `(child_run_id, parent_token_id)`, status updates
//! last-write-wins).

mod local;

pub use local::{BufferSink, LocalExecutor, NoopPeer, RunOutcomeRecord, StaticResources};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use wonder_core::{
    DefId, ErrorObject, NodeId, OnFailure, RunId, RunOutcome, RunStatus, TokenId, TraceEvent,
    WorkflowDef,
};

#[derive(Debug, Error)]
pub enum AdapterError {
    /// Transient: worth retrying with backoff.
    #[error("adapter unavailable: {0}")]
    Unavailable(String),

    /// Permanent: retrying will not help.
    #[error("adapter rejected request: {0}")]
    Rejected(String),
}

impl AdapterError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, AdapterError::Unavailable(_))
    }
}

/// One task handed to the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDispatch {
    pub run_id: RunId,
    pub token_id: TokenId,
    pub node_id: NodeId,
    pub action_id: String,
    pub input: Value,
    pub timeout_ms: Option<u64>,
}

/// The stateless task executor. Results come back asynchronously as
/// `TaskResult`/`TaskError`/`MarkExecuting` commands.
#[async_trait]
pub trait ExecutorAdapter: Send + Sync + 'static {
    async fn dispatch_task(&self, task: TaskDispatch) -> Result<(), AdapterError>;
}

/// The shared resources catalog: definitions in, run status out.
#[async_trait]
pub trait ResourcesAdapter: Send + Sync + 'static {
    async fn get_workflow_def(
        &self,
        id: &DefId,
        version: Option<u32>,
    ) -> Result<WorkflowDef, AdapterError>;

    async fn update_run_status(
        &self,
        run_id: &RunId,
        status: RunStatus,
        output: Option<Value>,
        error: Option<ErrorObject>,
    ) -> Result<(), AdapterError>;
}

/// Request to start a child coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct StartSubworkflow {
    pub child_run_id: RunId,
    pub definition_id: DefId,
    pub version: Option<u32>,
    pub input: Value,
    pub parent_run_id: RunId,
    pub parent_token_id: TokenId,
    pub on_failure: OnFailure,
}

/// Coordinator-to-coordinator calls. Always reached through the
/// trampoline, never inline from planning.
#[async_trait]
pub trait PeerAdapter: Send + Sync + 'static {
    async fn start_subworkflow(&self, req: StartSubworkflow) -> Result<(), AdapterError>;

    async fn notify_parent(
        &self,
        parent_run_id: &RunId,
        parent_token_id: TokenId,
        child_run_id: &RunId,
        outcome: RunOutcome,
    ) -> Result<(), AdapterError>;

    async fn cancel_subworkflow(&self, child_run_id: &RunId) -> Result<(), AdapterError>;
}

/// Append-only observability sink.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    async fn append(&self, events: Vec<TraceEvent>) -> Result<(), AdapterError>;
}
