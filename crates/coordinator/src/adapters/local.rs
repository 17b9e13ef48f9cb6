// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process adapters for local runs and tests.
//!
//! `LocalExecutor` feeds task results straight back into the command
//! queue (mock actions echo their input); `StaticResources` serves
//! definitions from memory; `NoopPeer` refuses cross-run calls;
//! `BufferSink` collects trace events.

use super::{
    AdapterError, EventSink, ExecutorAdapter, PeerAdapter, ResourcesAdapter, StartSubworkflow,
    TaskDispatch,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use wonder_core::{
    Clock, CommandKind, DefId, ErrorObject, RunId, RunOutcome, RunStatus, TokenId, TraceEvent,
    WorkflowDef,
};

/// Executes tasks in-process by echoing the task input as its output.
///
/// Used by the CLI `run`/`test` commands, where actions are mocked: the
/// interesting behavior is the graph, not the task bodies. Results are
/// pushed back onto the coordinator's own command queue, which exists
/// only after the coordinator is built, hence the late `connect`.
pub struct LocalExecutor<C: Clock> {
    cmd_tx: Mutex<Option<mpsc::Sender<wonder_core::Command>>>,
    clock: C,
}

impl<C: Clock> LocalExecutor<C> {
    pub fn new(clock: C) -> Self {
        Self { cmd_tx: Mutex::new(None), clock }
    }

    /// Wire the executor to the coordinator's command queue.
    pub fn connect(&self, cmd_tx: mpsc::Sender<wonder_core::Command>) {
        *self.cmd_tx.lock() = Some(cmd_tx);
    }
}

#[async_trait]
impl<C: Clock> ExecutorAdapter for LocalExecutor<C> {
    async fn dispatch_task(&self, task: TaskDispatch) -> Result<(), AdapterError> {
        let Some(tx) = self.cmd_tx.lock().clone() else {
            return Err(AdapterError::Unavailable("executor not connected".into()));
        };
        let now = self.clock.epoch_ms();
        let executing = wonder_core::Command::new(
            CommandKind::MarkExecuting { token_id: task.token_id },
            now,
        );
        let result = wonder_core::Command::new(
            CommandKind::TaskResult { token_id: task.token_id, output: task.input },
            now,
        );
        tx.send(executing).await.map_err(|e| AdapterError::Unavailable(e.to_string()))?;
        tx.send(result).await.map_err(|e| AdapterError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

/// In-memory definition catalog keyed by `(definition id, version)`.
#[derive(Default)]
pub struct StaticResources {
    defs: Mutex<HashMap<(DefId, u32), Arc<WorkflowDef>>>,
    latest: Mutex<HashMap<DefId, u32>>,
    statuses: Mutex<Vec<(RunId, RunStatus)>>,
    outcomes: Mutex<HashMap<RunId, RunOutcomeRecord>>,
}

/// Last status update recorded per run (the catalog mirror is
/// last-write-wins).
#[derive(Debug, Clone)]
pub struct RunOutcomeRecord {
    pub status: RunStatus,
    pub output: Option<Value>,
    pub error: Option<ErrorObject>,
}

impl StaticResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, def: WorkflowDef) {
        let key = (def.id, def.version);
        let mut latest = self.latest.lock();
        let entry = latest.entry(def.id).or_insert(def.version);
        if def.version > *entry {
            *entry = def.version;
        }
        self.defs.lock().insert(key, Arc::new(def));
    }

    /// Status updates observed so far (last-write-wins mirror).
    pub fn statuses(&self) -> Vec<(RunId, RunStatus)> {
        self.statuses.lock().clone()
    }

    /// Final recorded outcome for a run.
    pub fn outcome(&self, run_id: &RunId) -> Option<RunOutcomeRecord> {
        self.outcomes.lock().get(run_id).cloned()
    }
}

#[async_trait]
impl ResourcesAdapter for StaticResources {
    async fn get_workflow_def(
        &self,
        id: &DefId,
        version: Option<u32>,
    ) -> Result<WorkflowDef, AdapterError> {
        let version = match version {
            Some(v) => v,
            None => *self
                .latest
                .lock()
                .get(id)
                .ok_or_else(|| AdapterError::Rejected(format!("unknown definition {id}")))?,
        };
        self.defs
            .lock()
            .get(&(*id, version))
            .map(|d| d.as_ref().clone())
            .ok_or_else(|| AdapterError::Rejected(format!("unknown definition {id} v{version}")))
    }

    async fn update_run_status(
        &self,
        run_id: &RunId,
        status: RunStatus,
        output: Option<Value>,
        error: Option<ErrorObject>,
    ) -> Result<(), AdapterError> {
        self.statuses.lock().push((*run_id, status));
        self.outcomes
            .lock()
            .insert(*run_id, RunOutcomeRecord { status, output, error });
        Ok(())
    }
}

/// Peer adapter for runs without sub-workflows.
#[derive(Default)]
pub struct NoopPeer;

#[async_trait]
impl PeerAdapter for NoopPeer {
    async fn start_subworkflow(&self, req: StartSubworkflow) -> Result<(), AdapterError> {
        Err(AdapterError::Rejected(format!(
            "no peer coordinator available for {}",
            req.definition_id
        )))
    }

    async fn notify_parent(
        &self,
        _parent_run_id: &RunId,
        _parent_token_id: TokenId,
        _child_run_id: &RunId,
        _outcome: RunOutcome,
    ) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn cancel_subworkflow(&self, _child_run_id: &RunId) -> Result<(), AdapterError> {
        Ok(())
    }
}

/// Collects trace events in memory.
#[derive(Default)]
pub struct BufferSink {
    events: Mutex<Vec<TraceEvent>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    /// Names of collected events, for assertions.
    pub fn names(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.name.clone()).collect()
    }

    pub fn count_named(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name == name).count()
    }
}

#[async_trait]
impl EventSink for BufferSink {
    async fn append(&self, events: Vec<TraceEvent>) -> Result<(), AdapterError> {
        self.events.lock().extend(events);
        Ok(())
    }
}
