// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Phase 2 of command application: the effect executor.
//!
//! Fires external RPCs for effect decisions after the transaction has
//! committed. Effects are idempotent under their documented keys, so a
//! crash between commit and effect delivery is recovered by re-driving
//! the same effects. Transient adapter failures retry with exponential
//! backoff (cap 3 attempts); a task dispatch that still fails enqueues a
//! `TaskError` follow-up so the run can route or fail.

use crate::adapters::{
    AdapterError, ExecutorAdapter, PeerAdapter, ResourcesAdapter, StartSubworkflow, TaskDispatch,
};
use crate::config::RetryPolicy;
use crate::scheduler::Scheduler;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use wonder_core::{
    Clock, Command, CommandKind, Decision, ErrorObject, FailureKind, RunId, TraceEvent,
};

pub struct EffectExecutor<E, R, P, C: Clock> {
    run_id: RunId,
    executor: Arc<E>,
    resources: Arc<R>,
    peers: Arc<P>,
    cmd_tx: mpsc::Sender<Command>,
    scheduler: Arc<Mutex<Scheduler>>,
    retry: RetryPolicy,
    clock: C,
}

impl<E, R, P, C> EffectExecutor<E, R, P, C>
where
    E: ExecutorAdapter,
    R: ResourcesAdapter,
    P: PeerAdapter,
    C: Clock,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: RunId,
        executor: Arc<E>,
        resources: Arc<R>,
        peers: Arc<P>,
        cmd_tx: mpsc::Sender<Command>,
        scheduler: Arc<Mutex<Scheduler>>,
        retry: RetryPolicy,
        clock: C,
    ) -> Self {
        Self { run_id, executor, resources, peers, cmd_tx, scheduler, retry, clock }
    }

    /// Execute effect decisions in order. Returns `dispatch.*` trace
    /// events for failures; successes are logged, not traced.
    pub async fn execute_all(&self, effects: Vec<Decision>) -> Vec<TraceEvent> {
        let mut trace = Vec::new();
        for effect in effects {
            trace.extend(self.execute(effect).await);
        }
        trace
    }

    async fn execute(&self, effect: Decision) -> Vec<TraceEvent> {
        let info: String =
            effect.fields().iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(" ");
        let op = effect.name();
        if effect.verbose() {
            tracing::info!(run_id = %self.run_id, "executing effect={op} {info}");
        }

        let start = std::time::Instant::now();
        let result = self.execute_inner(&effect).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(()) if effect.verbose() => tracing::info!(elapsed_ms, "completed effect={op}"),
            Ok(()) => tracing::debug!(elapsed_ms, "effect={op} {info}"),
            Err(e) => tracing::error!(error = %e, elapsed_ms, "error effect={op} {info}"),
        }

        match result {
            Ok(()) => Vec::new(),
            Err(e) => self.handle_failure(&effect, e).await,
        }
    }

    async fn execute_inner(&self, effect: &Decision) -> Result<(), AdapterError> {
        match effect.clone() {
            Decision::DispatchToken { token_id, node_id, action_id, input, timeout_ms } => {
                let task = TaskDispatch {
                    run_id: self.run_id,
                    token_id,
                    node_id,
                    action_id,
                    input,
                    timeout_ms,
                };
                self.with_retry(|| self.executor.dispatch_task(task.clone())).await
            }

            Decision::StartSubworkflow {
                child_run_id,
                definition_id,
                version,
                input,
                parent_token_id,
                on_failure,
            } => {
                let req = StartSubworkflow {
                    child_run_id,
                    definition_id,
                    version,
                    input,
                    parent_run_id: self.run_id,
                    parent_token_id,
                    on_failure,
                };
                self.with_retry(|| self.peers.start_subworkflow(req.clone())).await
            }

            Decision::NotifyParent { parent_run_id, parent_token_id, child_run_id, outcome } => {
                self.with_retry(|| {
                    self.peers.notify_parent(
                        &parent_run_id,
                        parent_token_id,
                        &child_run_id,
                        outcome.clone(),
                    )
                })
                .await
            }

            Decision::CancelSubworkflow { child_run_id } => {
                self.with_retry(|| self.peers.cancel_subworkflow(&child_run_id)).await
            }

            Decision::UpdateResourcesStatus { status, output, error } => {
                self.with_retry(|| {
                    self.resources.update_run_status(
                        &self.run_id,
                        status,
                        output.clone(),
                        error.clone(),
                    )
                })
                .await
            }

            Decision::ScheduleAlarm { at_ms } => {
                self.scheduler.lock().set(at_ms);
                Ok(())
            }

            Decision::EnqueueCommandSelf { command } => {
                self.enqueue(command).await;
                Ok(())
            }

            other => {
                // State decisions never reach the effect executor.
                tracing::error!(decision = other.name(), "state decision in effect phase");
                Ok(())
            }
        }
    }

    /// Failure handling after retries: trace the error and, where a token
    /// is waiting on the effect, push a follow-up command so the run can
    /// route the failure instead of hanging.
    async fn handle_failure(&self, effect: &Decision, error: AdapterError) -> Vec<TraceEvent> {
        let now = self.clock.epoch_ms();
        let mut events = vec![TraceEvent::dispatch("error", now)
            .field("effect", effect.name())
            .field("error", error.to_string())];

        match effect {
            Decision::DispatchToken { token_id, node_id, .. } => {
                events[0].token_id = Some(*token_id);
                events[0].node_id = Some(node_id.clone());
                self.enqueue(CommandKind::TaskError {
                    token_id: *token_id,
                    error: ErrorObject::from_kind(
                        FailureKind::DispatchFailed,
                        format!("task dispatch failed: {error}"),
                    ),
                })
                .await;
            }
            Decision::StartSubworkflow { parent_token_id, .. } => {
                events[0].token_id = Some(*parent_token_id);
                self.enqueue(CommandKind::SubworkflowError {
                    token_id: *parent_token_id,
                    error: ErrorObject::from_kind(
                        FailureKind::DispatchFailed,
                        format!("subworkflow start failed: {error}"),
                    ),
                })
                .await;
            }
            // Notification and status failures are logged and traced;
            // they do not change run state.
            _ => {}
        }
        events
    }

    async fn enqueue(&self, kind: CommandKind) {
        let command = Command::new(kind, self.clock.epoch_ms());
        if let Err(e) = self.cmd_tx.send(command).await {
            tracing::error!(run_id = %self.run_id, error = %e, "self-enqueue failed");
        }
    }

    async fn with_retry<T, Fut, F>(&self, mut call: F) -> Result<T, AdapterError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AdapterError>>,
    {
        let mut attempt = 1u32;
        loop {
            let delay = self.retry.delay_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retriable() && attempt < self.retry.max_attempts => {
                    tracing::warn!(attempt, error = %e, "effect attempt failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
#[path = "effects_tests.rs"]
mod tests;
