// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The command dispatcher: one Coordinator per run, single writer.
//!
//! Commands arrive on a FIFO queue and are processed strictly one at a
//! time: load the snapshot, plan, apply the state batch in one
//! transaction, fire effects, flush traces. The loop also owns the run's
//! alarm: when its deadline passes, an `Alarm` command is fed into the
//! same serialized stream.

use crate::adapters::{EventSink, ExecutorAdapter, PeerAdapter, ResourcesAdapter};
use crate::apply::apply_state;
use crate::config::CoordinatorConfig;
use crate::defs::DefinitionCache;
use crate::effects::EffectExecutor;
use crate::error::CoordinatorError;
use crate::plan::{plan, Plan};
use crate::scheduler::Scheduler;
use crate::snapshot::WorkflowState;
use crate::trace::TraceEmitter;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use wonder_core::{
    Clock, Command, CommandKind, ConditionEvaluator, Decision, DispatchKind, ErrorObject,
    FailureKind, PendingDispatch, RunMeta, RunStatus, TraceEvent,
};
use wonder_store::LocalStore;

/// Handle for delivering commands to a running Coordinator. Commands are
/// stamped with the enqueue time here, so planning never reads a clock.
pub struct CoordinatorHandle<C: Clock> {
    cmd_tx: mpsc::Sender<Command>,
    clock: C,
}

impl<C: Clock> Clone for CoordinatorHandle<C> {
    fn clone(&self) -> Self {
        Self { cmd_tx: self.cmd_tx.clone(), clock: self.clock.clone() }
    }
}

impl<C: Clock> CoordinatorHandle<C> {
    pub async fn send(&self, kind: CommandKind) -> Result<(), CoordinatorError> {
        let command = Command::new(kind, self.clock.epoch_ms());
        self.cmd_tx.send(command).await.map_err(|_| CoordinatorError::QueueClosed)
    }
}

pub struct Coordinator<E, R, P, S, C: Clock> {
    meta: RunMeta,
    config: CoordinatorConfig,
    store: LocalStore,
    defs: Arc<DefinitionCache<R>>,
    effects: EffectExecutor<E, R, P, C>,
    scheduler: Arc<Mutex<Scheduler>>,
    trace: TraceEmitter<S>,
    eval: Arc<dyn ConditionEvaluator>,
    clock: C,
    cmd_tx: mpsc::Sender<Command>,
    cmd_rx: mpsc::Receiver<Command>,
}

impl<E, R, P, S, C> Coordinator<E, R, P, S, C>
where
    E: ExecutorAdapter,
    R: ResourcesAdapter,
    P: PeerAdapter,
    S: EventSink,
    C: Clock,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        meta: RunMeta,
        config: CoordinatorConfig,
        executor: Arc<E>,
        resources: Arc<R>,
        peers: Arc<P>,
        sink: Arc<S>,
        eval: Arc<dyn ConditionEvaluator>,
        clock: C,
    ) -> Result<Self, CoordinatorError> {
        let store = LocalStore::open(&config.store_dir)?;
        let (cmd_tx, cmd_rx) = mpsc::channel(config.queue_depth);
        let scheduler = Arc::new(Mutex::new(Scheduler::new()));
        let defs = Arc::new(DefinitionCache::new(
            Arc::clone(&resources),
            config.def_cache_capacity,
        ));
        let effects = EffectExecutor::new(
            meta.run_id,
            executor,
            resources,
            peers,
            cmd_tx.clone(),
            Arc::clone(&scheduler),
            config.effect_retry,
            clock.clone(),
        );
        let trace = TraceEmitter::new(sink, meta.run_id, config.trace_enabled);
        Ok(Self {
            meta,
            config,
            store,
            defs,
            effects,
            scheduler,
            trace,
            eval,
            clock,
            cmd_tx,
            cmd_rx,
        })
    }

    pub fn handle(&self) -> CoordinatorHandle<C> {
        CoordinatorHandle { cmd_tx: self.cmd_tx.clone(), clock: self.clock.clone() }
    }

    /// Raw command queue sender, for adapters that feed results back
    /// into this run (the local executor).
    pub fn command_sender(&self) -> mpsc::Sender<Command> {
        self.cmd_tx.clone()
    }

    /// Current materialized state (tests and local host introspection).
    pub fn state(&self) -> &wonder_store::RunState {
        self.store.state()
    }

    pub fn run_id(&self) -> wonder_core::RunId {
        self.meta.run_id
    }

    /// Process one command end to end. Exposed so hosts (and tests) can
    /// drive the coordinator without the background loop; `run()` calls
    /// this for every queued command.
    pub async fn handle_command(&mut self, kind: CommandKind) -> Result<(), CoordinatorError> {
        let command = Command::new(kind, self.clock.epoch_ms());
        self.process(command).await
    }

    /// Drive the run to completion: process queued commands and alarm
    /// firings until the run is terminal and all pending dispatches have
    /// drained.
    pub async fn run(mut self) -> Result<(), CoordinatorError> {
        loop {
            if self.is_finished() {
                break;
            }

            let deadline = self.scheduler.lock().next_deadline();
            let command = match deadline {
                Some(at) => {
                    let now = self.clock.epoch_ms();
                    if at <= now {
                        self.scheduler.lock().take_due(now);
                        Some(Command::new(CommandKind::Alarm, now))
                    } else {
                        tokio::select! {
                            cmd = self.cmd_rx.recv() => cmd,
                            _ = tokio::time::sleep(Duration::from_millis(at - now)) => {
                                let now = self.clock.epoch_ms();
                                self.scheduler.lock().take_due(now);
                                Some(Command::new(CommandKind::Alarm, now))
                            }
                        }
                    }
                }
                None => self.cmd_rx.recv().await,
            };

            match command {
                Some(command) => self.process(command).await?,
                None => break,
            }
        }
        self.finish()
    }

    /// Terminal status with nothing left to deliver.
    pub fn is_finished(&self) -> bool {
        let state = self.store.state();
        state.status.status.is_terminal() && state.pending_dispatches.is_empty()
    }

    fn finish(mut self) -> Result<(), CoordinatorError> {
        if self.is_finished() && !self.config.retain_store {
            tracing::info!(run_id = %self.meta.run_id, "run finished, destroying local store");
            self.store.destroy()?;
        } else {
            self.store.checkpoint()?;
        }
        Ok(())
    }

    async fn process(&mut self, command: Command) -> Result<(), CoordinatorError> {
        let name = command.kind.name();
        self.trace.emit(
            TraceEvent::dispatch("batch.start", command.now_ms).field("command", name),
        );

        let def = self.defs.get(&self.meta.definition_id, Some(self.meta.version)).await?;
        let state = WorkflowState::load(&self.store, def, self.meta.clone());

        let planned = match plan(&state, &command, self.eval.as_ref()) {
            Ok(planned) => planned,
            Err(e) => {
                tracing::error!(run_id = %self.meta.run_id, command = name, error = %e, "planning failed");
                self.internal_failure_plan(&e.to_string())
            }
        };

        for event in planned.trace.clone() {
            self.trace.emit(event);
        }
        for decision in &planned.decisions {
            self.trace.emit(
                TraceEvent::dispatch("decision.planned", command.now_ms)
                    .field("decision", decision.name())
                    .field("effect", decision.is_effect()),
            );
        }

        let mut batch = planned;
        let ops = match apply_state(&mut self.store, name, command.now_ms, &batch.decisions) {
            Ok(ops) => ops,
            Err(first_err) => {
                // One retry for transient store trouble, then the run is
                // failed with internal_error.
                tracing::warn!(error = %first_err, "apply failed, retrying once");
                match apply_state(&mut self.store, name, command.now_ms, &batch.decisions) {
                    Ok(ops) => ops,
                    Err(e) => {
                        tracing::error!(error = %e, "apply retry failed, failing run");
                        batch = self.internal_failure_plan(&e.to_string());
                        for event in batch.trace.clone() {
                            self.trace.emit(event);
                        }
                        apply_state(&mut self.store, name, command.now_ms, &batch.decisions)?
                    }
                }
            }
        };
        for event in ops {
            self.trace.emit(event);
        }

        let effects: Vec<Decision> =
            batch.decisions.iter().filter(|d| d.is_effect()).cloned().collect();
        let effect_trace = self.effects.execute_all(effects).await;
        for event in effect_trace {
            self.trace.emit(event);
        }

        let (state_count, effect_count) = batch.phase_counts();
        self.trace.emit(
            TraceEvent::dispatch("batch.complete", self.clock.epoch_ms())
                .field("command", name)
                .field("state_decisions", state_count)
                .field("effect_decisions", effect_count),
        );
        self.trace.flush().await;
        Ok(())
    }

    /// Minimal decision batch for a planning/apply programming error:
    /// cancel what is active, mark the run failed, tell the catalog, and
    /// notify the parent via trampoline.
    fn internal_failure_plan(&self, message: &str) -> Plan {
        let state = self.store.state();
        let error = ErrorObject::from_kind(FailureKind::InternalError, message.to_string());
        let mut decisions: Vec<Decision> = state
            .active_tokens()
            .map(|t| Decision::CancelToken { token_id: t.id })
            .collect();
        if let Some(parent) = state.meta.parent.clone() {
            decisions.push(Decision::PersistDispatch {
                dispatch: PendingDispatch {
                    id: state.next_dispatch_id,
                    kind: DispatchKind::NotifyParent {
                        parent_run_id: parent.run_id,
                        parent_token_id: parent.token_id,
                        outcome: wonder_core::RunOutcome::Failed { error: error.clone() },
                    },
                    created_at_ms: self.clock.epoch_ms(),
                },
            });
            decisions.push(Decision::ScheduleAlarm { at_ms: self.clock.epoch_ms() });
        }
        decisions.push(Decision::SetWorkflowStatus {
            status: RunStatus::Failed,
            final_output: None,
            error: Some(error.clone()),
        });
        decisions.push(Decision::UpdateResourcesStatus {
            status: RunStatus::Failed,
            output: None,
            error: Some(error),
        });
        let trace = vec![TraceEvent::dispatch("workflow.failed", self.clock.epoch_ms())
            .field("code", "internal_error")];
        Plan { decisions, trace }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
