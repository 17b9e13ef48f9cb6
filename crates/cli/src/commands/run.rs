// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wonder run`: execute a workflow locally.
//!
//! Builds a full Coordinator around the in-process mock executor (tasks
//! echo their input), drives the run to completion, and prints the
//! outcome. The run's store lives in a temp directory and is destroyed
//! with the run.

use crate::exit_error::ExitError;
use crate::{defs, output};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use wonder_coordinator::adapters::{
    BufferSink, LocalExecutor, NoopPeer, RunOutcomeRecord, StaticResources,
};
use wonder_coordinator::{Coordinator, CoordinatorConfig};
use wonder_core::{CmpEvaluator, CommandKind, RunId, RunMeta, RunStatus, SystemClock, WorkflowDef};

pub async fn run(file: &Path, input: &str, trace: bool) -> Result<(), ExitError> {
    let def = defs::load(file)?;
    def.validate()
        .map_err(|e| ExitError::validation(e.to_string()))?;
    let input: Value = serde_json::from_str(input)
        .map_err(|e| ExitError::validation(format!("invalid --input: {e}")))?;

    let outcome = execute(def, input, trace).await?;

    match outcome.status {
        RunStatus::Completed => {
            output::json(&outcome.output.unwrap_or(Value::Null));
            Ok(())
        }
        status => {
            let detail = outcome
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| status.to_string());
            Err(ExitError::validation(format!("workflow {status}: {detail}")))
        }
    }
}

/// Drive one run in-process and return its final catalog record.
pub(crate) async fn execute(
    def: WorkflowDef,
    input: Value,
    trace: bool,
) -> Result<RunOutcomeRecord, ExitError> {
    let run_id = RunId::new();
    let meta = RunMeta::new(run_id, def.id, def.version);

    let store_dir = std::env::temp_dir()
        .join("wonder")
        .join("runs")
        .join(run_id.suffix());

    let resources = Arc::new(StaticResources::new());
    resources.insert(def);
    let executor = Arc::new(LocalExecutor::new(SystemClock));
    let sink = Arc::new(BufferSink::new());

    let coordinator = Coordinator::new(
        meta,
        CoordinatorConfig::new(store_dir).trace_enabled(trace),
        Arc::clone(&executor),
        Arc::clone(&resources),
        Arc::new(NoopPeer),
        Arc::clone(&sink),
        Arc::new(CmpEvaluator),
        SystemClock,
    )
    .map_err(|e| ExitError::validation(e.to_string()))?;
    executor.connect(coordinator.command_sender());

    let handle = coordinator.handle();
    handle
        .send(CommandKind::Start { trace, input })
        .await
        .map_err(|e| ExitError::validation(e.to_string()))?;
    coordinator
        .run()
        .await
        .map_err(|e| ExitError::validation(e.to_string()))?;

    if trace {
        for event in sink.events() {
            eprintln!("{} {}", event.seq, event.name);
        }
    }

    resources
        .outcome(&run_id)
        .ok_or_else(|| ExitError::validation("run produced no outcome"))
}
