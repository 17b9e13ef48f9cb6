// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapters::{
    AdapterError, BufferSink, ExecutorAdapter, LocalExecutor, NoopPeer, StaticResources,
    TaskDispatch,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;
use wonder_core::test_support::linear_def;
use wonder_core::{CmpEvaluator, FakeClock, RunId, RunStatus, SystemClock, TokenId};

/// Executor that records dispatches for manual completion.
#[derive(Default)]
struct RecordingExecutor {
    dispatched: Mutex<Vec<TaskDispatch>>,
}

#[async_trait]
impl ExecutorAdapter for RecordingExecutor {
    async fn dispatch_task(&self, task: TaskDispatch) -> Result<(), AdapterError> {
        self.dispatched.lock().push(task);
        Ok(())
    }
}

struct TestRig {
    coordinator: Coordinator<RecordingExecutor, StaticResources, NoopPeer, BufferSink, FakeClock>,
    executor: Arc<RecordingExecutor>,
    sink: Arc<BufferSink>,
    resources: Arc<StaticResources>,
    _dir: tempfile::TempDir,
}

fn rig(def: wonder_core::WorkflowDef) -> TestRig {
    let dir = tempdir().unwrap();
    let resources = Arc::new(StaticResources::new());
    let meta = RunMeta::new(RunId::from_string("run-dispatch-test-000"), def.id, def.version);
    resources.insert(def);
    let executor = Arc::new(RecordingExecutor::default());
    let sink = Arc::new(BufferSink::new());
    let coordinator = Coordinator::new(
        meta,
        CoordinatorConfig::new(dir.path().join("store")),
        Arc::clone(&executor),
        Arc::clone(&resources),
        Arc::new(NoopPeer),
        Arc::clone(&sink),
        Arc::new(CmpEvaluator),
        FakeClock::new(),
    )
    .unwrap();
    TestRig { coordinator, executor, sink, resources, _dir: dir }
}

#[tokio::test]
async fn processes_commands_end_to_end() {
    let mut rig = rig(linear_def(&["a", "b"]));

    rig.coordinator
        .handle_command(CommandKind::Start { trace: true, input: json!({}) })
        .await
        .unwrap();

    // The root task reached the executor with the token id as its key.
    let first = rig.executor.dispatched.lock()[0].clone();
    assert_eq!(first.token_id, TokenId::from_seq(0));
    assert_eq!(first.action_id, "action.a");

    rig.coordinator
        .handle_command(CommandKind::TaskResult {
            token_id: TokenId::from_seq(0),
            output: json!({}),
        })
        .await
        .unwrap();
    rig.coordinator
        .handle_command(CommandKind::TaskResult {
            token_id: TokenId::from_seq(1),
            output: json!({}),
        })
        .await
        .unwrap();

    assert_eq!(rig.coordinator.state().status.status, RunStatus::Completed);
    assert!(rig.coordinator.is_finished());

    // The catalog mirror saw running then completed (last write wins).
    let statuses = rig.resources.statuses();
    assert_eq!(statuses.first().map(|(_, s)| *s), Some(RunStatus::Running));
    assert_eq!(statuses.last().map(|(_, s)| *s), Some(RunStatus::Completed));
}

#[tokio::test]
async fn every_command_is_bracketed_by_batch_events() {
    let mut rig = rig(linear_def(&["a"]));

    rig.coordinator
        .handle_command(CommandKind::Start { trace: true, input: json!({}) })
        .await
        .unwrap();
    rig.coordinator
        .handle_command(CommandKind::TaskResult {
            token_id: TokenId::from_seq(0),
            output: json!({}),
        })
        .await
        .unwrap();

    assert_eq!(rig.sink.count_named("dispatch.batch.start"), 2);
    assert_eq!(rig.sink.count_named("dispatch.batch.complete"), 2);

    // Sequence numbers are run-monotonic across flushes.
    let events = rig.sink.events();
    for pair in events.windows(2) {
        assert!(pair[1].seq > pair[0].seq);
    }
    assert!(events.iter().all(|e| e.run_id == "run-dispatch-test-000"));
}

#[tokio::test]
async fn trace_disabled_emits_nothing() {
    let dir = tempdir().unwrap();
    let def = linear_def(&["a"]);
    let resources = Arc::new(StaticResources::new());
    let meta = RunMeta::new(RunId::from_string("run-quiet-0000000000"), def.id, def.version);
    resources.insert(def);
    let sink = Arc::new(BufferSink::new());
    let mut coordinator = Coordinator::new(
        meta,
        CoordinatorConfig::new(dir.path().join("store")).trace_enabled(false),
        Arc::new(RecordingExecutor::default()),
        resources,
        Arc::new(NoopPeer),
        Arc::clone(&sink),
        Arc::new(CmpEvaluator),
        FakeClock::new(),
    )
    .unwrap();

    coordinator
        .handle_command(CommandKind::Start { trace: true, input: json!({}) })
        .await
        .unwrap();
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn run_loop_drives_workflow_with_local_executor() {
    let dir = tempdir().unwrap();
    let def = linear_def(&["a", "b", "c"]);
    let resources = Arc::new(StaticResources::new());
    let meta = RunMeta::new(RunId::from_string("run-loop-00000000000"), def.id, def.version);
    resources.insert(def);
    let sink = Arc::new(BufferSink::new());

    let executor = Arc::new(LocalExecutor::new(SystemClock));
    let coordinator = Coordinator::new(
        meta,
        CoordinatorConfig::new(dir.path().join("store")),
        Arc::clone(&executor),
        Arc::clone(&resources),
        Arc::new(NoopPeer),
        Arc::clone(&sink),
        Arc::new(CmpEvaluator),
        SystemClock,
    )
    .unwrap();
    executor.connect(coordinator.command_sender());
    let handle = coordinator.handle();

    handle
        .send(CommandKind::Start { trace: true, input: json!({}) })
        .await
        .unwrap();

    tokio::time::timeout(std::time::Duration::from_secs(5), coordinator.run())
        .await
        .expect("run loop did not finish")
        .unwrap();

    assert_eq!(sink.count_named("dispatch.workflow.completed"), 1);
    // Store was destroyed at the end of the run.
    assert!(!dir.path().join("store").exists());
}
