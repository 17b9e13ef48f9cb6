// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace scenario tests: full Coordinator instances with in-memory
//! adapters, driven command by command.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use wonder_coordinator::adapters::{
    AdapterError, BufferSink, ExecutorAdapter, PeerAdapter, StartSubworkflow, StaticResources,
    TaskDispatch,
};
use wonder_coordinator::{Coordinator, CoordinatorConfig};
use wonder_core::test_support::{
    fan_out_def, linear_def, task_node, transition, workflow_def,
};
use wonder_core::{
    ActionRef, CmpEvaluator, CommandKind, DefId, ErrorObject, FakeClock, Node, OnEarlyComplete,
    OnFailure, OnTimeout, RunId, RunMeta, RunStatus, TokenId, TokenStatus, WaitFor, WorkflowDef,
};

/// Records dispatches so scenarios can complete tasks by hand.
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

/// Records coordinator-to-coordinator traffic.
#[derive(Default)]
struct RecordingPeer {
    started: Mutex<Vec<StartSubworkflow>>,
    notified: Mutex<Vec<(RunId, TokenId)>>,
    cancelled: Mutex<Vec<RunId>>,
}

#[async_trait]
impl PeerAdapter for RecordingPeer {
    async fn start_subworkflow(&self, req: StartSubworkflow) -> Result<(), AdapterError> {
        self.started.lock().push(req);
        Ok(())
    }

    async fn notify_parent(
        &self,
        parent_run_id: &RunId,
        parent_token_id: TokenId,
        _child_run_id: &RunId,
        _outcome: wonder_core::RunOutcome,
    ) -> Result<(), AdapterError> {
        self.notified.lock().push((*parent_run_id, parent_token_id));
        Ok(())
    }

    async fn cancel_subworkflow(&self, child_run_id: &RunId) -> Result<(), AdapterError> {
        self.cancelled.lock().push(*child_run_id);
        Ok(())
    }
}

struct Scenario {
    coordinator:
        Coordinator<RecordingExecutor, StaticResources, RecordingPeer, BufferSink, FakeClock>,
    executor: Arc<RecordingExecutor>,
    peer: Arc<RecordingPeer>,
    sink: Arc<BufferSink>,
    clock: FakeClock,
    _dir: tempfile::TempDir,
}

impl Scenario {
    fn new(def: WorkflowDef) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let resources = Arc::new(StaticResources::new());
        let meta =
            RunMeta::new(RunId::from_string("run-spec-scenario-00"), def.id, def.version);
        resources.insert(def);
        let executor = Arc::new(RecordingExecutor::default());
        let peer = Arc::new(RecordingPeer::default());
        let sink = Arc::new(BufferSink::new());
        let clock = FakeClock::new();
        let coordinator = Coordinator::new(
            meta,
            CoordinatorConfig::new(dir.path().join("store")),
            Arc::clone(&executor),
            resources,
            Arc::clone(&peer),
            Arc::clone(&sink),
            Arc::new(CmpEvaluator),
            clock.clone(),
        )
        .unwrap();
        Self { coordinator, executor, peer, sink, clock, _dir: dir }
    }

    async fn send(&mut self, kind: CommandKind) {
        self.coordinator.handle_command(kind).await.unwrap();
    }

    async fn start(&mut self) {
        self.send(CommandKind::Start { trace: true, input: json!({}) }).await;
    }

    /// Complete a token with the given output (by token sequence).
    async fn complete(&mut self, seq: u64, output: Value) {
        self.send(CommandKind::TaskResult { token_id: TokenId::from_seq(seq), output })
            .await;
    }

    fn status(&self) -> RunStatus {
        self.coordinator.state().status.status
    }

    fn token_status(&self, seq: u64) -> TokenStatus {
        self.coordinator.state().tokens[&TokenId::from_seq(seq)].status
    }

    fn state_field(&self, key: &str) -> Value {
        self.coordinator.state().context.state[key].clone()
    }

    fn branch_index_of(&self, seq: u64) -> u64 {
        u64::from(self.coordinator.state().tokens[&TokenId::from_seq(seq)].branch_index)
    }
}

/// Scenario 1: linear three-node workflow.
#[tokio::test]
async fn linear_three_node_workflow() {
    let mut s = Scenario::new(linear_def(&["a", "b", "c"]));
    s.start().await;

    // The lineage visits a, b, c in order.
    for expected_node in ["a", "b", "c"] {
        let task = s.executor.dispatched.lock().last().unwrap().clone();
        assert_eq!(task.node_id, expected_node);
        let seq: u64 = task.token_id.as_str().strip_prefix("tok-").unwrap().parse().unwrap();
        s.complete(seq, json!({"node": expected_node})).await;
    }

    assert_eq!(s.status(), RunStatus::Completed);
    assert_eq!(s.sink.count_named("dispatch.workflow.completed"), 1);
    assert_eq!(s.sink.count_named("decision.routing.node_completed"), 3);
    // Every token kept the root lineage path.
    assert!(s.coordinator.state().tokens.values().all(|t| t.path_id == "0"));
}

/// Scenario 2: fan-out of five with an `all` wait and an append merge.
#[tokio::test]
async fn fan_out_append_merge() {
    let mut def = fan_out_def(5, "results", Some("after"));
    def.nodes[1].output_mapping.insert("state.results".into(), "$".into());
    let mut s = Scenario::new(def);
    s.start().await;
    s.complete(0, json!({})).await;

    // Five branch tables exist while the branches run.
    assert_eq!(s.coordinator.state().branch_outputs.len(), 5);

    for seq in 1..=5u64 {
        let index = s.branch_index_of(seq);
        s.complete(seq, json!({"x": index})).await;
    }

    assert_eq!(
        s.state_field("results"),
        json!([{"x": 0}, {"x": 1}, {"x": 2}, {"x": 3}, {"x": 4}])
    );
    // ... and are dropped after the merge.
    assert!(s.coordinator.state().branch_outputs.is_empty());
    assert_eq!(s.sink.count_named("dispatch.sync.fan_in_activated"), 1);

    // One merged continuation token at the fan-in node, which went on
    // to "after".
    let merged: Vec<_> = s
        .coordinator
        .state()
        .tokens
        .values()
        .filter(|t| t.path_id == "0.split.fanin" && t.node_id == "branch")
        .collect();
    assert_eq!(merged.len(), 1);
    assert!(s.coordinator.state().tokens.values().any(|t| t.node_id == "after"));
}

/// Scenario 3: m-of-n quorum with abandoned late arrivals.
#[tokio::test]
async fn quorum_with_abandon() {
    let mut def = fan_out_def(5, "results", Some("after"));
    def.nodes[1].output_mapping.insert("state.results".into(), "$".into());
    {
        let sync = def.transitions[0].sync.as_mut().unwrap();
        sync.wait_for = WaitFor::MOfN { n: 3 };
        sync.on_early_complete = OnEarlyComplete::Abandon;
    }
    let mut s = Scenario::new(def);
    s.start().await;
    s.complete(0, json!({})).await;

    // Branch completions in index order [2, 0, 4, 1, 3]; tokens are
    // index + 1.
    for index in [2u64, 0, 4] {
        s.complete(index + 1, json!({"x": index})).await;
    }
    // The merge fired on the third arrival with exactly those branches,
    // merged in branch-index order.
    assert_eq!(s.sink.count_named("dispatch.sync.fan_in_activated"), 1);
    assert_eq!(s.state_field("results"), json!([{"x": 0}, {"x": 2}, {"x": 4}]));

    // Late branches complete; their outputs are dropped.
    for index in [1u64, 3] {
        s.complete(index + 1, json!({"x": index})).await;
        assert_eq!(s.token_status(index + 1), TokenStatus::Completed);
    }
    assert_eq!(s.state_field("results"), json!([{"x": 0}, {"x": 2}, {"x": 4}]));
}

/// Scenario 4: conditional routing takes exactly one edge.
#[tokio::test]
async fn conditional_routing() {
    let mut def = workflow_def(
        "conditional",
        "a",
        vec![task_node("a"), task_node("b"), task_node("c"), task_node("d")],
        vec![
            wonder_core::Transition {
                priority: 1,
                condition: Some("state.approved == true".into()),
                ..transition("to_b", "a", Some("b"))
            },
            wonder_core::Transition {
                priority: 2,
                condition: Some("state.approved == false".into()),
                ..transition("to_c", "a", Some("c"))
            },
            wonder_core::Transition { priority: 3, ..transition("to_d", "a", Some("d")) },
        ],
    );
    def.nodes[0].output_mapping.insert("state.approved".into(), "$.approved".into());
    let mut s = Scenario::new(def);
    s.start().await;

    s.complete(0, json!({"approved": true})).await;

    let nodes: Vec<String> = s
        .executor
        .dispatched
        .lock()
        .iter()
        .map(|t| t.node_id.to_string())
        .collect();
    assert_eq!(nodes, ["a", "b"]);
    assert!(s.coordinator.state().tokens.values().all(|t| t.node_id != "c" && t.node_id != "d"));
}

/// Scenario 5: sub-workflow failure with `catch`.
#[tokio::test]
async fn subworkflow_with_catch() {
    let child_node = Node {
        id: "p".into(),
        name: "p".into(),
        action: Some(ActionRef::Workflow {
            definition_id: DefId::from_string("def-child"),
            version: Some(1),
            on_failure: OnFailure::Catch,
            timeout_ms: None,
        }),
        input_mapping: Default::default(),
        output_mapping: Default::default(),
    };
    let def = workflow_def(
        "parent",
        "p",
        vec![child_node, task_node("next")],
        vec![transition("to_next", "p", Some("next"))],
    );
    let mut s = Scenario::new(def);
    s.start().await;
    assert_eq!(s.token_status(0), TokenStatus::WaitingForSubworkflow);

    // The start is trampolined: persisted, then fired on the alarm.
    assert!(s.peer.started.lock().is_empty());
    s.send(CommandKind::Alarm).await;
    assert_eq!(s.peer.started.lock().len(), 1);

    s.send(CommandKind::SubworkflowError {
        token_id: TokenId::from_seq(0),
        error: ErrorObject::new("boom", "child failed"),
    })
    .await;

    // The parent token completed with the error caught into context
    // output, and the workflow continued downstream.
    assert_eq!(s.token_status(0), TokenStatus::Completed);
    assert_eq!(s.status(), RunStatus::Running);
    assert_eq!(
        s.coordinator.state().context.output["error"],
        json!({"code": "boom", "message": "child failed"})
    );
    assert_eq!(s.executor.dispatched.lock().last().unwrap().node_id, "next");
}

/// Scenario 6: fan-in timeout with `proceed_with_available`.
#[tokio::test]
async fn fan_in_timeout_proceeds_with_available() {
    let mut def = fan_out_def(3, "results", Some("after"));
    def.nodes[1].output_mapping.insert("state.results".into(), "$".into());
    {
        let sync = def.transitions[0].sync.as_mut().unwrap();
        sync.timeout_ms = Some(1_000);
        sync.on_timeout = OnTimeout::ProceedWithAvailable;
    }
    let mut s = Scenario::new(def);
    s.start().await;
    s.complete(0, json!({})).await;

    // Two of three branches complete; the timer fires with the third
    // still dispatched.
    s.complete(1, json!({"x": 0})).await;
    s.complete(2, json!({"x": 1})).await;
    s.clock.advance(std::time::Duration::from_millis(5_000));
    s.send(CommandKind::Alarm).await;

    // The merge proceeded with the two arrived branches and the
    // straggler was cancelled.
    assert_eq!(s.state_field("results"), json!([{"x": 0}, {"x": 1}]));
    assert_eq!(s.token_status(3), TokenStatus::Cancelled);

    // Its late result is accepted and dropped.
    s.complete(3, json!({"x": 2})).await;
    assert_eq!(s.token_status(3), TokenStatus::Cancelled);
    assert_eq!(s.state_field("results"), json!([{"x": 0}, {"x": 1}]));
    assert!(s.sink.count_named("dispatch.result.dropped") >= 1);
}

/// Completion notifies a waiting parent exactly once, via the
/// trampoline.
#[tokio::test]
async fn child_run_notifies_parent() {
    let def = workflow_def("leaf", "a", vec![task_node("a")], vec![]);
    let mut s = Scenario::new(def);
    s.coordinator = {
        // Rebuild with a parent reference.
        let dir = tempfile::tempdir().unwrap();
        let resources = Arc::new(StaticResources::new());
        let def = workflow_def("leaf", "a", vec![task_node("a")], vec![]);
        let mut meta =
            RunMeta::new(RunId::from_string("run-spec-child-00000"), def.id, def.version);
        meta.parent = Some(wonder_core::ParentRef {
            run_id: RunId::from_string("run-spec-parent-0000"),
            token_id: TokenId::from_seq(9),
        });
        resources.insert(def);
        let c = Coordinator::new(
            meta,
            CoordinatorConfig::new(dir.path().join("store")),
            Arc::clone(&s.executor),
            resources,
            Arc::clone(&s.peer),
            Arc::clone(&s.sink),
            Arc::new(CmpEvaluator),
            s.clock.clone(),
        )
        .unwrap();
        s._dir = dir;
        c
    };

    s.start().await;
    s.complete(0, json!({})).await;
    assert_eq!(s.status(), RunStatus::Completed);
    assert!(s.peer.notified.lock().is_empty());

    s.send(CommandKind::Alarm).await;
    let notified = s.peer.notified.lock().clone();
    assert_eq!(
        notified,
        vec![(RunId::from_string("run-spec-parent-0000"), TokenId::from_seq(9))]
    );
    assert!(s.coordinator.is_finished());
}

/// Cancellation: every active token ends cancelled and results after
/// cancel are dropped.
#[tokio::test]
async fn cancel_run_midflight() {
    let mut def = fan_out_def(3, "results", None);
    def.nodes[1].output_mapping.insert("state.results".into(), "$".into());
    let mut s = Scenario::new(def);
    s.start().await;
    s.complete(0, json!({})).await;

    s.send(CommandKind::Cancel { reason: Some("operator".into()) }).await;
    assert_eq!(s.status(), RunStatus::Cancelled);
    for seq in 1..=3u64 {
        assert_eq!(s.token_status(seq), TokenStatus::Cancelled);
    }

    s.complete(2, json!({"x": 1})).await;
    assert_eq!(s.token_status(2), TokenStatus::Cancelled);
    assert!(s.state_field("results").is_null());
}
