// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures: compact workflow-definition constructors.
//!
//! Only compiled for tests (or with the `test-support` feature) so other
//! crates' tests can build graphs without hand-writing every field.

use crate::definition::{
    ActionRef, MergeSpec, Node, OnEarlyComplete, OnTimeout, SpawnSpec, SyncSpec, Transition,
    WaitFor, WorkflowDef,
};
use crate::id::{DefId, NodeId, TransitionId};
use crate::merge::MergeStrategy;
use indexmap::IndexMap;

/// Node running a mock task action named after the node.
pub fn task_node(id: &str) -> Node {
    Node {
        id: NodeId::new(id),
        name: id.to_string(),
        action: Some(ActionRef::Task { action_id: format!("action.{id}"), timeout_ms: None }),
        input_mapping: IndexMap::new(),
        output_mapping: IndexMap::new(),
    }
}

/// Node without an action: tokens route straight through.
pub fn routing_node(id: &str) -> Node {
    Node {
        id: NodeId::new(id),
        name: id.to_string(),
        action: None,
        input_mapping: IndexMap::new(),
        output_mapping: IndexMap::new(),
    }
}

/// Plain transition, priority 0, no condition.
pub fn transition(id: &str, from: &str, to: Option<&str>) -> Transition {
    Transition {
        id: TransitionId::new(id),
        from_node: NodeId::new(from),
        to_node: to.map(NodeId::new),
        priority: 0,
        condition: None,
        sync: None,
        spawn: None,
        loop_config: None,
    }
}

/// Synchronization clause with an `append` merge into `state.<target>`.
pub fn sync_all_append(target: &str) -> SyncSpec {
    SyncSpec {
        wait_for: WaitFor::All,
        timeout_ms: None,
        on_timeout: OnTimeout::default(),
        on_early_complete: OnEarlyComplete::default(),
        merge: MergeSpec {
            strategy: MergeStrategy::Append,
            target: format!("state.{target}"),
        },
    }
}

/// Fixed-width spawn clause.
pub fn spawn_count(n: u32) -> SpawnSpec {
    SpawnSpec::Count { count: n }
}

/// Definition with explicit parts and a fixed id (`def-<name>`), version 1.
pub fn workflow_def(
    name: &str,
    initial: &str,
    nodes: Vec<Node>,
    transitions: Vec<Transition>,
) -> WorkflowDef {
    WorkflowDef {
        id: DefId::from_string(format!("def-{name}")),
        version: 1,
        name: name.to_string(),
        input_schema: serde_json::json!({}),
        state_schema: serde_json::json!({}),
        output_schema: serde_json::json!({}),
        initial_node: NodeId::new(initial),
        nodes,
        transitions,
        output_mapping: IndexMap::new(),
    }
}

/// Linear chain of task nodes: `a -> b -> c`, last node terminal.
/// Transition ids are `to_<target>`.
pub fn linear_def(nodes: &[&str]) -> WorkflowDef {
    let defs: Vec<Node> = nodes.iter().map(|n| task_node(n)).collect();
    let transitions: Vec<Transition> = nodes
        .windows(2)
        .map(|w| transition(&format!("to_{}", w[1]), w[0], Some(w[1])))
        .collect();
    workflow_def("linear", nodes[0], defs, transitions)
}

/// Fan-out/fan-in definition: `src` spawns `n` branches onto `branch`,
/// rendezvous at `branch` with an `append` merge into `state.<target>`,
/// continuing to an optional `next` node.
pub fn fan_out_def(n: u32, target: &str, next: Option<&str>) -> WorkflowDef {
    let mut nodes = vec![task_node("src"), task_node("branch")];
    let mut transitions = vec![Transition {
        spawn: Some(spawn_count(n)),
        sync: Some(sync_all_append(target)),
        ..transition("split", "src", Some("branch"))
    }];
    if let Some(next) = next {
        nodes.push(task_node(next));
        transitions.push(transition("continue", "branch", Some(next)));
    }
    workflow_def("fan", "src", nodes, transitions)
}
