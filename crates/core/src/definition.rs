// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow definitions: the read-only graph fetched from the resources
//! catalog.
//!
//! A definition is an ordered set of nodes plus transitions indexed by
//! source node. The Coordinator never mutates definitions; it routes
//! tokens across them.

use crate::id::{DefId, NodeId, TransitionId};
use crate::merge::MergeStrategy;
use crate::run::OnFailure;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// What a node invokes when a token is dispatched to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionRef {
    /// A task executed by the external executor (LLM, HTTP, shell, mock…).
    Task {
        action_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// A child workflow run.
    Workflow {
        definition_id: DefId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<u32>,
        #[serde(default)]
        on_failure: OnFailure,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
}

/// A node in the workflow graph. A node without an action is a pure
/// routing node: tokens pass through it without dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionRef>,
    /// Task-input key → context path (`"question": "input.question"`).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub input_mapping: IndexMap<String, String>,
    /// Context path → path into the task output (`"state.answer": "$.text"`).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub output_mapping: IndexMap<String, String>,
}

/// How long to wait at a fan-in before the timeout policy applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaitFor {
    Any,
    All,
    MOfN { n: u32 },
}

impl WaitFor {
    /// Whether `arrived` arrivals out of `total` branches satisfy the wait.
    pub fn is_met(&self, arrived: u32, total: u32) -> bool {
        match self {
            WaitFor::Any => arrived >= 1,
            WaitFor::All => arrived >= total,
            WaitFor::MOfN { n } => arrived >= *n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnTimeout {
    #[default]
    Fail,
    ProceedWithAvailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnEarlyComplete {
    /// Cancel still-running siblings once the wait is met.
    Cancel,
    /// Let late siblings finish but drop their outputs.
    #[default]
    Abandon,
    /// Re-merge on each late arrival, up to `branch_total` merges.
    AllowLateMerge,
}

/// Merge specification for a fan-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeSpec {
    pub strategy: MergeStrategy,
    /// Context path the merged value is written to, e.g. `state.results`.
    pub target: String,
}

/// Synchronization clause on a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSpec {
    pub wait_for: WaitFor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub on_timeout: OnTimeout,
    #[serde(default)]
    pub on_early_complete: OnEarlyComplete,
    pub merge: MergeSpec,
}

/// Dynamic-spawn clause on a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpawnSpec {
    /// Fixed fan-out width.
    Count { count: u32 },
    /// One branch per element of the collection at `collection`; the
    /// element is bound into the branch's task input under `item_var`.
    ForEach { collection: String, item_var: String },
}

/// Loop clause on a transition pointing back to an ancestor node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopSpec {
    pub max_iterations: u32,
}

/// A typed edge between nodes. `to_node = None` is a terminal edge:
/// matching it ends the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub id: TransitionId,
    pub from_node: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_node: Option<NodeId>,
    /// Lower priority is evaluated first.
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn: Option<SpawnSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_config: Option<LoopSpec>,
}

/// A complete workflow definition at one version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
    pub id: DefId,
    pub version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default = "empty_schema")]
    pub input_schema: Value,
    #[serde(default = "empty_schema")]
    pub state_schema: Value,
    #[serde(default = "empty_schema")]
    pub output_schema: Value,
    pub initial_node: NodeId,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    /// Workflow-level output extraction: output key → context path.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub output_mapping: IndexMap<String, String>,
}

fn empty_schema() -> Value {
    serde_json::json!({})
}

#[derive(Debug, Error)]
#[error("invalid workflow definition {name}: {}", issues.join("; "))]
pub struct DefinitionError {
    pub name: String,
    pub issues: Vec<String>,
}

impl WorkflowDef {
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn transition(&self, id: &TransitionId) -> Option<&Transition> {
        self.transitions.iter().find(|t| &t.id == id)
    }

    /// Outgoing transitions of a node, sorted by `(priority, id)` so the
    /// evaluation order is stable.
    pub fn transitions_from(&self, node: &NodeId) -> Vec<&Transition> {
        let mut out: Vec<&Transition> =
            self.transitions.iter().filter(|t| &t.from_node == node).collect();
        out.sort_by(|a, b| {
            a.priority.cmp(&b.priority).then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        out
    }

    /// Outgoing transitions grouped into ascending priority tiers.
    pub fn tiers_from(&self, node: &NodeId) -> Vec<Vec<&Transition>> {
        let sorted = self.transitions_from(node);
        let mut tiers: Vec<Vec<&Transition>> = Vec::new();
        for t in sorted {
            match tiers.last_mut() {
                Some(tier) if tier[0].priority == t.priority => tier.push(t),
                _ => tiers.push(vec![t]),
            }
        }
        tiers
    }

    /// A node with no outgoing transitions ends the workflow when its last
    /// token completes.
    pub fn is_terminal_node(&self, node: &NodeId) -> bool {
        !self.transitions.iter().any(|t| &t.from_node == node)
    }

    /// Structural validation: referenced nodes exist, ids are unique,
    /// fan-out clauses are well-formed. Used by the CLI and at definition
    /// cache admission.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let mut issues = Vec::new();

        let mut seen_nodes = std::collections::HashSet::new();
        for node in &self.nodes {
            if !seen_nodes.insert(node.id.as_str().to_string()) {
                issues.push(format!("duplicate node id: {}", node.id));
            }
        }

        if self.node(&self.initial_node).is_none() {
            issues.push(format!("initial node not found: {}", self.initial_node));
        }

        let mut seen_transitions = std::collections::HashSet::new();
        for t in &self.transitions {
            if !seen_transitions.insert(t.id.as_str().to_string()) {
                issues.push(format!("duplicate transition id: {}", t.id));
            }
            if self.node(&t.from_node).is_none() {
                issues.push(format!("transition {} from unknown node: {}", t.id, t.from_node));
            }
            if let Some(to) = &t.to_node {
                if self.node(to).is_none() {
                    issues.push(format!("transition {} to unknown node: {}", t.id, to));
                }
            }
            if let Some(sync) = &t.sync {
                if t.to_node.is_none() {
                    issues.push(format!("transition {} has sync but no target node", t.id));
                }
                if crate::path::ContextPath::parse(&sync.merge.target).is_err() {
                    issues.push(format!(
                        "transition {} has invalid merge target: {}",
                        t.id, sync.merge.target
                    ));
                }
                if let WaitFor::MOfN { n } = sync.wait_for {
                    if n == 0 {
                        issues.push(format!("transition {} has m_of_n quorum of 0", t.id));
                    }
                }
            }
            if let Some(SpawnSpec::ForEach { collection, item_var }) = &t.spawn {
                if crate::path::ContextPath::parse(collection).is_err() {
                    issues.push(format!(
                        "transition {} has invalid foreach collection: {}",
                        t.id, collection
                    ));
                }
                if item_var.is_empty() {
                    issues.push(format!("transition {} has empty foreach item_var", t.id));
                }
            }
            if let Some(lc) = &t.loop_config {
                if lc.max_iterations == 0 {
                    issues.push(format!("transition {} has max_iterations of 0", t.id));
                }
            }
        }

        for node in &self.nodes {
            for (key, path) in node.input_mapping.iter() {
                if crate::path::ContextPath::parse(path).is_err() {
                    issues.push(format!(
                        "node {} input mapping {} has invalid path: {}",
                        node.id, key, path
                    ));
                }
            }
            for (path, _) in node.output_mapping.iter() {
                if crate::path::ContextPath::parse(path).is_err() {
                    issues.push(format!(
                        "node {} output mapping has invalid path: {}",
                        node.id, path
                    ));
                }
            }
        }

        for (_, path) in self.output_mapping.iter() {
            if crate::path::ContextPath::parse(path).is_err() {
                issues.push(format!("workflow output mapping has invalid path: {}", path));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(DefinitionError { name: self.name.clone(), issues })
        }
    }
}

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
