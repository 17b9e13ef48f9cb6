// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planner tests.
//!
//! The harness drives the pure planner command by command, applying each
//! plan's state decisions to a local `RunState` exactly as the store
//! transaction would: a miniature of the dispatcher loop without I/O.

mod cancel;
mod determinism;
mod fan_out;
mod linear;
mod quorum;
mod routing;
mod subworkflow;
mod timeout;

use super::*;
use crate::snapshot::WorkflowState;
use serde_json::{json, Value};
use std::sync::Arc;
use wonder_core::{CmpEvaluator, Decision, ErrorObject, RunId, RunMeta, RunStatus, TokenStatus};

pub(super) struct Ctx {
    state: WorkflowState,
    now: u64,
}

impl Ctx {
    fn new(def: WorkflowDef) -> Self {
        let boot = RunMeta {
            run_id: RunId::from_string("run-plan-test-0000000"),
            definition_id: def.id,
            version: def.version,
            parent: None,
            trace_enabled: true,
        };
        Self {
            state: WorkflowState::from_parts(RunState::default(), Arc::new(def), boot),
            now: 1_000,
        }
    }

    fn with_parent(mut self, parent_run: &str, parent_token: u64) -> Self {
        self.state.boot.parent = Some(wonder_core::ParentRef {
            run_id: RunId::from_string(parent_run),
            token_id: TokenId::from_seq(parent_token),
        });
        self
    }

    /// Plan one command and fold its state decisions into the run state,
    /// exactly as the store transaction would.
    fn send(&mut self, kind: CommandKind) -> Plan {
        let command = Command::new(kind, self.now);
        let plan = plan(&self.state, &command, &CmpEvaluator).expect("planning failed");
        for decision in &plan.decisions {
            if decision.phase() == Phase::State {
                self.state.run.apply(decision, self.now).expect("apply failed");
            }
        }
        self.now += 10;
        plan
    }

    fn start(&mut self) -> Plan {
        self.send(CommandKind::Start { trace: true, input: json!({}) })
    }

    fn start_with(&mut self, input: Value) -> Plan {
        self.send(CommandKind::Start { trace: true, input })
    }

    fn run(&self) -> &RunState {
        &self.state.run
    }

    fn status(&self) -> RunStatus {
        self.state.run.status.status
    }

    fn token_status(&self, seq: u64) -> TokenStatus {
        self.state.run.tokens[&TokenId::from_seq(seq)].status
    }

    /// Complete a dispatched/executing token with the given task output.
    fn complete(&mut self, seq: u64, output: Value) -> Plan {
        self.send(CommandKind::TaskResult { token_id: TokenId::from_seq(seq), output })
    }

    fn fail_task(&mut self, seq: u64, code: &str) -> Plan {
        self.send(CommandKind::TaskError {
            token_id: TokenId::from_seq(seq),
            error: ErrorObject::new(code, format!("task failed with {code}")),
        })
    }
}

/// Token ids of `DispatchToken` effects in a plan, in planned order.
pub(super) fn dispatched(plan: &Plan) -> Vec<TokenId> {
    plan.decisions
        .iter()
        .filter_map(|d| match d {
            Decision::DispatchToken { token_id, .. } => Some(*token_id),
            _ => None,
        })
        .collect()
}

/// Names of decisions in a plan, for shape assertions.
pub(super) fn decision_names(plan: &Plan) -> Vec<&'static str> {
    plan.decisions.iter().map(|d| d.name()).collect()
}

pub(super) fn trace_names(plan: &Plan) -> Vec<String> {
    plan.trace.iter().map(|e| e.name.clone()).collect()
}

pub(super) fn seq(n: u64) -> TokenId {
    TokenId::from_seq(n)
}

/// Minimal parent definition whose single node invokes a child workflow.
pub(super) fn subworkflow_fixture() -> WorkflowDef {
    use wonder_core::test_support::workflow_def;
    let node = wonder_core::Node {
        id: "p".into(),
        name: "p".into(),
        action: Some(wonder_core::ActionRef::Workflow {
            definition_id: wonder_core::DefId::from_string("def-child"),
            version: Some(1),
            on_failure: wonder_core::OnFailure::Propagate,
            timeout_ms: None,
        }),
        input_mapping: indexmap::IndexMap::new(),
        output_mapping: indexmap::IndexMap::new(),
    };
    workflow_def("invoker", "p", vec![node], vec![])
}
