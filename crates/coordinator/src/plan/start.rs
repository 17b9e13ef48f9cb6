// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run start: input validation, initialization, the root token.

use super::completion::validate_schema;
use super::{PlanError, Planner};
use serde_json::Value;
use wonder_core::{
    Decision, ErrorObject, FailureKind, RunStatus, Token, TraceEvent,
};

impl<'a> Planner<'a> {
    pub(crate) fn plan_start(&mut self, trace: bool, input: &Value) -> Result<(), PlanError> {
        // A second start is ignored; the run already exists.
        if !self.scratch.tokens.is_empty() || self.scratch.status.status.is_terminal() {
            self.emit(TraceEvent::dispatch("start.ignored", self.now));
            return Ok(());
        }

        self.push(Decision::InitializeWorkflow {
            run_id: self.boot.run_id,
            definition_id: self.boot.definition_id,
            version: self.def.version,
            input: input.clone(),
            parent: self.boot.parent.clone(),
            trace_enabled: trace,
        })?;
        self.emit(
            TraceEvent::dispatch("workflow.started", self.now)
                .field("definition_id", self.boot.definition_id.to_string())
                .field("version", self.def.version),
        );

        if let Err(message) = validate_schema(&self.def.input_schema, input)? {
            return self.fail_workflow(
                ErrorObject::from_kind(FailureKind::InvalidInput, message),
                None,
            );
        }

        self.push(Decision::UpdateResourcesStatus {
            status: RunStatus::Running,
            output: None,
            error: None,
        })?;

        let root = Token::root(self.next_token_id(), self.def.initial_node.clone(), self.now);
        self.push(Decision::CreateToken { token: root.clone() })?;
        self.push(Decision::RecordIteration {
            node_id: root.node_id.clone(),
            path_id: root.path_id.clone(),
        })?;
        self.dispatch_or_route(&root)?;
        self.maybe_complete_workflow()
    }
}
