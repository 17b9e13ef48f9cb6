// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sub-workflow invocation and child-run outcomes.
//!
//! Starting a child is always a trampoline dispatch: the parent never
//! calls into another coordinator inline. Child failure honors the
//! node's `on_failure`: `propagate` fails the parent token, `catch`
//! completes it with `{error: {code, message}}` written into context
//! output for downstream routing.

use super::{PlanError, Planner};
use serde_json::json;
use wonder_core::decision::ContextWrite;
use wonder_core::{
    ContextPath, Decision, DefId, DispatchKind, ErrorObject, Node, OnFailure, RunId, Token,
    TokenId, TokenStatus, TraceEvent,
};

impl<'a> Planner<'a> {
    pub(crate) fn plan_subworkflow_invocation(
        &mut self,
        token: &Token,
        node: &Node,
        definition_id: DefId,
        version: Option<u32>,
        on_failure: OnFailure,
        timeout_ms: Option<u64>,
    ) -> Result<(), PlanError> {
        let child_run_id = RunId::derive_child(&self.scratch.meta.run_id, token.id);
        let input = self.resolve_input(node, token)?;
        let record = wonder_core::SubworkflowRecord {
            parent_token_id: token.id,
            child_run_id,
            definition_id,
            version,
            output_mapping: node.output_mapping.clone(),
            on_failure,
            deadline_at_ms: timeout_ms.map(|ms| self.now + ms),
            created_at_ms: self.now,
        };
        self.push(Decision::InitSubworkflowRecord { record })?;
        self.push(Decision::MarkWaiting {
            token_id: token.id,
            status: TokenStatus::WaitingForSubworkflow,
        })?;
        self.trampoline(DispatchKind::StartSubworkflow {
            child_run_id,
            definition_id,
            version,
            input,
            parent_token_id: token.id,
            on_failure,
        })?;
        self.emit(
            TraceEvent::decision("subworkflow.invoked", self.now)
                .token(token.id)
                .node(token.node_id.clone())
                .field("child_run_id", child_run_id.to_string())
                .field("definition_id", definition_id.to_string()),
        );
        Ok(())
    }

    pub(crate) fn plan_subworkflow_result(
        &mut self,
        token_id: TokenId,
        output: &serde_json::Value,
    ) -> Result<(), PlanError> {
        let Some(token) = self.scratch.token(&token_id).cloned() else {
            self.emit(
                TraceEvent::dispatch("result.unknown_token", self.now).token(token_id),
            );
            return Ok(());
        };
        if token.status != TokenStatus::WaitingForSubworkflow
            || self.scratch.status.status.is_terminal()
        {
            self.emit(
                TraceEvent::dispatch("result.dropped", self.now)
                    .token(token_id)
                    .field("status", token.status.to_string()),
            );
            return Ok(());
        }

        self.push(Decision::ClearSubworkflowRecord { parent_token_id: token_id })?;
        self.emit(
            TraceEvent::decision("subworkflow.completed", self.now)
                .token(token_id)
                .node(token.node_id.clone()),
        );
        // The node's output mapping reads from the child's final output,
        // exactly as a task result would.
        self.token_completed(&token, output)?;
        self.maybe_complete_workflow()
    }

    pub(crate) fn plan_subworkflow_error(
        &mut self,
        token_id: TokenId,
        error: &ErrorObject,
    ) -> Result<(), PlanError> {
        let Some(token) = self.scratch.token(&token_id).cloned() else {
            self.emit(
                TraceEvent::dispatch("result.unknown_token", self.now).token(token_id),
            );
            return Ok(());
        };
        if token.status != TokenStatus::WaitingForSubworkflow
            || self.scratch.status.status.is_terminal()
        {
            self.emit(
                TraceEvent::dispatch("result.dropped", self.now)
                    .token(token_id)
                    .field("status", token.status.to_string()),
            );
            return Ok(());
        }

        let Some(record) = self.scratch.subworkflow(&token_id).cloned() else {
            self.emit(
                TraceEvent::dispatch("result.dropped", self.now)
                    .token(token_id)
                    .field("reason", "no subworkflow record"),
            );
            return Ok(());
        };
        self.push(Decision::ClearSubworkflowRecord { parent_token_id: token_id })?;

        match record.on_failure {
            OnFailure::Propagate => {
                self.emit(
                    TraceEvent::decision("subworkflow.failed", self.now)
                        .token(token_id)
                        .field("code", error.code.as_str())
                        .field("on_failure", "propagate"),
                );
                self.record_error_and_route(&token, error)?;
            }
            OnFailure::Catch => {
                self.emit(
                    TraceEvent::decision("subworkflow.caught", self.now)
                        .token(token_id)
                        .field("code", error.code.as_str()),
                );
                self.push(Decision::SetContextField {
                    write: ContextWrite {
                        path: ContextPath::parse("output.error").map_err(|source| {
                            PlanError::Path { path: "output.error".into(), source }
                        })?,
                        value: json!({ "code": error.code, "message": error.message }),
                    },
                })?;
                self.push(Decision::UpdateTokenStatus {
                    token_id,
                    status: TokenStatus::Completed,
                    error: None,
                })?;
                self.route_onward(&token)?;
            }
        }
        self.maybe_complete_workflow()
    }
}
