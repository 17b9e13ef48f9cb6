// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task failure: record the error, try failure transitions, otherwise
//! fail the run.
//!
//! The executor retries transient infrastructure errors itself; a
//! `TaskError` command is a final business outcome. Failure routing only
//! considers transitions that carry a condition; unconditioned edges
//! are success-path defaults.

use super::{PlanError, Planner};
use serde_json::json;
use wonder_core::decision::ContextWrite;
use wonder_core::{ContextPath, Decision, ErrorObject, TokenId, TokenStatus, TraceEvent};

impl<'a> Planner<'a> {
    pub(crate) fn plan_task_error(
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
        if token.is_terminal() || self.scratch.status.status.is_terminal() {
            self.emit(
                TraceEvent::dispatch("result.dropped", self.now)
                    .token(token_id)
                    .field("status", token.status.to_string()),
            );
            return Ok(());
        }

        self.record_error_and_route(&token, error)?;
        self.maybe_complete_workflow()
    }

    /// Shared failure path for task errors and propagated sub-workflow
    /// errors: error into context, token failed, failure transitions or
    /// workflow failure.
    pub(crate) fn record_error_and_route(
        &mut self,
        token: &wonder_core::Token,
        error: &ErrorObject,
    ) -> Result<(), PlanError> {
        self.push(Decision::SetContextField {
            write: ContextWrite {
                path: ContextPath::parse("output.error")
                    .map_err(|source| PlanError::Path { path: "output.error".into(), source })?,
                value: json!({ "code": error.code, "message": error.message }),
            },
        })?;
        self.push(Decision::UpdateTokenStatus {
            token_id: token.id,
            status: TokenStatus::Failed,
            error: Some(error.clone()),
        })?;
        self.emit(
            TraceEvent::decision("routing.node_failed", self.now)
                .token(token.id)
                .node(token.node_id.clone())
                .field("code", error.code.as_str()),
        );

        let winners = self.winning_transitions(&token.node_id, true)?;
        if winners.is_empty() {
            return self.fail_workflow(error.clone(), Some(token.node_id.clone()));
        }

        for transition_id in winners {
            let t = self
                .def
                .transition(&transition_id)
                .ok_or(PlanError::UnknownTransition(transition_id))?
                .clone();
            self.emit(
                TraceEvent::decision("routing.transition_matched", self.now)
                    .token(token.id)
                    .node(token.node_id.clone())
                    .field("transition_id", t.id.as_str())
                    .field("on_error", true),
            );
            self.fire_transition(token, &t)?;
            if self.scratch.status.status.is_terminal() {
                return Ok(());
            }
        }
        Ok(())
    }
}
