// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alarm handling: trampoline drain and deadline enforcement.
//!
//! Every alarm firing runs on a fresh stack, which is the point: pending
//! coordinator-to-coordinator dispatches persisted by earlier commands
//! are converted into their effects here. Overdue fan-in and
//! sub-workflow deadlines apply their timeout policies.

use super::{PlanError, Planner};
use serde_json::json;
use wonder_core::decision::ContextWrite;
use wonder_core::{
    ContextPath, Decision, DispatchKind, ErrorObject, FailureKind, OnFailure, OnTimeout,
    TokenId, TokenStatus, TraceEvent,
};

impl<'a> Planner<'a> {
    pub(crate) fn plan_alarm(&mut self) -> Result<(), PlanError> {
        self.drain_pending_dispatches()?;
        if self.scratch.status.status.is_terminal() {
            return Ok(());
        }
        self.fire_fan_in_timeouts()?;
        self.fire_subworkflow_timeouts()?;
        self.maybe_complete_workflow()
    }

    fn drain_pending_dispatches(&mut self) -> Result<(), PlanError> {
        let pending = self.scratch.pending_dispatches.clone();
        for dispatch in pending {
            let effect = match dispatch.kind.clone() {
                DispatchKind::StartSubworkflow {
                    child_run_id,
                    definition_id,
                    version,
                    input,
                    parent_token_id,
                    on_failure,
                } => Decision::StartSubworkflow {
                    child_run_id,
                    definition_id,
                    version,
                    input,
                    parent_token_id,
                    on_failure,
                },
                DispatchKind::NotifyParent { parent_run_id, parent_token_id, outcome } => {
                    Decision::NotifyParent {
                        parent_run_id,
                        parent_token_id,
                        child_run_id: self.scratch.meta.run_id,
                        outcome,
                    }
                }
                DispatchKind::CancelSubworkflow { child_run_id } => {
                    Decision::CancelSubworkflow { child_run_id }
                }
            };
            self.push(effect)?;
            self.push(Decision::ClearDispatch { dispatch_id: dispatch.id })?;
            self.emit(
                TraceEvent::dispatch("trampoline.fired", self.now)
                    .field("dispatch_id", dispatch.id)
                    .field("kind", dispatch.kind.name()),
            );
        }
        Ok(())
    }

    fn fire_fan_in_timeouts(&mut self) -> Result<(), PlanError> {
        let overdue: Vec<_> = self
            .scratch
            .fan_ins
            .values()
            .filter(|rec| !rec.is_activated() && rec.deadline_at_ms.is_some_and(|d| d <= self.now))
            .cloned()
            .collect();

        for rec in overdue {
            if self.scratch.status.status.is_terminal() {
                return Ok(());
            }
            // The transition whose sync clause governs this rendezvous.
            let Some(trans) = self
                .def
                .transitions
                .iter()
                .find(|t| {
                    t.sync.is_some() && t.to_node.as_ref() == Some(&rec.fan_in_node_id)
                })
                .cloned()
            else {
                continue;
            };
            let Some(sync) = trans.sync.clone() else {
                continue;
            };

            self.emit(
                TraceEvent::decision("sync.timeout", self.now)
                    .node(rec.fan_in_node_id.clone())
                    .field("sibling_group", rec.sibling_group.clone())
                    .field("arrived", rec.arrived_count())
                    .field("total", rec.total),
            );

            match sync.on_timeout {
                OnTimeout::Fail => {
                    self.fail_workflow(
                        ErrorObject::from_kind(
                            FailureKind::FanInTimeout,
                            format!(
                                "fan-in at {} timed out with {}/{} branches",
                                rec.fan_in_node_id,
                                rec.arrived_count(),
                                rec.total
                            ),
                        ),
                        Some(rec.fan_in_node_id.clone()),
                    )?;
                }
                OnTimeout::ProceedWithAvailable => {
                    // Un-arrived siblings are cancelled; late results for
                    // them will be accepted and dropped.
                    let stragglers: Vec<TokenId> = self
                        .scratch
                        .tokens
                        .values()
                        .filter(|t| {
                            t.sibling_group.as_deref() == Some(rec.sibling_group.as_str())
                                && !t.is_terminal()
                                && !rec.arrived.contains(&t.id)
                        })
                        .map(|t| t.id)
                        .collect();
                    let orphaned_tables: Vec<TokenId> = stragglers
                        .iter()
                        .copied()
                        .filter(|id| self.scratch.branch_outputs.contains_key(id))
                        .collect();
                    for token_id in stragglers {
                        self.push(Decision::CancelToken { token_id })?;
                    }
                    if !orphaned_tables.is_empty() {
                        self.push(Decision::DropBranchTables {
                            token_ids: orphaned_tables,
                        })?;
                    }

                    let lineage = rec
                        .arrived
                        .last()
                        .copied()
                        .or_else(|| self.outer_lineage(&rec.sibling_group).map(|t| t.id))
                        .unwrap_or_else(|| TokenId::from_seq(0));
                    self.activate_fan_in(
                        &rec.sibling_group.clone(),
                        &rec.fan_in_node_id.clone(),
                        &trans,
                        &sync,
                        lineage,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn fire_subworkflow_timeouts(&mut self) -> Result<(), PlanError> {
        let overdue: Vec<_> = self
            .scratch
            .subworkflows
            .values()
            .filter(|r| r.deadline_at_ms.is_some_and(|d| d <= self.now))
            .cloned()
            .collect();

        for record in overdue {
            if self.scratch.status.status.is_terminal() {
                return Ok(());
            }
            let Some(token) = self.scratch.token(&record.parent_token_id).cloned() else {
                continue;
            };
            let error = ErrorObject::new(
                "subworkflow_timeout",
                format!("child run {} timed out", record.child_run_id),
            );
            self.emit(
                TraceEvent::decision("subworkflow.timeout", self.now)
                    .token(token.id)
                    .field("child_run_id", record.child_run_id.to_string()),
            );

            self.trampoline(DispatchKind::CancelSubworkflow {
                child_run_id: record.child_run_id,
            })?;
            self.push(Decision::ClearSubworkflowRecord {
                parent_token_id: record.parent_token_id,
            })?;

            match record.on_failure {
                OnFailure::Propagate => {
                    self.push(Decision::UpdateTokenStatus {
                        token_id: token.id,
                        status: TokenStatus::TimedOut,
                        error: Some(error.clone()),
                    })?;
                    self.fail_workflow(
                        ErrorObject::from_kind(
                            FailureKind::SubworkflowFailed,
                            format!("child run {} timed out", record.child_run_id),
                        ),
                        Some(token.node_id.clone()),
                    )?;
                }
                OnFailure::Catch => {
                    self.push(Decision::SetContextField {
                        write: ContextWrite {
                            path: ContextPath::parse("output.error").map_err(|source| {
                                PlanError::Path { path: "output.error".into(), source }
                            })?,
                            value: json!({ "code": error.code, "message": error.message }),
                        },
                    })?;
                    self.push(Decision::UpdateTokenStatus {
                        token_id: token.id,
                        status: TokenStatus::Completed,
                        error: None,
                    })?;
                    self.route_onward(&token)?;
                }
            }
        }
        Ok(())
    }
}
