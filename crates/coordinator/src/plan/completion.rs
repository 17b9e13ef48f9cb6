// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow completion and failure extraction, the trampoline primitive,
//! and alarm re-arming.

use super::{PlanError, Planner};
use serde_json::Value;
use wonder_core::{
    Decision, DispatchKind, ErrorObject, FailureKind, NodeId, PendingDispatch, RunOutcome,
    RunStatus, TraceEvent,
};

impl<'a> Planner<'a> {
    /// If no active tokens remain and the run is still running, extract
    /// the final output and complete the workflow.
    pub(crate) fn maybe_complete_workflow(&mut self) -> Result<(), PlanError> {
        if self.scratch.status.status != RunStatus::Running {
            return Ok(());
        }
        if self.scratch.active_tokens().next().is_some() {
            return Ok(());
        }

        let final_output = if self.def.output_mapping.is_empty() {
            self.scratch.context.output.clone()
        } else {
            let mut out = serde_json::Map::new();
            for (key, path) in self.def.output_mapping.iter() {
                let path = Self::parse_path(path)?;
                out.insert(
                    key.clone(),
                    self.scratch.context.get(&path).cloned().unwrap_or(Value::Null),
                );
            }
            Value::Object(out)
        };

        if let Err(message) = validate_schema(&self.def.output_schema, &final_output)? {
            return self.fail_workflow(
                ErrorObject::from_kind(FailureKind::InvalidOutput, message),
                None,
            );
        }

        self.emit(TraceEvent::decision("completion.extracted", self.now));
        self.push(Decision::SetWorkflowStatus {
            status: RunStatus::Completed,
            final_output: Some(final_output.clone()),
            error: None,
        })?;

        if let Some(parent) = self.scratch.meta.parent.clone() {
            self.trampoline(DispatchKind::NotifyParent {
                parent_run_id: parent.run_id,
                parent_token_id: parent.token_id,
                outcome: RunOutcome::Completed { output: final_output.clone() },
            })?;
        }
        self.push(Decision::UpdateResourcesStatus {
            status: RunStatus::Completed,
            output: Some(final_output),
            error: None,
        })?;
        self.emit(TraceEvent::dispatch("workflow.completed", self.now));
        Ok(())
    }

    /// Fail the run: cancel whatever is still active, cancel child runs,
    /// record the error, and notify parent and catalog.
    pub(crate) fn fail_workflow(
        &mut self,
        error: ErrorObject,
        node: Option<NodeId>,
    ) -> Result<(), PlanError> {
        if self.scratch.status.status.is_terminal() {
            return Ok(());
        }

        let active: Vec<_> = self.scratch.active_tokens().map(|t| t.id).collect();
        for token_id in active {
            self.push(Decision::CancelToken { token_id })?;
        }

        let children: Vec<_> = self
            .scratch
            .subworkflows
            .values()
            .map(|r| (r.parent_token_id, r.child_run_id))
            .collect();
        for (parent_token_id, child_run_id) in children {
            self.trampoline(DispatchKind::CancelSubworkflow { child_run_id })?;
            self.push(Decision::ClearSubworkflowRecord { parent_token_id })?;
        }

        self.push(Decision::SetWorkflowStatus {
            status: RunStatus::Failed,
            final_output: None,
            error: Some(error.clone()),
        })?;

        if let Some(parent) = self.scratch.meta.parent.clone() {
            self.trampoline(DispatchKind::NotifyParent {
                parent_run_id: parent.run_id,
                parent_token_id: parent.token_id,
                outcome: RunOutcome::Failed { error: error.clone() },
            })?;
        }
        self.push(Decision::UpdateResourcesStatus {
            status: RunStatus::Failed,
            output: None,
            error: Some(error.clone()),
        })?;

        let mut event = TraceEvent::dispatch("workflow.failed", self.now)
            .field("code", error.code.as_str())
            .field("message", error.message.as_str());
        if let Some(node) = node {
            event = event.node(node);
        }
        self.emit(event);
        Ok(())
    }

    /// Persist a coordinator-to-coordinator call. The immediate alarm
    /// armed at the end of the plan drains it on a fresh stack.
    pub(crate) fn trampoline(&mut self, kind: DispatchKind) -> Result<(), PlanError> {
        let dispatch =
            PendingDispatch { id: self.next_dispatch_id(), kind, created_at_ms: self.now };
        self.push(Decision::PersistDispatch { dispatch })
    }

    /// Arm the run's alarm to the earliest thing that needs waking:
    /// pending trampoline dispatches (immediately), fan-in deadlines,
    /// sub-workflow deadlines.
    pub(crate) fn rearm_alarm(&mut self) -> Result<(), PlanError> {
        let mut at: Option<u64> = None;
        let mut consider = |candidate: u64| {
            at = Some(at.map_or(candidate, |cur| cur.min(candidate)));
        };

        if !self.scratch.pending_dispatches.is_empty() {
            consider(self.now);
        }
        // Deadlines only matter while the run is still going; a terminal
        // run wakes up only to drain the trampoline.
        if !self.scratch.status.status.is_terminal() {
            for rec in self.scratch.fan_ins.values() {
                if !rec.is_activated() {
                    if let Some(deadline) = rec.deadline_at_ms {
                        consider(deadline);
                    }
                }
            }
            for record in self.scratch.subworkflows.values() {
                if let Some(deadline) = record.deadline_at_ms {
                    consider(deadline);
                }
            }
        }

        if let Some(at_ms) = at {
            self.push(Decision::ScheduleAlarm { at_ms })?;
        }
        Ok(())
    }
}

/// Validate a value against a JSON-Schema document. Empty or non-object
/// schemas accept everything. Compilation failures are planning errors
/// (the definition was admitted with a broken schema); validation
/// failures are business errors returned as `Ok(Err(message))`.
pub(crate) fn validate_schema(
    schema: &Value,
    value: &Value,
) -> Result<Result<(), String>, PlanError> {
    let Some(obj) = schema.as_object() else {
        return Ok(Ok(()));
    };
    if obj.is_empty() {
        return Ok(Ok(()));
    }
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| PlanError::Schema(e.to_string()))?;
    let result = match validator.iter_errors(value).next() {
        None => Ok(Ok(())),
        Some(err) => Ok(Err(format!("{} (at {})", err, err.instance_path))),
    };
    result
}
