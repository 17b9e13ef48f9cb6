// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run cancellation.
//!
//! Every non-terminal token is cancelled, child runs get cancel messages
//! over the trampoline, and the run closes as `cancelled`. Task results
//! that arrive afterwards hit terminal tokens and are dropped.

use super::{PlanError, Planner};
use wonder_core::{Decision, DispatchKind, RunOutcome, RunStatus, TraceEvent};

impl<'a> Planner<'a> {
    pub(crate) fn plan_cancel(&mut self, reason: Option<&str>) -> Result<(), PlanError> {
        if self.scratch.status.status.is_terminal() {
            self.emit(TraceEvent::dispatch("cancel.ignored", self.now));
            return Ok(());
        }

        let mut event = TraceEvent::decision("cancel.requested", self.now);
        if let Some(reason) = reason {
            event = event.field("reason", reason);
        }
        self.emit(event);

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
            status: RunStatus::Cancelled,
            final_output: None,
            error: None,
        })?;

        if let Some(parent) = self.scratch.meta.parent.clone() {
            self.trampoline(DispatchKind::NotifyParent {
                parent_run_id: parent.run_id,
                parent_token_id: parent.token_id,
                outcome: RunOutcome::Cancelled,
            })?;
        }
        self.push(Decision::UpdateResourcesStatus {
            status: RunStatus::Cancelled,
            output: None,
            error: None,
        })?;
        self.emit(TraceEvent::dispatch("workflow.cancelled", self.now));
        Ok(())
    }
}
