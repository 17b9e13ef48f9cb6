// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pure planning layer.
//!
//! `plan(state, command, evaluator)` maps an immutable snapshot plus one
//! command to a flat, ordered decision list and its `decision.*` trace
//! events. No I/O happens here; every value a decision writes is resolved
//! against the snapshot. The planner maintains a scratch copy of the run
//! state and applies its own state decisions to it as it goes, so
//! cascading steps (routing through action-less nodes, fan-in activation
//! on the final arrival, completion detection) see the effects of earlier
//! decisions in the same plan, and planning agrees by construction with
//! what apply will do.
//!
//! Determinism: token ids and dispatch ids come from snapshot watermarks,
//! timestamps from the command envelope, and all iteration is over
//! insertion-ordered maps. For a fixed `(state, command)` pair the
//! decision list is byte-identical.

mod alarm;
mod cancel;
mod completion;
mod failure;
mod routing;
mod start;
mod subworkflow;
mod sync;

use crate::snapshot::WorkflowState;
use thiserror::Error;
use wonder_core::{
    Command, CommandKind, ConditionError, ConditionEvaluator, Decision, NodeId, PathError, Phase,
    TokenId, TraceEvent, TransitionId, WorkflowDef,
};
use wonder_store::{ApplyError, RunState};

/// Planning output: the decision list plus planning-layer trace events.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub decisions: Vec<Decision>,
    pub trace: Vec<TraceEvent>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// Count of `(state, effect)` decisions, for batch reporting.
    pub fn phase_counts(&self) -> (usize, usize) {
        let effects = self.decisions.iter().filter(|d| d.is_effect()).count();
        (self.decisions.len() - effects, effects)
    }
}

/// Programming errors during planning. Business failures never surface
/// here; they become `SetWorkflowStatus(failed)` decisions.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("scratch apply failed: {0}")]
    Apply(#[from] ApplyError),

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("unknown transition: {0}")]
    UnknownTransition(TransitionId),

    #[error("invalid mapping path {path}: {source}")]
    Path {
        path: String,
        #[source]
        source: PathError,
    },

    #[error("condition error: {0}")]
    Condition(#[from] ConditionError),

    #[error("schema compilation failed: {0}")]
    Schema(String),
}

/// Plan one command against a snapshot.
pub fn plan(
    state: &WorkflowState,
    command: &Command,
    eval: &dyn ConditionEvaluator,
) -> Result<Plan, PlanError> {
    let mut p = Planner::new(state, command.now_ms, eval);

    match &command.kind {
        CommandKind::Start { trace, input } => p.plan_start(*trace, input)?,
        CommandKind::TaskResult { token_id, output } => p.plan_task_result(*token_id, output)?,
        CommandKind::TaskError { token_id, error } => p.plan_task_error(*token_id, error)?,
        CommandKind::MarkExecuting { token_id } => p.plan_mark_executing(*token_id)?,
        CommandKind::SubworkflowResult { token_id, output } => {
            p.plan_subworkflow_result(*token_id, output)?
        }
        CommandKind::SubworkflowError { token_id, error } => {
            p.plan_subworkflow_error(*token_id, error)?
        }
        CommandKind::Alarm => p.plan_alarm()?,
        CommandKind::Cancel { reason } => p.plan_cancel(reason.as_deref())?,
    }

    p.rearm_alarm()?;
    Ok(p.finish())
}

/// Shared planning context: the snapshot, the evolving scratch state, and
/// the accumulated decisions and trace.
pub(crate) struct Planner<'a> {
    pub(crate) def: &'a WorkflowDef,
    pub(crate) boot: &'a wonder_core::RunMeta,
    pub(crate) eval: &'a dyn ConditionEvaluator,
    pub(crate) now: u64,
    pub(crate) scratch: RunState,
    decisions: Vec<Decision>,
    trace: Vec<TraceEvent>,
}

impl<'a> Planner<'a> {
    fn new(state: &'a WorkflowState, now: u64, eval: &'a dyn ConditionEvaluator) -> Self {
        Self {
            def: &state.def,
            boot: &state.boot,
            eval,
            now,
            scratch: state.run.clone(),
            decisions: Vec::new(),
            trace: Vec::new(),
        }
    }

    fn finish(self) -> Plan {
        Plan { decisions: self.decisions, trace: self.trace }
    }

    /// Record a decision. State decisions are applied to the scratch
    /// state immediately so later planning sees their effect.
    pub(crate) fn push(&mut self, decision: Decision) -> Result<(), PlanError> {
        if decision.phase() == Phase::State {
            self.scratch.apply(&decision, self.now)?;
        }
        self.decisions.push(decision);
        Ok(())
    }

    pub(crate) fn emit(&mut self, event: TraceEvent) {
        self.trace.push(event);
    }

    /// Next sequential token id (the scratch watermark advances as
    /// `CreateToken` decisions are applied).
    pub(crate) fn next_token_id(&self) -> TokenId {
        TokenId::from_seq(self.scratch.next_token_seq)
    }

    pub(crate) fn next_dispatch_id(&self) -> u64 {
        self.scratch.next_dispatch_id
    }

    /// Evaluate a transition condition against the scratch context view.
    /// Null or empty conditions always match.
    pub(crate) fn condition_matches(
        &self,
        condition: Option<&str>,
    ) -> Result<bool, ConditionError> {
        match condition {
            None => Ok(true),
            Some(expr) if expr.trim().is_empty() => Ok(true),
            Some(expr) => self.eval.eval(expr, &self.scratch.context.view()),
        }
    }

    pub(crate) fn parse_path(path: &str) -> Result<wonder_core::ContextPath, PlanError> {
        wonder_core::ContextPath::parse(path)
            .map_err(|source| PlanError::Path { path: path.to_string(), source })
    }
}

#[cfg(test)]
#[path = "../plan_tests/mod.rs"]
mod tests;
