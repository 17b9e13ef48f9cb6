// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commands: the external inputs a Coordinator processes.
//!
//! Commands for one run are strictly serialized; each is stamped with
//! `now_ms` when it enters the queue so planning stays a pure function of
//! `(state, command)`.

use crate::error::ErrorObject;
use crate::id::TokenId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandKind {
    /// Begin the run.
    Start {
        #[serde(default)]
        trace: bool,
        input: Value,
    },

    /// The executor finished a task successfully.
    TaskResult { token_id: TokenId, output: Value },

    /// The executor gave up on a task.
    TaskError { token_id: TokenId, error: ErrorObject },

    /// A worker picked the task up.
    MarkExecuting { token_id: TokenId },

    /// A child run completed.
    SubworkflowResult { token_id: TokenId, output: Value },

    /// A child run failed.
    SubworkflowError { token_id: TokenId, error: ErrorObject },

    /// Scheduled wakeup: drains pending dispatches and fires overdue
    /// deadlines.
    Alarm,

    /// Cancel the run.
    Cancel {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl CommandKind {
    /// Command name for trace and log spans.
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Start { .. } => "start",
            CommandKind::TaskResult { .. } => "task_result",
            CommandKind::TaskError { .. } => "task_error",
            CommandKind::MarkExecuting { .. } => "mark_executing",
            CommandKind::SubworkflowResult { .. } => "subworkflow_result",
            CommandKind::SubworkflowError { .. } => "subworkflow_error",
            CommandKind::Alarm => "alarm",
            CommandKind::Cancel { .. } => "cancel",
        }
    }

    /// Token the command refers to, when it has one.
    pub fn token_id(&self) -> Option<TokenId> {
        match self {
            CommandKind::TaskResult { token_id, .. }
            | CommandKind::TaskError { token_id, .. }
            | CommandKind::MarkExecuting { token_id }
            | CommandKind::SubworkflowResult { token_id, .. }
            | CommandKind::SubworkflowError { token_id, .. } => Some(*token_id),
            _ => None,
        }
    }
}

/// A command plus its enqueue timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub kind: CommandKind,
    pub now_ms: u64,
}

impl Command {
    pub fn new(kind: CommandKind, now_ms: u64) -> Self {
        Self { kind, now_ms }
    }
}
