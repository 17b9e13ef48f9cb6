// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-visible error values and the workflow failure taxonomy.
//!
//! Infrastructure errors (timeouts, 5xx, rate limits) are retried by the
//! task executor and never reach planning. What arrives here is business
//! outcomes: a task failed, input didn't validate, a fan-in timed out.

use serde::{Deserialize, Serialize};

/// Error value attached to tokens, workflow status, and parent
/// notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub retriable: bool,
}

impl ErrorObject {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), retriable: false }
    }

    pub fn retriable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), retriable: true }
    }

    /// Error for a workflow-level failure kind.
    pub fn from_kind(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { code: kind.as_code().to_string(), message: message.into(), retriable: false }
    }
}

impl std::fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Why a workflow run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A node completed but no outgoing transition matched.
    NoTransitionMatched,
    /// A loop transition exceeded its `max_iterations`.
    MaxIterationsExceeded,
    /// Programming error surfaced during apply (invalid state transition,
    /// unknown node, unknown decision).
    InternalError,
    /// A child run failed and `on_failure = propagate`.
    SubworkflowFailed,
    /// A fan-in deadline passed with `on_timeout = fail`.
    FanInTimeout,
    /// Start input did not validate against the input schema.
    InvalidInput,
    /// Extracted output did not validate against the output schema.
    InvalidOutput,
    /// Task dispatch kept failing after the retry budget.
    DispatchFailed,
}

impl FailureKind {
    pub fn as_code(&self) -> &'static str {
        match self {
            FailureKind::NoTransitionMatched => "no_transition_matched",
            FailureKind::MaxIterationsExceeded => "max_iterations_exceeded",
            FailureKind::InternalError => "internal_error",
            FailureKind::SubworkflowFailed => "subworkflow_failed",
            FailureKind::FanInTimeout => "fan_in_timeout",
            FailureKind::InvalidInput => "invalid_input",
            FailureKind::InvalidOutput => "invalid_output",
            FailureKind::DispatchFailed => "dispatch_failed",
        }
    }
}

crate::simple_display! {
    FailureKind {
        NoTransitionMatched => "no_transition_matched",
        MaxIterationsExceeded => "max_iterations_exceeded",
        InternalError => "internal_error",
        SubworkflowFailed => "subworkflow_failed",
        FanInTimeout => "fan_in_timeout",
        InvalidInput => "invalid_input",
        InvalidOutput => "invalid_output",
        DispatchFailed => "dispatch_failed",
    }
}
