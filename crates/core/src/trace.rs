// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured trace events for the observability sinks.
//!
//! Names follow `{layer}.{domain}.{action}`: `decision.*` from planning,
//! `operation.*` (past tense) from apply, `dispatch.*` from the command
//! dispatcher and effect executor. Every emission carries the run id, a
//! run-monotonic sequence, and a UTC millisecond timestamp; the sequence
//! and run id are stamped by the trace emitter.

use crate::id::{NodeId, RunId, TokenId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub name: String,
    #[serde(default = "empty_run")]
    pub run_id: RunId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<TokenId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    /// Run-monotonic sequence, assigned at emission.
    #[serde(default)]
    pub seq: u64,
    pub ts_ms: u64,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

fn empty_run() -> RunId {
    RunId::from_string("")
}

impl TraceEvent {
    fn named(name: String, ts_ms: u64) -> Self {
        Self {
            name,
            run_id: empty_run(),
            token_id: None,
            node_id: None,
            seq: 0,
            ts_ms,
            data: Value::Null,
        }
    }

    /// Planning-layer event: `decision.{domain}.{action}`, present tense.
    pub fn decision(domain_action: &str, ts_ms: u64) -> Self {
        Self::named(format!("decision.{domain_action}"), ts_ms)
    }

    /// Apply-layer event: `operation.{domain}.{action}`, past tense.
    pub fn operation(domain_action: &str, ts_ms: u64) -> Self {
        Self::named(format!("operation.{domain_action}"), ts_ms)
    }

    /// Dispatcher/effect-layer event: `dispatch.{domain}.{action}`.
    pub fn dispatch(domain_action: &str, ts_ms: u64) -> Self {
        Self::named(format!("dispatch.{domain_action}"), ts_ms)
    }

    pub fn token(mut self, id: TokenId) -> Self {
        self.token_id = Some(id);
        self
    }

    pub fn node(mut self, id: NodeId) -> Self {
        self.node_id = Some(id);
        self
    }

    /// Attach a key into the event's data object.
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        if !self.data.is_object() {
            self.data = Value::Object(serde_json::Map::new());
        }
        if let Some(map) = self.data.as_object_mut() {
            map.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn layer(&self) -> &str {
        self.name.split('.').next().unwrap_or("")
    }
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
