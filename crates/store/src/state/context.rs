// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context sections and branch-table handlers.
//!
//! The three sections (`input`, `state`, `output`) are schema-bound JSON
//! documents. Branch tables isolate fan-out outputs per token until the
//! sibling group's merge writes the combined value to the target path and
//! drops them.

use super::{ApplyError, RunState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wonder_core::path::{get_path, set_path};
use wonder_core::{ContextPath, Decision, Section, TraceEvent};

/// The run's three logical context sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSections {
    pub input: Value,
    pub state: Value,
    pub output: Value,
}

impl Default for ContextSections {
    fn default() -> Self {
        Self {
            input: Value::Object(serde_json::Map::new()),
            state: Value::Object(serde_json::Map::new()),
            output: Value::Object(serde_json::Map::new()),
        }
    }
}

impl ContextSections {
    pub fn section(&self, section: Section) -> &Value {
        match section {
            Section::Input => &self.input,
            Section::State => &self.state,
            Section::Output => &self.output,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut Value {
        match section {
            Section::Input => &mut self.input,
            Section::State => &mut self.state,
            Section::Output => &mut self.output,
        }
    }

    pub fn get(&self, path: &ContextPath) -> Option<&Value> {
        get_path(self.section(path.section), &path.segments)
    }

    pub fn set(&mut self, path: &ContextPath, value: Value) {
        set_path(self.section_mut(path.section), &path.segments, value);
    }

    /// Combined view for condition evaluation:
    /// `{ "input": …, "state": …, "output": … }`.
    pub fn view(&self) -> Value {
        serde_json::json!({
            "input": self.input,
            "state": self.state,
            "output": self.output,
        })
    }
}

pub(super) fn apply(
    state: &mut RunState,
    decision: &Decision,
    now_ms: u64,
) -> Result<Vec<TraceEvent>, ApplyError> {
    match decision {
        Decision::SetContextField { write } => {
            state.context.set(&write.path, write.value.clone());
            Ok(vec![TraceEvent::operation("context.updated", now_ms)
                .field("path", write.path.to_string())])
        }

        Decision::ApplyOutputMapping { token_id, writes } => {
            for write in writes {
                state.context.set(&write.path, write.value.clone());
            }
            Ok(vec![TraceEvent::operation("context.output_mapped", now_ms)
                .token(*token_id)
                .field("writes", writes.len())])
        }

        Decision::InitBranchTable { token_id } => {
            state
                .branch_outputs
                .entry(*token_id)
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            Ok(vec![TraceEvent::operation("context.branch_table.created", now_ms)
                .token(*token_id)])
        }

        Decision::ApplyBranchOutput { token_id, output } => {
            state.branch_outputs.insert(*token_id, output.clone());
            Ok(vec![TraceEvent::operation("context.branch_table.updated", now_ms)
                .token(*token_id)])
        }

        Decision::MergeBranches { sibling_group, fan_in_node_id, source_tokens, target, merged } => {
            state.context.set(target, merged.clone());
            let key = super::fan_in_key(sibling_group, fan_in_node_id);
            if let Some(rec) = state.fan_ins.get_mut(&key) {
                rec.merge_count += 1;
            }
            Ok(vec![TraceEvent::operation("context.merged", now_ms)
                .node(fan_in_node_id.clone())
                .field("sibling_group", sibling_group.clone())
                .field("target", target.to_string())
                .field("branches", source_tokens.len())])
        }

        Decision::DropBranchTables { token_ids } => {
            let mut dropped = 0usize;
            for token_id in token_ids {
                if state.branch_outputs.shift_remove(token_id).is_some() {
                    dropped += 1;
                }
            }
            Ok(vec![TraceEvent::operation("context.branch_table.dropped", now_ms)
                .field("count", dropped)])
        }

        _ => unreachable!("non-context decision routed to context::apply"),
    }
}
