// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-in rendezvous rows.
//!
//! One row per `(sibling_group, fan_in_node_id)`; the map key is the
//! uniqueness constraint. `TryCreateFanIn` and `SetFanInActivated` are
//! conditional writes, the two atomicity points of the merge protocol.

use super::{ApplyError, RunState};
use serde::{Deserialize, Serialize};
use wonder_core::{Decision, NodeId, TokenId, TraceEvent, WaitFor};

/// Map key for a fan-in row.
pub fn fan_in_key(sibling_group: &str, node: &NodeId) -> String {
    format!("{sibling_group}|{node}")
}

/// Durable rendezvous for one sibling group's merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanInRecord {
    pub sibling_group: String,
    pub fan_in_node_id: NodeId,
    pub wait_for: WaitFor,
    /// Branch total of the sibling group.
    pub total: u32,
    /// Arrived tokens in arrival order.
    pub arrived: Vec<TokenId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_token_id: Option<TokenId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_at_ms: Option<u64>,
    /// Merges performed (>1 only under `allow_late_merge`).
    #[serde(default)]
    pub merge_count: u32,
    pub created_at_ms: u64,
}

impl FanInRecord {
    pub fn key(&self) -> String {
        fan_in_key(&self.sibling_group, &self.fan_in_node_id)
    }

    pub fn arrived_count(&self) -> u32 {
        self.arrived.len() as u32
    }

    pub fn is_activated(&self) -> bool {
        self.activated_at_ms.is_some()
    }
}

pub(super) fn apply(
    state: &mut RunState,
    decision: &Decision,
    now_ms: u64,
) -> Result<Vec<TraceEvent>, ApplyError> {
    match decision {
        Decision::TryCreateFanIn {
            sibling_group,
            fan_in_node_id,
            wait_for,
            total,
            deadline_at_ms,
        } => {
            let key = fan_in_key(sibling_group, fan_in_node_id);
            // Conditional insert: the row is unique per key, a second
            // attempt is a no-op.
            if state.fan_ins.contains_key(&key) {
                return Ok(vec![]);
            }
            state.fan_ins.insert(
                key,
                FanInRecord {
                    sibling_group: sibling_group.clone(),
                    fan_in_node_id: fan_in_node_id.clone(),
                    wait_for: wait_for.clone(),
                    total: *total,
                    arrived: Vec::new(),
                    activated_at_ms: None,
                    merged_token_id: None,
                    deadline_at_ms: *deadline_at_ms,
                    merge_count: 0,
                    created_at_ms: now_ms,
                },
            );
            Ok(vec![TraceEvent::operation("fan_in.created", now_ms)
                .node(fan_in_node_id.clone())
                .field("sibling_group", sibling_group.clone())
                .field("total", *total)])
        }

        Decision::RecordFanInArrival { sibling_group, fan_in_node_id, token_id } => {
            let key = fan_in_key(sibling_group, fan_in_node_id);
            let rec = state
                .fan_ins
                .get_mut(&key)
                .ok_or_else(|| ApplyError::UnknownFanIn(key.clone()))?;
            if rec.arrived.contains(token_id) {
                return Ok(vec![]);
            }
            rec.arrived.push(*token_id);
            let arrived = rec.arrived_count();
            Ok(vec![TraceEvent::operation("fan_in.arrival_recorded", now_ms)
                .token(*token_id)
                .node(fan_in_node_id.clone())
                .field("arrived", arrived)
                .field("total", rec.total)])
        }

        Decision::SetFanInActivated {
            sibling_group,
            fan_in_node_id,
            merged_token_id,
            activated_at_ms,
        } => {
            let key = fan_in_key(sibling_group, fan_in_node_id);
            let rec = state
                .fan_ins
                .get_mut(&key)
                .ok_or_else(|| ApplyError::UnknownFanIn(key.clone()))?;
            // Conditional update: activation succeeds at most once.
            if rec.is_activated() {
                return Ok(vec![]);
            }
            rec.activated_at_ms = Some(*activated_at_ms);
            rec.merged_token_id = Some(*merged_token_id);
            Ok(vec![TraceEvent::operation("fan_in.activated", now_ms)
                .node(fan_in_node_id.clone())
                .field("sibling_group", sibling_group.clone())
                .field("merged_token_id", merged_token_id.to_string())])
        }

        _ => unreachable!("non-fan-in decision routed to fan_ins::apply"),
    }
}
