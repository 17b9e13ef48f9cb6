// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-in synchronization: arrivals, the rendezvous row, activation, and
//! the merge.
//!
//! Two arrival shapes exist. When the spawning transition itself carries
//! the synchronization clause, branches rendezvous as they complete the
//! spawned node. When a later transition carries it, each branch crossing
//! that edge parks a successor token at the target node; the merged
//! continuation then executes the target once.
//!
//! Activation is guarded twice: the rendezvous row is unique per
//! `(sibling_group, fan_in_node)`, and `SetFanInActivated` is a no-op
//! when already activated. At most one merge fires per group (more only
//! under `allow_late_merge`, capped at `branch_total`).

use super::{PlanError, Planner};
use serde_json::Value;
use wonder_core::merge::merge_branches;
use wonder_core::{
    ContextPath, Decision, NodeId, OnEarlyComplete, SyncSpec, Token, TokenId, TokenStatus,
    TraceEvent, Transition, TransitionId,
};
use wonder_store::FanInRecord;

impl<'a> Planner<'a> {
    /// A branch completed the fan-in node it was spawned onto.
    pub(crate) fn plan_fan_in_arrival(
        &mut self,
        token: &Token,
        transition_id: &TransitionId,
        output: &Value,
    ) -> Result<(), PlanError> {
        let trans = self
            .def
            .transition(transition_id)
            .ok_or_else(|| PlanError::UnknownTransition(transition_id.clone()))?
            .clone();
        let Some(sync) = trans.sync.clone() else {
            return Ok(());
        };
        let Some(group) = token.sibling_group.clone() else {
            return Ok(());
        };
        let node = token.node_id.clone();

        self.ensure_fan_in(&group, &node, &sync, token.branch_total)?;
        self.emit(
            TraceEvent::decision("sync.arrival", self.now)
                .token(token.id)
                .node(node.clone())
                .field("sibling_group", group.clone()),
        );

        let Some(rec) = self.scratch.fan_in(&group, &node).cloned() else {
            return Ok(());
        };

        if rec.is_activated() {
            return self.plan_late_arrival(token, &group, &node, &sync, output);
        }

        // Write the branch output (isolated) and record the arrival.
        let node_def = self.node(&node)?.clone();
        self.apply_task_output(token, &node_def, output)?;
        self.push(Decision::RecordFanInArrival {
            sibling_group: group.clone(),
            fan_in_node_id: node.clone(),
            token_id: token.id,
        })?;

        let Some(rec) = self.scratch.fan_in(&group, &node).cloned() else {
            return Ok(());
        };
        if sync.wait_for.is_met(rec.arrived_count(), rec.total) {
            self.activate_fan_in(&group, &node, &trans, &sync, token.id)
        } else {
            self.push(Decision::MarkWaiting {
                token_id: token.id,
                status: TokenStatus::WaitingForSiblings,
            })?;
            self.emit(
                TraceEvent::decision("sync.waiting", self.now)
                    .token(token.id)
                    .field("arrived", rec.arrived_count())
                    .field("total", rec.total),
            );
            Ok(())
        }
    }

    /// An existing branch crossed a synchronized edge: park a successor
    /// at the fan-in node and record the arrival there.
    pub(crate) fn plan_cross_edge_arrival(
        &mut self,
        parent: &Token,
        t: &Transition,
        target: &NodeId,
    ) -> Result<(), PlanError> {
        let Some(sync) = t.sync.clone() else {
            return Ok(());
        };
        let Some(group) = parent.sibling_group.clone() else {
            return Ok(());
        };

        self.ensure_fan_in(&group, target, &sync, parent.branch_total)?;

        let successor = Token {
            id: self.next_token_id(),
            node_id: target.clone(),
            status: TokenStatus::Pending,
            parent_token_id: Some(parent.id),
            fan_out_transition_id: Some(t.id.clone()),
            branch_index: parent.branch_index,
            branch_total: parent.branch_total,
            path_id: parent.path_id.clone(),
            sibling_group: Some(group.clone()),
            foreach_item: parent.foreach_item.clone(),
            error: None,
            created_at_ms: self.now,
            updated_at_ms: self.now,
            completed_at_ms: None,
        };
        self.push(Decision::CreateToken { token: successor.clone() })?;

        // The branch table follows the arriving lineage.
        if let Some((src, value)) = self.find_branch_value(parent) {
            self.push(Decision::ApplyBranchOutput {
                token_id: successor.id,
                output: value,
            })?;
            if src != successor.id {
                self.push(Decision::DropBranchTables { token_ids: vec![src] })?;
            }
        }

        self.emit(
            TraceEvent::decision("sync.arrival", self.now)
                .token(successor.id)
                .node(target.clone())
                .field("sibling_group", group.clone()),
        );

        let Some(rec) = self.scratch.fan_in(&group, target).cloned() else {
            return Ok(());
        };
        if rec.is_activated() {
            return self.plan_late_arrival(&successor, &group, target, &sync, &Value::Null);
        }

        self.push(Decision::RecordFanInArrival {
            sibling_group: group.clone(),
            fan_in_node_id: target.clone(),
            token_id: successor.id,
        })?;

        let Some(rec) = self.scratch.fan_in(&group, target).cloned() else {
            return Ok(());
        };
        if sync.wait_for.is_met(rec.arrived_count(), rec.total) {
            self.activate_fan_in(&group, target, t, &sync, successor.id)
        } else {
            self.push(Decision::MarkWaiting {
                token_id: successor.id,
                status: TokenStatus::WaitingForSiblings,
            })?;
            self.emit(
                TraceEvent::decision("sync.waiting", self.now)
                    .token(successor.id)
                    .field("arrived", rec.arrived_count())
                    .field("total", rec.total),
            );
            Ok(())
        }
    }

    /// Zero-width fan-out: nothing to wait for; merge the empty set and
    /// continue immediately.
    pub(crate) fn plan_empty_fan_out(
        &mut self,
        parent: &Token,
        t: &Transition,
        target: &NodeId,
        group: &str,
    ) -> Result<(), PlanError> {
        let Some(sync) = t.sync.clone() else {
            self.emit(
                TraceEvent::decision("routing.empty_spawn", self.now)
                    .token(parent.id)
                    .field("transition_id", t.id.as_str()),
            );
            return Ok(());
        };
        self.push(Decision::TryCreateFanIn {
            sibling_group: group.to_string(),
            fan_in_node_id: target.clone(),
            wait_for: sync.wait_for.clone(),
            total: 0,
            deadline_at_ms: None,
        })?;
        self.activate_fan_in(group, target, t, &sync, parent.id)
    }

    fn ensure_fan_in(
        &mut self,
        group: &str,
        node: &NodeId,
        sync: &SyncSpec,
        total: u32,
    ) -> Result<(), PlanError> {
        self.push(Decision::TryCreateFanIn {
            sibling_group: group.to_string(),
            fan_in_node_id: node.clone(),
            wait_for: sync.wait_for.clone(),
            total,
            deadline_at_ms: sync.timeout_ms.map(|ms| self.now + ms),
        })
    }

    /// A sibling arriving after activation. Policy decides whether its
    /// output is merged, dropped, or was already cancelled.
    fn plan_late_arrival(
        &mut self,
        token: &Token,
        group: &str,
        node: &NodeId,
        sync: &SyncSpec,
        output: &Value,
    ) -> Result<(), PlanError> {
        let merged = match sync.on_early_complete {
            OnEarlyComplete::AllowLateMerge => {
                let Some(rec) = self.scratch.fan_in(group, node).cloned() else {
                    return Ok(());
                };
                if rec.merge_count < rec.total {
                    let node_def = self.node(node)?.clone();
                    self.apply_task_output(token, &node_def, output)?;
                    self.push(Decision::RecordFanInArrival {
                        sibling_group: group.to_string(),
                        fan_in_node_id: node.clone(),
                        token_id: token.id,
                    })?;
                    self.push_remerge(group, node, sync)?;
                    true
                } else {
                    false
                }
            }
            OnEarlyComplete::Cancel | OnEarlyComplete::Abandon => {
                // The dropped branch's table is gone with it.
                if self.scratch.branch_outputs.contains_key(&token.id) {
                    self.push(Decision::DropBranchTables { token_ids: vec![token.id] })?;
                }
                false
            }
        };

        // Late siblings complete either way; their work is preserved only
        // when it was merged.
        self.push(Decision::UpdateTokenStatus {
            token_id: token.id,
            status: TokenStatus::Completed,
            error: None,
        })?;
        self.emit(
            TraceEvent::decision(
                if merged { "sync.late_merge" } else { "sync.late_arrival_dropped" },
                self.now,
            )
            .token(token.id)
            .node(node.clone()),
        );
        Ok(())
    }

    /// Activate: conditional activation mark, merge over arrived branch
    /// tables, sibling completion, cancellation policy, and the merged
    /// continuation token.
    pub(crate) fn activate_fan_in(
        &mut self,
        group: &str,
        node: &NodeId,
        trans: &Transition,
        sync: &SyncSpec,
        lineage_parent: TokenId,
    ) -> Result<(), PlanError> {
        let Some(rec) = self.scratch.fan_in(group, node).cloned() else {
            return Ok(());
        };
        if rec.is_activated() {
            return Ok(());
        }

        let merged_id = self.next_token_id();
        self.push(Decision::SetFanInActivated {
            sibling_group: group.to_string(),
            fan_in_node_id: node.clone(),
            merged_token_id: merged_id,
            activated_at_ms: self.now,
        })?;

        let (source_tokens, target, merged_value) = self.compute_merge(&rec, sync)?;
        self.push(Decision::MergeBranches {
            sibling_group: group.to_string(),
            fan_in_node_id: node.clone(),
            source_tokens: source_tokens.clone(),
            target,
            merged: merged_value,
        })?;

        // Branch tables are dropped at the merge, except when late
        // arrivals may still re-merge.
        if sync.on_early_complete != OnEarlyComplete::AllowLateMerge && !source_tokens.is_empty() {
            self.push(Decision::DropBranchTables { token_ids: source_tokens.clone() })?;
        }

        // Arrived siblings (including the activator) complete; their work
        // is preserved in the merge.
        for token_id in &rec.arrived {
            if let Some(t) = self.scratch.token(token_id) {
                if !t.is_terminal() {
                    self.push(Decision::UpdateTokenStatus {
                        token_id: *token_id,
                        status: TokenStatus::Completed,
                        error: None,
                    })?;
                }
            }
        }

        if sync.on_early_complete == OnEarlyComplete::Cancel {
            let stragglers: Vec<TokenId> = self
                .scratch
                .tokens
                .values()
                .filter(|t| {
                    t.sibling_group.as_deref() == Some(group)
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
                self.push(Decision::DropBranchTables { token_ids: orphaned_tables })?;
            }
        }

        self.emit(
            TraceEvent::dispatch("sync.fan_in_activated", self.now)
                .node(node.clone())
                .field("sibling_group", group)
                .field("arrived", rec.arrived_count())
                .field("total", rec.total)
                .field("merged_token_id", merged_id.to_string()),
        );

        // The merged continuation inherits the outer fan-out context so
        // nested fan-ins can find their own sibling group later.
        let outer = self.outer_lineage(group);
        let merged = Token {
            id: merged_id,
            node_id: node.clone(),
            status: TokenStatus::Pending,
            parent_token_id: Some(
                rec.arrived.last().copied().unwrap_or(lineage_parent),
            ),
            fan_out_transition_id: Some(trans.id.clone()),
            branch_index: outer.as_ref().map(|t| t.branch_index).unwrap_or(0),
            branch_total: outer.as_ref().map(|t| t.branch_total).unwrap_or(1),
            path_id: format!("{group}.fanin"),
            sibling_group: outer.as_ref().and_then(|t| t.sibling_group.clone()),
            foreach_item: outer.and_then(|t| t.foreach_item),
            error: None,
            created_at_ms: self.now,
            updated_at_ms: self.now,
            completed_at_ms: None,
        };
        self.push(Decision::CreateToken { token: merged.clone() })?;

        // Same-node rendezvous: the fan-in node already ran per branch,
        // the merged token routes onward. Cross-edge rendezvous: the
        // fan-in node has not run yet, the merged token executes it.
        let same_node = group.ends_with(&format!(".{}", trans.id));
        if same_node {
            self.push(Decision::UpdateTokenStatus {
                token_id: merged_id,
                status: TokenStatus::Completed,
                error: None,
            })?;
            self.route_onward(&merged)
        } else {
            self.dispatch_or_route(&merged)
        }
    }

    /// Recompute and rewrite the merge for a group (late-merge path).
    fn push_remerge(
        &mut self,
        group: &str,
        node: &NodeId,
        sync: &SyncSpec,
    ) -> Result<(), PlanError> {
        let Some(rec) = self.scratch.fan_in(group, node).cloned() else {
            return Ok(());
        };
        let (source_tokens, target, merged_value) = self.compute_merge(&rec, sync)?;
        self.push(Decision::MergeBranches {
            sibling_group: group.to_string(),
            fan_in_node_id: node.clone(),
            source_tokens,
            target,
            merged: merged_value,
        })
    }

    /// Merge inputs: arrived branches' table values in branch-index order.
    fn compute_merge(
        &self,
        rec: &FanInRecord,
        sync: &SyncSpec,
    ) -> Result<(Vec<TokenId>, ContextPath, Value), PlanError> {
        let mut outputs: Vec<(u32, Value)> = Vec::with_capacity(rec.arrived.len());
        for token_id in &rec.arrived {
            let Some(token) = self.scratch.token(token_id) else {
                continue;
            };
            let value = self
                .scratch
                .branch_outputs
                .get(token_id)
                .cloned()
                .unwrap_or(Value::Null);
            outputs.push((token.branch_index, value));
        }
        let merged = merge_branches(sync.merge.strategy, &outputs);
        let target = Self::parse_path(&sync.merge.target)?;
        Ok((rec.arrived.clone(), target, merged))
    }

    /// The branch value carried by this lineage: the nearest branch table
    /// on the token or its ancestors.
    fn find_branch_value(&self, token: &Token) -> Option<(TokenId, Value)> {
        let mut cur = Some(token.id);
        while let Some(id) = cur {
            if let Some(value) = self.scratch.branch_outputs.get(&id) {
                return Some((id, value.clone()));
            }
            cur = self.scratch.token(&id).and_then(|t| t.parent_token_id);
        }
        None
    }

    /// The lineage position the sibling group fanned out from: the most
    /// recent token whose path is the group's parent path.
    pub(crate) fn outer_lineage(&self, group: &str) -> Option<Token> {
        let parent_path = group.rsplit_once('.').map(|(p, _)| p)?;
        self.scratch
            .tokens
            .values()
            .filter(|t| t.path_id == parent_path)
            .next_back()
            .cloned()
    }
}
