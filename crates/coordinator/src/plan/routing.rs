// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routing: what happens when a token finishes its node.
//!
//! Output mapping first, then transition evaluation tier by tier: the
//! first priority tier with at least one truthy condition wins, and every
//! match in that tier produces outbound flow. Fan-out spawns sibling
//! groups; plain matches advance the lineage with a successor token.

use super::{PlanError, Planner};
use serde_json::Value;
use wonder_core::decision::ContextWrite;
use wonder_core::path::{get_source, set_path};
use wonder_core::{
    ActionRef, ContextPath, Decision, ErrorObject, FailureKind, Node, NodeId, SpawnSpec, Token,
    TokenId, TokenStatus, TraceEvent, Transition,
};

impl<'a> Planner<'a> {
    pub(crate) fn plan_task_result(
        &mut self,
        token_id: TokenId,
        output: &Value,
    ) -> Result<(), PlanError> {
        let Some(token) = self.scratch.token(&token_id).cloned() else {
            self.emit(
                TraceEvent::dispatch("result.unknown_token", self.now).token(token_id),
            );
            return Ok(());
        };

        // Results for terminal tokens (e.g. after cancel or an early
        // quorum) are accepted but ignored.
        if token.is_terminal() || self.scratch.status.status.is_terminal() {
            self.emit(
                TraceEvent::dispatch("result.dropped", self.now)
                    .token(token_id)
                    .field("status", token.status.to_string()),
            );
            return Ok(());
        }

        // Workers may report a result without a prior mark_executing.
        if token.status == TokenStatus::Dispatched {
            self.push(Decision::UpdateTokenStatus {
                token_id,
                status: TokenStatus::Executing,
                error: None,
            })?;
        }

        self.token_completed(&token, output)?;
        self.maybe_complete_workflow()
    }

    pub(crate) fn plan_mark_executing(&mut self, token_id: TokenId) -> Result<(), PlanError> {
        match self.scratch.token(&token_id) {
            Some(token) if token.status == TokenStatus::Dispatched => {
                self.push(Decision::UpdateTokenStatus {
                    token_id,
                    status: TokenStatus::Executing,
                    error: None,
                })?;
            }
            Some(token) => {
                self.emit(
                    TraceEvent::dispatch("result.dropped", self.now)
                        .token(token_id)
                        .field("status", token.status.to_string()),
                );
            }
            None => {
                self.emit(
                    TraceEvent::dispatch("result.unknown_token", self.now).token(token_id),
                );
            }
        }
        Ok(())
    }

    /// A token's work at its node is done (task result, child output
    /// already mapped, or a routing pass-through). Either this is a
    /// fan-in arrival, or the token completes and routes onward.
    pub(crate) fn token_completed(
        &mut self,
        token: &Token,
        output: &Value,
    ) -> Result<(), PlanError> {
        if self.scratch.status.status.is_terminal() {
            return Ok(());
        }

        if let Some(transition_id) = self.inbound_sync_transition(token) {
            return self.plan_fan_in_arrival(token, &transition_id, output);
        }

        let node = self.node(&token.node_id)?.clone();
        self.apply_task_output(token, &node, output)?;
        self.push(Decision::UpdateTokenStatus {
            token_id: token.id,
            status: TokenStatus::Completed,
            error: None,
        })?;
        self.emit(
            TraceEvent::decision("routing.node_completed", self.now)
                .token(token.id)
                .node(token.node_id.clone()),
        );
        self.route_onward(token)
    }

    pub(crate) fn node(&self, id: &NodeId) -> Result<&Node, PlanError> {
        self.def.node(id).ok_or_else(|| PlanError::UnknownNode(id.clone()))
    }

    /// The transition whose synchronization clause governs this token's
    /// completion: the token was spawned by it (its sibling group ends in
    /// the transition id) onto the transition's target node.
    pub(crate) fn inbound_sync_transition(
        &self,
        token: &Token,
    ) -> Option<wonder_core::TransitionId> {
        let group = token.sibling_group.as_ref()?;
        let tid = token.fan_out_transition_id.as_ref()?;
        if !group.ends_with(&format!(".{tid}")) {
            return None;
        }
        let trans = self.def.transition(tid)?;
        if trans.sync.is_some() && trans.to_node.as_ref() == Some(&token.node_id) {
            Some(tid.clone())
        } else {
            None
        }
    }

    /// First synchronization clause reachable from `node` by following
    /// edges forward. Decides whether fan-out branches get branch tables.
    pub(crate) fn downstream_sync(&self, node: &NodeId) -> Option<&Transition> {
        let mut visited = std::collections::HashSet::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(node.clone());
        visited.insert(node.clone());
        while let Some(cur) = queue.pop_front() {
            for t in self.def.transitions_from(&cur) {
                if t.sync.is_some() {
                    return self.def.transition(&t.id);
                }
                if let Some(next) = &t.to_node {
                    if visited.insert(next.clone()) {
                        queue.push_back(next.clone());
                    }
                }
            }
        }
        None
    }

    /// Merge target governing this token's branch table, if any.
    pub(crate) fn merge_target_for(&self, token: &Token) -> Option<ContextPath> {
        let sync = match self.inbound_sync_transition(token) {
            Some(tid) => self.def.transition(&tid)?.sync.as_ref()?,
            None => self.downstream_sync(&token.node_id)?.sync.as_ref()?,
        };
        ContextPath::parse(&sync.merge.target).ok()
    }

    /// Apply the node's output mapping: writes addressed at the merge
    /// target go into the token's branch table (isolated until the
    /// merge); everything else writes shared context.
    pub(crate) fn apply_task_output(
        &mut self,
        token: &Token,
        node: &Node,
        output: &Value,
    ) -> Result<(), PlanError> {
        if node.output_mapping.is_empty() {
            return Ok(());
        }

        let isolated = self.scratch.branch_outputs.contains_key(&token.id);
        let merge_target = if isolated { self.merge_target_for(token) } else { None };

        let mut branch_value: Option<Value> = None;
        let mut shared: Vec<ContextWrite> = Vec::new();

        for (ctx_path, src) in node.output_mapping.iter() {
            let path = Self::parse_path(ctx_path)?;
            let value = get_source(output, src).cloned().unwrap_or(Value::Null);
            match &merge_target {
                Some(target) if target.covers(&path) => {
                    let rel = &path.segments[target.segments.len()..];
                    if rel.is_empty() {
                        branch_value = Some(value);
                    } else {
                        let slot = branch_value
                            .get_or_insert_with(|| Value::Object(serde_json::Map::new()));
                        set_path(slot, rel, value);
                    }
                }
                _ => shared.push(ContextWrite { path, value }),
            }
        }

        if let Some(value) = branch_value {
            self.push(Decision::ApplyBranchOutput { token_id: token.id, output: value })?;
        }
        if !shared.is_empty() {
            self.push(Decision::ApplyOutputMapping { token_id: token.id, writes: shared })?;
        }
        Ok(())
    }

    /// Task input from the node's input mapping plus the foreach item
    /// binding, resolved against the current context view.
    pub(crate) fn resolve_input(&self, node: &Node, token: &Token) -> Result<Value, PlanError> {
        let mut input = serde_json::Map::new();
        for (key, path) in node.input_mapping.iter() {
            let path = Self::parse_path(path)?;
            let value = self.scratch.context.get(&path).cloned().unwrap_or(Value::Null);
            input.insert(key.clone(), value);
        }
        if let (Some(item), Some(tid)) = (&token.foreach_item, &token.fan_out_transition_id) {
            if let Some(SpawnSpec::ForEach { item_var, .. }) =
                self.def.transition(tid).and_then(|t| t.spawn.as_ref())
            {
                input.insert(item_var.clone(), item.clone());
            }
        }
        Ok(Value::Object(input))
    }

    /// Evaluate the node's outgoing tiers and fire every match in the
    /// winning tier. No match with outgoing edges present fails the run.
    pub(crate) fn route_onward(&mut self, token: &Token) -> Result<(), PlanError> {
        if self.scratch.status.status.is_terminal() {
            return Ok(());
        }

        let tiers = self.def.tiers_from(&token.node_id);
        if tiers.is_empty() {
            self.emit(
                TraceEvent::decision("routing.terminal_node", self.now)
                    .token(token.id)
                    .node(token.node_id.clone()),
            );
            return Ok(());
        }

        let winners = self.winning_transitions(&token.node_id, false)?;
        if winners.is_empty() {
            self.emit(
                TraceEvent::decision("routing.no_match", self.now)
                    .token(token.id)
                    .node(token.node_id.clone()),
            );
            return self.fail_workflow(
                ErrorObject::from_kind(
                    FailureKind::NoTransitionMatched,
                    format!("no transition matched from node {}", token.node_id),
                ),
                Some(token.node_id.clone()),
            );
        }

        for transition_id in winners {
            let t = self
                .def
                .transition(&transition_id)
                .ok_or(PlanError::UnknownTransition(transition_id))?
                .clone();
            self.emit(
                TraceEvent::decision("routing.transition_matched", self.now)
                    .token(token.id)
                    .node(token.node_id.clone())
                    .field("transition_id", t.id.as_str())
                    .field("priority", t.priority),
            );
            self.fire_transition(token, &t)?;
            if self.scratch.status.status.is_terminal() {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Ids of the transitions in the winning priority tier.
    ///
    /// `conditioned_only` restricts matching to transitions that carry a
    /// condition (failure routing: unconditioned edges are success-path
    /// defaults and must not fire on error).
    pub(crate) fn winning_transitions(
        &self,
        node: &NodeId,
        conditioned_only: bool,
    ) -> Result<Vec<wonder_core::TransitionId>, PlanError> {
        for tier in self.def.tiers_from(node) {
            let mut matched = Vec::new();
            for t in tier {
                if conditioned_only && t.condition.is_none() {
                    continue;
                }
                if self.condition_matches(t.condition.as_deref())? {
                    matched.push(t.id.clone());
                }
            }
            if !matched.is_empty() {
                return Ok(matched);
            }
        }
        Ok(Vec::new())
    }

    pub(crate) fn fire_transition(
        &mut self,
        parent: &Token,
        t: &Transition,
    ) -> Result<(), PlanError> {
        if self.scratch.status.status.is_terminal() {
            return Ok(());
        }

        let Some(target) = t.to_node.clone() else {
            // Terminal edge: the path ends here.
            self.emit(
                TraceEvent::decision("routing.terminal_edge", self.now)
                    .token(parent.id)
                    .field("transition_id", t.id.as_str()),
            );
            return Ok(());
        };

        if let Some(lc) = &t.loop_config {
            let visits = self.scratch.iteration_count(&target, &parent.path_id);
            if visits >= lc.max_iterations {
                return self.fail_workflow(
                    ErrorObject::from_kind(
                        FailureKind::MaxIterationsExceeded,
                        format!(
                            "transition {} exceeded {} iterations at node {} (path {})",
                            t.id, lc.max_iterations, target, parent.path_id
                        ),
                    ),
                    Some(target),
                );
            }
        }
        self.push(Decision::RecordIteration {
            node_id: target.clone(),
            path_id: parent.path_id.clone(),
        })?;

        let (count, items) = match &t.spawn {
            None => (1u32, None),
            Some(SpawnSpec::Count { count }) => (*count, None),
            Some(SpawnSpec::ForEach { collection, .. }) => {
                let path = Self::parse_path(collection)?;
                match self.scratch.context.get(&path) {
                    Some(Value::Array(items)) => (items.len() as u32, Some(items.clone())),
                    _ => {
                        return self.fail_workflow(
                            ErrorObject::from_kind(
                                FailureKind::InvalidInput,
                                format!("foreach collection {collection} is not an array"),
                            ),
                            Some(target),
                        );
                    }
                }
            }
        };

        // A synchronized edge crossed by an existing branch is an arrival
        // of that sibling group, not a new fan-out.
        if t.sync.is_some() && t.spawn.is_none() && parent.sibling_group.is_some() {
            return self.plan_cross_edge_arrival(parent, t, &target);
        }

        if count != 1 || t.sync.is_some() {
            self.spawn_fan_out(parent, t, &target, count, items)
        } else {
            let item = items.and_then(|mut v| {
                if v.is_empty() {
                    None
                } else {
                    Some(v.swap_remove(0))
                }
            });
            self.spawn_successor(parent, t, &target, item)
        }
    }

    /// Fan-out: one token per branch, isolated branch tables when a merge
    /// will read them.
    fn spawn_fan_out(
        &mut self,
        parent: &Token,
        t: &Transition,
        target: &NodeId,
        count: u32,
        items: Option<Vec<Value>>,
    ) -> Result<(), PlanError> {
        let group = parent.sibling_group_for(&t.id);

        if count == 0 {
            return self.plan_empty_fan_out(parent, t, target, &group);
        }

        let base = self.scratch.next_token_seq;
        let tokens: Vec<Token> = (0..count)
            .map(|i| Token {
                id: TokenId::from_seq(base + u64::from(i)),
                node_id: target.clone(),
                status: TokenStatus::Pending,
                parent_token_id: Some(parent.id),
                fan_out_transition_id: Some(t.id.clone()),
                branch_index: i,
                branch_total: count,
                path_id: format!("{}.{}.{}", parent.path_id, t.id, i),
                sibling_group: Some(group.clone()),
                foreach_item: items.as_ref().and_then(|v| v.get(i as usize).cloned()),
                error: None,
                created_at_ms: self.now,
                updated_at_ms: self.now,
                completed_at_ms: None,
            })
            .collect();

        self.push(Decision::BatchCreateTokens { tokens: tokens.clone() })?;
        self.emit(
            TraceEvent::decision("routing.fan_out", self.now)
                .token(parent.id)
                .node(target.clone())
                .field("transition_id", t.id.as_str())
                .field("sibling_group", group)
                .field("count", count),
        );

        let merging = t.sync.is_some() || self.downstream_sync(target).is_some();
        if merging {
            for token in &tokens {
                self.push(Decision::InitBranchTable { token_id: token.id })?;
            }
        }

        for token in &tokens {
            self.dispatch_or_route(token)?;
            if self.scratch.status.status.is_terminal() {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Plain advance: a successor token continuing the parent's lineage.
    fn spawn_successor(
        &mut self,
        parent: &Token,
        t: &Transition,
        target: &NodeId,
        item: Option<Value>,
    ) -> Result<(), PlanError> {
        let token = Token {
            id: self.next_token_id(),
            node_id: target.clone(),
            status: TokenStatus::Pending,
            parent_token_id: Some(parent.id),
            fan_out_transition_id: Some(t.id.clone()),
            branch_index: parent.branch_index,
            branch_total: parent.branch_total,
            path_id: parent.path_id.clone(),
            sibling_group: parent.sibling_group.clone(),
            foreach_item: item.or_else(|| parent.foreach_item.clone()),
            error: None,
            created_at_ms: self.now,
            updated_at_ms: self.now,
            completed_at_ms: None,
        };
        self.push(Decision::CreateToken { token: token.clone() })?;
        self.emit(
            TraceEvent::decision("routing.advance", self.now)
                .token(token.id)
                .node(target.clone())
                .field("transition_id", t.id.as_str()),
        );
        self.dispatch_or_route(&token)
    }

    /// Dispatch a freshly created pending token: hand its task to the
    /// executor, start its child workflow, or pass straight through a
    /// routing node.
    pub(crate) fn dispatch_or_route(&mut self, token: &Token) -> Result<(), PlanError> {
        if self.scratch.status.status.is_terminal() {
            return Ok(());
        }

        let node = self.node(&token.node_id)?.clone();
        match &node.action {
            None => {
                self.emit(
                    TraceEvent::decision("routing.pass_through", self.now)
                        .token(token.id)
                        .node(token.node_id.clone()),
                );
                self.token_completed(token, &Value::Null)
            }
            Some(ActionRef::Task { action_id, timeout_ms }) => {
                let input = self.resolve_input(&node, token)?;
                self.push(Decision::UpdateTokenStatus {
                    token_id: token.id,
                    status: TokenStatus::Dispatched,
                    error: None,
                })?;
                self.push(Decision::DispatchToken {
                    token_id: token.id,
                    node_id: token.node_id.clone(),
                    action_id: action_id.clone(),
                    input,
                    timeout_ms: *timeout_ms,
                })?;
                self.emit(
                    TraceEvent::decision("routing.dispatched", self.now)
                        .token(token.id)
                        .node(token.node_id.clone())
                        .field("action_id", action_id.as_str()),
                );
                Ok(())
            }
            Some(ActionRef::Workflow { definition_id, version, on_failure, timeout_ms }) => self
                .plan_subworkflow_invocation(
                    token,
                    &node,
                    *definition_id,
                    *version,
                    *on_failure,
                    *timeout_ms,
                ),
        }
    }
}
