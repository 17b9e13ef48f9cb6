// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token identity and state machine.
//!
//! A token marks one active point of execution in the workflow graph. Its
//! lineage is the dotted `path_id`: the root token is `"0"`, branch `i` of
//! a fan-out over transition `t` appends `".t.i"`, and the merged
//! continuation of a sibling group ends in `".fanin"`.

use crate::error::ErrorObject;
use crate::id::{NodeId, TokenId, TransitionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path id of the root token.
pub const ROOT_PATH: &str = "0";

/// Where a token is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    /// Created, not yet handed to the executor
    Pending,
    /// Task sent to the executor
    Dispatched,
    /// Worker reported pickup
    Executing,
    /// Arrived at a fan-in, waiting for the sibling group
    WaitingForSiblings,
    /// Parent token of a running child workflow
    WaitingForSubworkflow,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

crate::simple_display! {
    TokenStatus {
        Pending => "pending",
        Dispatched => "dispatched",
        Executing => "executing",
        WaitingForSiblings => "waiting_for_siblings",
        WaitingForSubworkflow => "waiting_for_subworkflow",
        Completed => "completed",
        Failed => "failed",
        TimedOut => "timed_out",
        Cancelled => "cancelled",
    }
}

impl TokenStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TokenStatus::Completed
                | TokenStatus::Failed
                | TokenStatus::TimedOut
                | TokenStatus::Cancelled
        )
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// The fixed token state machine. Any transition not listed here is a
    /// programming error and aborts the apply batch.
    pub fn can_transition_to(&self, next: TokenStatus) -> bool {
        use TokenStatus::*;
        match self {
            // Pending completes directly for routing nodes and merged
            // continuation tokens, and waits directly at fan-ins reached
            // over a synchronized edge or on sub-workflow invocation.
            Pending => matches!(
                next,
                Dispatched | Completed | WaitingForSiblings | WaitingForSubworkflow | Cancelled
            ),
            Dispatched => matches!(next, Executing | Failed | Cancelled | TimedOut),
            Executing => matches!(
                next,
                Completed | WaitingForSiblings | Failed | TimedOut | Cancelled
            ),
            WaitingForSiblings => matches!(next, Completed | TimedOut | Cancelled),
            // A sub-workflow node can itself be a fan-in: the parent
            // token moves from one wait to the other on child completion.
            WaitingForSubworkflow => {
                matches!(next, Completed | Failed | TimedOut | Cancelled | WaitingForSiblings)
            }
            Completed | Failed | TimedOut | Cancelled => false,
        }
    }
}

/// One unit of active flow through the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub node_id: NodeId,
    pub status: TokenStatus,
    /// Spawning token; `None` only for the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_token_id: Option<TokenId>,
    /// Transition that spawned this token; `None` only for the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fan_out_transition_id: Option<TransitionId>,
    #[serde(default)]
    pub branch_index: u32,
    #[serde(default = "one")]
    pub branch_total: u32,
    /// Dotted lineage path, e.g. `0.review.2`.
    pub path_id: String,
    /// Key of the fan-out instance this token belongs to
    /// (`parent.path_id + "." + fan_out_transition_id`); `None` outside
    /// fan-out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sibling_group: Option<String>,
    /// Bound collection item for `foreach` spawns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreach_item: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
}

fn one() -> u32 {
    1
}

impl Token {
    /// Root token of a run, positioned at the initial node.
    pub fn root(id: TokenId, node_id: NodeId, now_ms: u64) -> Self {
        Self {
            id,
            node_id,
            status: TokenStatus::Pending,
            parent_token_id: None,
            fan_out_transition_id: None,
            branch_index: 0,
            branch_total: 1,
            path_id: ROOT_PATH.to_string(),
            sibling_group: None,
            foreach_item: None,
            error: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            completed_at_ms: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_token_id.is_none()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Sibling-group key for a fan-out this token performs over `transition`.
    pub fn sibling_group_for(&self, transition: &TransitionId) -> String {
        format!("{}.{}", self.path_id, transition)
    }
}

crate::builder! {
    pub struct TokenBuilder => Token {
        into {
            node_id: NodeId = "node",
            path_id: String = ROOT_PATH,
        }
        set {
            id: TokenId = TokenId::from_seq(0),
            status: TokenStatus = TokenStatus::Pending,
            branch_index: u32 = 0,
            branch_total: u32 = 1,
            created_at_ms: u64 = 0,
            updated_at_ms: u64 = 0,
        }
        option {
            parent_token_id: TokenId = None,
            fan_out_transition_id: TransitionId = None,
            sibling_group: String = None,
            foreach_item: Value = None,
            error: ErrorObject = None,
            completed_at_ms: u64 = None,
        }
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
