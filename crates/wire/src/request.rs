// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use wonder_core::{DefId, WorkflowDef};

/// Request from CLI to the resources service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Publish a workflow definition; the service assigns the next
    /// version.
    Deploy { def: Box<WorkflowDef> },

    /// Fetch a definition (latest version when `version` is absent)
    Pull {
        id: DefId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<u32>,
    },

    /// Compare a local definition against the deployed version
    Diff { def: Box<WorkflowDef> },

    /// List deployed definitions
    ListDefs,

    /// Service status
    Status,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
