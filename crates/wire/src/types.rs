// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol DTOs.

use serde::{Deserialize, Serialize};
use wonder_core::{DefId, RunId, RunStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefSummary {
    pub id: DefId,
    pub name: String,
    pub version: u32,
    pub nodes: usize,
    pub transitions: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Added,
    Removed,
    Changed,
}

wonder_core::simple_display! {
    DiffKind {
        Added => "added",
        Removed => "removed",
        Changed => "changed",
    }
}

/// One difference between a local definition and the deployed one,
/// keyed by graph element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiffEntry {
    pub kind: DiffKind,
    /// `node:<id>`, `transition:<id>`, or a top-level field name.
    pub element: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub run_id: RunId,
    pub definition_id: DefId,
    pub status: RunStatus,
}
