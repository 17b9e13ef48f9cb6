// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Merge strategies for fan-in synchronization.
//!
//! A merge combines the isolated branch outputs of one sibling group into
//! a single value written to the merge target path. Branches are always
//! combined in ascending `branch_index` order regardless of arrival order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Ordered array `[branch_0, branch_1, …]`.
    Append,
    /// Shallow object merge in branch order; later branches overwrite.
    MergeObject,
    /// Object keyed by stringified branch index.
    KeyedByBranch,
    /// Value of the highest-index completed branch.
    LastWins,
}

crate::simple_display! {
    MergeStrategy {
        Append => "append",
        MergeObject => "merge_object",
        KeyedByBranch => "keyed_by_branch",
        LastWins => "last_wins",
    }
}

/// Combine branch outputs. `branches` is `(branch_index, output)` pairs in
/// any order; missing branches (quorum/timeout merges) are simply absent.
pub fn merge_branches(strategy: MergeStrategy, branches: &[(u32, Value)]) -> Value {
    let mut ordered: Vec<(u32, &Value)> =
        branches.iter().map(|(i, v)| (*i, v)).collect();
    ordered.sort_by_key(|(i, _)| *i);

    match strategy {
        MergeStrategy::Append => {
            Value::Array(ordered.into_iter().map(|(_, v)| v.clone()).collect())
        }
        MergeStrategy::MergeObject => {
            let mut merged = serde_json::Map::new();
            for (_, v) in ordered {
                if let Some(obj) = v.as_object() {
                    for (k, val) in obj {
                        merged.insert(k.clone(), val.clone());
                    }
                }
            }
            Value::Object(merged)
        }
        MergeStrategy::KeyedByBranch => {
            let mut keyed = serde_json::Map::new();
            for (i, v) in ordered {
                keyed.insert(i.to_string(), v.clone());
            }
            Value::Object(keyed)
        }
        MergeStrategy::LastWins => {
            ordered.last().map(|(_, v)| (*v).clone()).unwrap_or(Value::Null)
        }
    }
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
