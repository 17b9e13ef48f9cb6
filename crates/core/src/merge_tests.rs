// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn branches() -> Vec<(u32, Value)> {
    // Deliberately out of arrival order
    vec![
        (2, json!({"x": 2})),
        (0, json!({"x": 0})),
        (1, json!({"x": 1})),
    ]
}

#[test]
fn append_orders_by_branch_index() {
    let merged = merge_branches(MergeStrategy::Append, &branches());
    assert_eq!(merged, json!([{"x": 0}, {"x": 1}, {"x": 2}]));
}

#[test]
fn append_with_gaps_keeps_present_branches() {
    let merged = merge_branches(
        MergeStrategy::Append,
        &[(4, json!("e")), (0, json!("a")), (2, json!("c"))],
    );
    assert_eq!(merged, json!(["a", "c", "e"]));
}

#[test]
fn merge_object_later_overwrites() {
    let merged = merge_branches(
        MergeStrategy::MergeObject,
        &[
            (1, json!({"b": "one", "shared": "one"})),
            (0, json!({"a": "zero", "shared": "zero"})),
        ],
    );
    assert_eq!(merged, json!({"a": "zero", "b": "one", "shared": "one"}));
}

#[test]
fn merge_object_skips_non_objects() {
    let merged = merge_branches(
        MergeStrategy::MergeObject,
        &[(0, json!(3)), (1, json!({"k": true}))],
    );
    assert_eq!(merged, json!({"k": true}));
}

#[test]
fn keyed_by_branch_uses_string_keys() {
    let merged = merge_branches(MergeStrategy::KeyedByBranch, &branches());
    assert_eq!(merged, json!({"0": {"x": 0}, "1": {"x": 1}, "2": {"x": 2}}));
}

#[test]
fn last_wins_takes_highest_index() {
    let merged = merge_branches(MergeStrategy::LastWins, &branches());
    assert_eq!(merged, json!({"x": 2}));
}

#[test]
fn last_wins_over_empty_is_null() {
    assert_eq!(merge_branches(MergeStrategy::LastWins, &[]), Value::Null);
}
