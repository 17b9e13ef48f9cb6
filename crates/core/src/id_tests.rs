// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn run_id_has_prefix_and_fixed_length() {
    let id = RunId::new();
    assert!(id.as_str().starts_with("run-"));
    assert_eq!(id.as_str().len(), ID_MAX_LEN);
}

#[test]
fn run_id_suffix_strips_prefix() {
    let id = RunId::from_string("run-abc123");
    assert_eq!(id.suffix(), "abc123");
    assert_eq!(id.short(3), "abc");
}

#[test]
fn derive_child_is_deterministic() {
    let parent = RunId::from_string("run-parent0000000000000");
    let a = RunId::derive_child(&parent, TokenId::from_seq(4));
    let b = RunId::derive_child(&parent, TokenId::from_seq(4));
    let c = RunId::derive_child(&parent, TokenId::from_seq(5));
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert!(a.as_str().starts_with("run-"));
    assert_eq!(a.as_str().len(), ID_MAX_LEN);
}

#[parameterized(
    zero = { 0, "tok-0" },
    one = { 1, "tok-1" },
    large = { 4211, "tok-4211" },
)]
fn token_id_from_seq(seq: u64, expected: &str) {
    assert_eq!(TokenId::from_seq(seq).as_str(), expected);
}

#[test]
fn token_id_compares_with_str() {
    let id = TokenId::from_seq(7);
    assert_eq!(id, "tok-7");
}

#[test]
fn node_ids_are_arbitrary_strings() {
    let long = NodeId::new("a-node-id-well-beyond-the-inline-buffer-capacity");
    assert_eq!(long.as_str(), "a-node-id-well-beyond-the-inline-buffer-capacity");
}

#[test]
fn id_buf_round_trips_serde() {
    let id = TokenId::from_seq(42);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"tok-42\"");
    let back: TokenId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn short_truncates() {
    assert_eq!(short("abcdef", 3), "abc");
    assert_eq!(short("ab", 3), "ab");
}
