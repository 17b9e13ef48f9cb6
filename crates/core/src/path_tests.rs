// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    input = { "input.x", Section::Input, &["x"] },
    state_nested = { "state.a.b", Section::State, &["a", "b"] },
    output_root = { "output", Section::Output, &[] },
)]
fn parse_valid(path: &str, section: Section, segments: &[&str]) {
    let parsed = ContextPath::parse(path).unwrap();
    assert_eq!(parsed.section, section);
    assert_eq!(parsed.segments, segments);
}

#[parameterized(
    empty = { "" },
    bad_section = { "vars.x" },
    empty_segment = { "state..x" },
    trailing_dot = { "state.x." },
)]
fn parse_invalid(path: &str) {
    assert!(ContextPath::parse(path).is_err());
}

#[test]
fn display_round_trips() {
    let p = ContextPath::parse("state.results.best").unwrap();
    assert_eq!(p.to_string(), "state.results.best");
    let json = serde_json::to_string(&p).unwrap();
    assert_eq!(json, "\"state.results.best\"");
    let back: ContextPath = serde_json::from_str(&json).unwrap();
    assert_eq!(back, p);
}

#[test]
fn covers_descendants() {
    let parent = ContextPath::parse("state.results").unwrap();
    let child = ContextPath::parse("state.results.0").unwrap();
    let other = ContextPath::parse("state.other").unwrap();
    assert!(parent.covers(&child));
    assert!(parent.covers(&parent));
    assert!(!parent.covers(&other));
    assert!(!child.covers(&parent));
}

#[test]
fn set_path_creates_intermediates() {
    let mut root = json!({});
    set_path(
        &mut root,
        &["a".to_string(), "b".to_string(), "c".to_string()],
        json!(7),
    );
    assert_eq!(root, json!({"a": {"b": {"c": 7}}}));
}

#[test]
fn set_path_replaces_scalars_on_the_way() {
    let mut root = json!({"a": 1});
    set_path(&mut root, &["a".to_string(), "b".to_string()], json!(true));
    assert_eq!(root, json!({"a": {"b": true}}));
}

#[test]
fn set_path_empty_segments_replaces_root() {
    let mut root = json!({"x": 1});
    set_path(&mut root, &[], json!([1, 2]));
    assert_eq!(root, json!([1, 2]));
}

#[test]
fn get_path_reads_nested() {
    let root = json!({"a": {"b": {"c": "deep"}}});
    let v = get_path(&root, &["a".to_string(), "b".to_string(), "c".to_string()]);
    assert_eq!(v, Some(&json!("deep")));
    assert_eq!(get_path(&root, &["a".to_string(), "missing".to_string()]), None);
}

#[parameterized(
    whole_dollar = { "$" },
    whole_empty = { "" },
)]
fn get_source_whole_output(path: &str) {
    let out = json!({"x": 1});
    assert_eq!(get_source(&out, path), Some(&out));
}

#[test]
fn get_source_with_and_without_prefix() {
    let out = json!({"score": {"value": 9}});
    assert_eq!(get_source(&out, "$.score.value"), Some(&json!(9)));
    assert_eq!(get_source(&out, "score.value"), Some(&json!(9)));
    assert_eq!(get_source(&out, "$.missing"), None);
}
