// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

fn ctx() -> Value {
    json!({
        "input": {"count": 3},
        "state": {"approved": true, "mode": "fast", "score": 0, "items": [1]},
        "output": {"error": {"code": "boom"}},
    })
}

#[parameterized(
    eq_bool_true = { "state.approved == true", true },
    eq_bool_false = { "state.approved == false", false },
    eq_string_quoted = { "state.mode == \"fast\"", true },
    eq_string_bare = { "state.mode == fast", true },
    ne = { "state.mode != slow", true },
    eq_number = { "input.count == 3", true },
    eq_missing_is_null = { "state.missing == null", true },
    nested = { "output.error.code == boom", true },
)]
fn comparisons(expr: &str, expected: bool) {
    assert_eq!(CmpEvaluator.eval(expr, &ctx()).unwrap(), expected);
}

#[parameterized(
    truthy_bool = { "state.approved", true },
    falsy_zero = { "state.score", false },
    truthy_array = { "state.items", true },
    missing = { "state.nope", false },
)]
fn truthiness(expr: &str, expected: bool) {
    assert_eq!(CmpEvaluator.eval(expr, &ctx()).unwrap(), expected);
}

#[test]
fn empty_condition_is_true() {
    assert!(CmpEvaluator.eval("", &ctx()).unwrap());
    assert!(CmpEvaluator.eval("   ", &ctx()).unwrap());
}

#[test]
fn unparseable_is_an_error() {
    assert!(matches!(
        CmpEvaluator.eval("state.x > 3", &ctx()),
        Err(ConditionError::Unparseable(_))
    ));
    assert!(matches!(
        CmpEvaluator.eval("== true", &ctx()),
        Err(ConditionError::Unparseable(_))
    ));
}

#[test]
fn same_inputs_same_result() {
    let c = ctx();
    let a = CmpEvaluator.eval("state.approved == true", &c).unwrap();
    let b = CmpEvaluator.eval("state.approved == true", &c).unwrap();
    assert_eq!(a, b);
}
