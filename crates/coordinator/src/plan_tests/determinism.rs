// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planner purity: fixed `(state, command)` in, byte-identical plan out.

use super::*;
use wonder_core::test_support::{fan_out_def, linear_def};
use wonder_core::CmpEvaluator;

fn plan_twice(state: &WorkflowState, kind: CommandKind, now: u64) -> (Plan, Plan) {
    let command = Command::new(kind, now);
    let a = plan(state, &command, &CmpEvaluator).unwrap();
    let b = plan(state, &command, &CmpEvaluator).unwrap();
    (a, b)
}

fn assert_identical(a: &Plan, b: &Plan) {
    let a_bytes = serde_json::to_string(&a.decisions).unwrap();
    let b_bytes = serde_json::to_string(&b.decisions).unwrap();
    assert_eq!(a_bytes, b_bytes);
    assert_eq!(a.trace, b.trace);
}

#[test]
fn start_plans_are_identical() {
    let ctx = Ctx::new(linear_def(&["a", "b"]));
    let (a, b) = plan_twice(
        &ctx.state,
        CommandKind::Start { trace: true, input: json!({"k": 1}) },
        1_000,
    );
    assert_identical(&a, &b);
}

#[test]
fn fan_out_plans_are_identical() {
    let mut def = fan_out_def(4, "results", None);
    def.nodes[1].output_mapping.insert("state.results".into(), "$".into());
    let mut ctx = Ctx::new(def);
    ctx.start();

    let (a, b) = plan_twice(
        &ctx.state,
        CommandKind::TaskResult { token_id: seq(0), output: json!({}) },
        2_000,
    );
    assert_identical(&a, &b);
    // Token ids come from the snapshot watermark, not a random source.
    assert!(a.decisions.iter().any(|d| matches!(
        d,
        Decision::BatchCreateTokens { tokens } if tokens[0].id == seq(1)
    )));
}

#[test]
fn full_run_replans_identically_at_every_step() {
    let mut def = fan_out_def(3, "results", Some("after"));
    def.nodes[1].output_mapping.insert("state.results".into(), "$".into());
    let mut ctx = Ctx::new(def);

    let script: Vec<CommandKind> = vec![
        CommandKind::Start { trace: true, input: json!({}) },
        CommandKind::TaskResult { token_id: seq(0), output: json!({}) },
        CommandKind::TaskResult { token_id: seq(2), output: json!({"x": 1}) },
        CommandKind::TaskResult { token_id: seq(1), output: json!({"x": 0}) },
        CommandKind::TaskResult { token_id: seq(3), output: json!({"x": 2}) },
    ];

    for kind in script {
        let (a, b) = plan_twice(&ctx.state, kind.clone(), ctx.now);
        assert_identical(&a, &b);
        ctx.send(kind);
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Arbitrary task outputs never break plan determinism.
        #[test]
        fn outputs_do_not_break_determinism(x in any::<i64>(), s in "[a-z]{0,8}") {
            let mut ctx = Ctx::new(linear_def(&["a", "b"]));
            ctx.start();
            let output = json!({"x": x, "s": s});
            let (a, b) = plan_twice(
                &ctx.state,
                CommandKind::TaskResult { token_id: seq(0), output },
                2_000,
            );
            let a_bytes = serde_json::to_string(&a.decisions).unwrap();
            let b_bytes = serde_json::to_string(&b.decisions).unwrap();
            prop_assert_eq!(a_bytes, b_bytes);
        }
    }
}
