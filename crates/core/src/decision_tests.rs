// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::token::Token;
use serde_json::json;

fn sample_state_decisions() -> Vec<Decision> {
    vec![
        Decision::CreateToken { token: Token::builder().build() },
        Decision::UpdateTokenStatus {
            token_id: TokenId::from_seq(0),
            status: TokenStatus::Dispatched,
            error: None,
        },
        Decision::SetContextField {
            write: ContextWrite {
                path: ContextPath::parse("state.x").unwrap(),
                value: json!(1),
            },
        },
        Decision::TryCreateFanIn {
            sibling_group: "0.split".into(),
            fan_in_node_id: NodeId::new("branch"),
            wait_for: WaitFor::All,
            total: 3,
            deadline_at_ms: None,
        },
    ]
}

fn sample_effect_decisions() -> Vec<Decision> {
    vec![
        Decision::DispatchToken {
            token_id: TokenId::from_seq(0),
            node_id: NodeId::new("a"),
            action_id: "action.a".into(),
            input: json!({}),
            timeout_ms: None,
        },
        Decision::ScheduleAlarm { at_ms: 99 },
        Decision::EnqueueCommandSelf { command: CommandKind::Alarm },
        Decision::UpdateResourcesStatus {
            status: RunStatus::Completed,
            output: Some(json!({})),
            error: None,
        },
    ]
}

#[test]
fn state_decisions_are_phase_one() {
    for d in sample_state_decisions() {
        assert_eq!(d.phase(), Phase::State, "{}", d.name());
        assert!(!d.is_effect());
    }
}

#[test]
fn effect_decisions_are_phase_two() {
    for d in sample_effect_decisions() {
        assert_eq!(d.phase(), Phase::Effect, "{}", d.name());
        assert!(d.is_effect());
    }
}

#[test]
fn fields_cover_identifying_context() {
    let d = Decision::DispatchToken {
        token_id: TokenId::from_seq(4),
        node_id: NodeId::new("review"),
        action_id: "action.review".into(),
        input: json!({"q": 1}),
        timeout_ms: None,
    };
    let fields = d.fields();
    assert!(fields.contains(&("token_id", "tok-4".to_string())));
    assert!(fields.contains(&("node_id", "review".to_string())));
}

#[test]
fn serde_round_trip_preserves_decisions() {
    let all: Vec<Decision> = sample_state_decisions()
        .into_iter()
        .chain(sample_effect_decisions())
        .collect();
    let json = serde_json::to_string(&all).unwrap();
    let back: Vec<Decision> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, all);
}

#[test]
fn tagged_serialization_uses_snake_case() {
    let d = Decision::ScheduleAlarm { at_ms: 10 };
    let v = serde_json::to_value(&d).unwrap();
    assert_eq!(v["type"], "schedule_alarm");
}
