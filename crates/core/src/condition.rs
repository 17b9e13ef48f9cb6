// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transition condition evaluation.
//!
//! Conditions arrive as opaque strings on transitions; the Coordinator
//! evaluates them through a caller-supplied [`ConditionEvaluator`] against
//! a context view `{ "input": …, "state": …, "output": … }`. The built-in
//! [`CmpEvaluator`] covers equality comparisons and bare-path truthiness;
//! anything richer is the host's concern.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConditionError {
    #[error("unparseable condition: {0}")]
    Unparseable(String),
    #[error("invalid literal in condition: {0}")]
    InvalidLiteral(String),
}

/// Evaluates one condition expression against a context view.
///
/// Implementations must be pure: the same `(expr, ctx)` pair always yields
/// the same result, or planning loses its determinism guarantee.
pub trait ConditionEvaluator: Send + Sync {
    fn eval(&self, expr: &str, ctx: &Value) -> Result<bool, ConditionError>;
}

/// Default evaluator: `<path> == <literal>`, `<path> != <literal>`, or a
/// bare `<path>` tested for truthiness.
///
/// Literals are JSON (`true`, `42`, `"text"`, `null`); a bare word on the
/// right-hand side compares as a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct CmpEvaluator;

impl CmpEvaluator {
    fn resolve<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        crate::path::get_path(ctx, &segments)
    }

    fn parse_literal(raw: &str) -> Result<Value, ConditionError> {
        let trimmed = raw.trim();
        if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
            return Ok(v);
        }
        // Bare words compare as strings: state.mode == fast
        if trimmed.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
            return Ok(Value::String(trimmed.to_string()));
        }
        Err(ConditionError::InvalidLiteral(trimmed.to_string()))
    }

    fn truthy(v: &Value) -> bool {
        match v {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
        }
    }
}

impl ConditionEvaluator for CmpEvaluator {
    fn eval(&self, expr: &str, ctx: &Value) -> Result<bool, ConditionError> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Ok(true);
        }

        for (op, negated) in [("==", false), ("!=", true)] {
            if let Some((lhs, rhs)) = trimmed.split_once(op) {
                let path = lhs.trim();
                if path.is_empty() {
                    return Err(ConditionError::Unparseable(expr.to_string()));
                }
                let expected = Self::parse_literal(rhs)?;
                let actual = Self::resolve(ctx, path).cloned().unwrap_or(Value::Null);
                let eq = actual == expected;
                return Ok(if negated { !eq } else { eq });
            }
        }

        if trimmed.split('.').all(|seg| {
            !seg.is_empty() && seg.chars().all(|c| c.is_alphanumeric() || c == '_')
        }) {
            let value = Self::resolve(ctx, trimmed).cloned().unwrap_or(Value::Null);
            return Ok(Self::truthy(&value));
        }

        Err(ConditionError::Unparseable(expr.to_string()))
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
