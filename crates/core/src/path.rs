// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dotted context paths into the run's input/state/output sections.
//!
//! Mappings in workflow definitions address context as `state.results.best`
//! and task output as `$.score` (the `$.` prefix is optional). Paths are
//! parsed once at use and resolved with pure get/set helpers over
//! `serde_json::Value`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The three logical context sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Input,
    State,
    Output,
}

crate::simple_display! {
    Section {
        Input => "input",
        State => "state",
        Output => "output",
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("empty context path")]
    Empty,
    #[error("unknown context section: {0}")]
    UnknownSection(String),
    #[error("context path has empty segment: {0}")]
    EmptySegment(String),
}

/// A parsed context path: section plus object segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContextPath {
    pub section: Section,
    pub segments: Vec<String>,
}

impl ContextPath {
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        let mut parts = s.split('.');
        let section = match parts.next() {
            Some("input") => Section::Input,
            Some("state") => Section::State,
            Some("output") => Section::Output,
            Some(other) => return Err(PathError::UnknownSection(other.to_string())),
            None => return Err(PathError::Empty),
        };
        let segments: Vec<String> = parts.map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(PathError::EmptySegment(s.to_string()));
        }
        Ok(Self { section, segments })
    }

    /// Path addressing a whole section.
    pub fn section_root(section: Section) -> Self {
        Self { section, segments: Vec::new() }
    }

    /// Whether `other` addresses this path or a descendant of it.
    pub fn covers(&self, other: &ContextPath) -> bool {
        self.section == other.section
            && other.segments.len() >= self.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }
}

impl std::fmt::Display for ContextPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.section)?;
        for seg in &self.segments {
            write!(f, ".{}", seg)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for ContextPath {
    type Error = PathError;

    fn try_from(s: String) -> Result<Self, PathError> {
        ContextPath::parse(&s)
    }
}

impl From<ContextPath> for String {
    fn from(p: ContextPath) -> String {
        p.to_string()
    }
}

/// Read a nested value by object segments. Empty segments = the root.
pub fn get_path<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut cur = root;
    for seg in segments {
        cur = cur.as_object()?.get(seg)?;
    }
    Some(cur)
}

/// Write a nested value by object segments, creating intermediate objects.
/// Empty segments replace the root.
pub fn set_path(root: &mut Value, segments: &[String], value: Value) {
    if segments.is_empty() {
        *root = value;
        return;
    }
    if !root.is_object() {
        *root = Value::Object(serde_json::Map::new());
    }
    let mut cur = root;
    for seg in &segments[..segments.len() - 1] {
        let map = match cur.as_object_mut() {
            Some(m) => m,
            None => return,
        };
        let entry = map
            .entry(seg.clone())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(serde_json::Map::new());
        }
        cur = entry;
    }
    if let Some(map) = cur.as_object_mut() {
        if let Some(last) = segments.last() {
            map.insert(last.clone(), value);
        }
    }
}

/// Resolve a task-output source path: `$` (or empty) is the whole output,
/// `$.a.b` and `a.b` address into it.
pub fn get_source<'a>(output: &'a Value, path: &str) -> Option<&'a Value> {
    let trimmed = path.strip_prefix("$.").unwrap_or(path);
    if trimmed.is_empty() || trimmed == "$" {
        return Some(output);
    }
    let segments: Vec<String> = trimmed.split('.').map(str::to_string).collect();
    get_path(output, &segments)
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
