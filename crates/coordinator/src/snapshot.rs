// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The immutable planning snapshot.
//!
//! Loaded once per command: a value-typed copy of the run state plus the
//! resolved definition and the coordinator's boot identity (used by
//! `Start` before the store carries any meta). Planning never reads back
//! into the store; the snapshot is the whole world.

use std::sync::Arc;
use wonder_core::{RunMeta, WorkflowDef};
use wonder_store::{LocalStore, RunState};

#[derive(Clone)]
pub struct WorkflowState {
    pub run: RunState,
    pub def: Arc<WorkflowDef>,
    /// The run identity this coordinator was constructed with.
    pub boot: RunMeta,
}

impl WorkflowState {
    /// Snapshot the store against a resolved definition.
    pub fn load(store: &LocalStore, def: Arc<WorkflowDef>, boot: RunMeta) -> Self {
        Self { run: store.state().clone(), def, boot }
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn from_parts(run: RunState, def: Arc<WorkflowDef>, boot: RunMeta) -> Self {
        Self { run, def, boot }
    }
}
