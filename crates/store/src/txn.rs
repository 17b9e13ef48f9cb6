// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decision-batch transactions over the local store.
//!
//! A transaction applies state decisions to a scratch copy of the run
//! state. `commit` appends the whole batch (state and effect phases) to
//! the WAL, flushes, and swaps the scratch in; dropping the transaction
//! without committing discards every change.

use crate::state::{ApplyError, RunState};
use crate::{LocalStore, StoreError};
use wonder_core::{Decision, Phase, TraceEvent};

pub struct Txn<'a> {
    store: &'a mut LocalStore,
    command: String,
    now_ms: u64,
    scratch: RunState,
    decisions: Vec<Decision>,
    trace: Vec<TraceEvent>,
}

impl<'a> Txn<'a> {
    pub(crate) fn new(store: &'a mut LocalStore, command: &str, now_ms: u64) -> Self {
        let scratch = store.state().clone();
        Self {
            store,
            command: command.to_string(),
            now_ms,
            scratch,
            decisions: Vec::new(),
            trace: Vec::new(),
        }
    }

    /// Apply one state decision to the scratch state and record it for
    /// the batch. Effect decisions are recorded without touching state.
    pub fn apply(&mut self, decision: &Decision) -> Result<(), ApplyError> {
        if decision.phase() == Phase::State {
            let trace = self.scratch.apply(decision, self.now_ms)?;
            self.trace.extend(trace);
        }
        self.decisions.push(decision.clone());
        Ok(())
    }

    /// Current scratch view (reflects decisions applied so far).
    pub fn state(&self) -> &RunState {
        &self.scratch
    }

    /// Commit: append the batch to the WAL, flush, and publish the
    /// scratch state. Returns the `operation.*` trace events.
    pub fn commit(self) -> Result<Vec<TraceEvent>, StoreError> {
        let Txn { store, command, now_ms, scratch, decisions, trace } = self;
        if decisions.is_empty() {
            return Ok(trace);
        }
        let (_, wal) = store.parts();
        let seq = wal.append(&command, now_ms, decisions)?;
        wal.flush()?;
        wal.mark_processed(seq);
        store.replace_state(scratch);
        Ok(trace)
    }
}

#[cfg(test)]
#[path = "txn_tests.rs"]
mod tests;
