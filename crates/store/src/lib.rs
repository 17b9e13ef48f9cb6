// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wonder-store: the Coordinator's private, per-run local store.
//!
//! One store per workflow run: a decision WAL plus the materialized
//! [`RunState`] tables (tokens, fan-ins, context sections, branch tables,
//! sub-workflow records, pending dispatches, workflow status). Command
//! processing mutates state only through [`LocalStore::transaction`],
//! which applies a decision batch to a scratch copy and swaps it in on
//! commit; an aborted batch leaves no trace.

mod checkpoint;
mod snapshot;
mod state;
mod txn;
mod wal;

pub use checkpoint::{load_snapshot, Checkpointer, CheckpointResult};
pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::{fan_in_key, ApplyError, ContextSections, FanInRecord, RunState};
pub use txn::Txn;
pub use wal::{Wal, WalEntry, WalError};

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("apply error: {0}")]
    Apply(#[from] ApplyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The embedded per-run store: materialized state plus its WAL.
pub struct LocalStore {
    dir: PathBuf,
    state: RunState,
    wal: Wal,
    snapshot_path: PathBuf,
}

impl LocalStore {
    /// Open (or create) the store under `dir`, recovering state from the
    /// latest snapshot plus WAL tail replay.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let snapshot_path = dir.join("snapshot.bin");
        let wal_path = dir.join("decisions.wal");

        let (mut state, processed_seq) = match load_snapshot(&snapshot_path)? {
            Some(snapshot) => (snapshot.state, snapshot.seq),
            None => (RunState::default(), 0),
        };

        let mut wal = Wal::open(&wal_path, processed_seq)?;
        let mut replayed = 0usize;
        while let Some(entry) = wal.next_unprocessed()? {
            for decision in &entry.decisions {
                // Replay of a committed batch cannot fail; a failure here
                // means the WAL and snapshot disagree.
                state.apply(decision, entry.now_ms).map_err(StoreError::Apply)?;
            }
            wal.mark_processed(entry.seq);
            replayed += 1;
        }
        if replayed > 0 {
            tracing::info!(replayed, dir = %dir.display(), "recovered state from WAL tail");
        }

        Ok(Self { dir, state, wal, snapshot_path })
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Begin a decision batch for one command.
    pub fn transaction(&mut self, command: &str, now_ms: u64) -> Txn<'_> {
        Txn::new(self, command, now_ms)
    }

    /// Write a snapshot at the current WAL position.
    pub fn checkpoint(&mut self) -> Result<CheckpointResult, StoreError> {
        self.wal.flush()?;
        let checkpointer = Checkpointer::new(self.snapshot_path.clone());
        let result = checkpointer.checkpoint_sync(self.wal.processed_seq(), &self.state)?;
        Ok(result)
    }

    /// Flush buffered WAL writes.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.wal.flush()?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Delete the store directory. Called once the run is terminal and
    /// all parents have been notified.
    pub fn destroy(self) -> Result<(), StoreError> {
        drop(self.wal);
        std::fs::remove_dir_all(&self.dir)?;
        Ok(())
    }

    pub(crate) fn parts(&mut self) -> (&RunState, &mut Wal) {
        (&self.state, &mut self.wal)
    }

    pub(crate) fn replace_state(&mut self, state: RunState) {
        self.state = state;
    }
}
