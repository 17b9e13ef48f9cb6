// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic snapshot persistence: write to a temp file, then rename.

use crate::snapshot::{Snapshot, SnapshotError};
use crate::state::RunState;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy)]
pub struct CheckpointResult {
    pub seq: u64,
    pub size_bytes: u64,
}

pub struct Checkpointer {
    path: PathBuf,
}

impl Checkpointer {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Write a snapshot of `state` at WAL sequence `seq`.
    pub fn checkpoint_sync(
        &self,
        seq: u64,
        state: &RunState,
    ) -> Result<CheckpointResult, SnapshotError> {
        let snapshot = Snapshot::new(seq, state.clone());
        let bytes = snapshot.encode()?;
        let size_bytes = bytes.len() as u64;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, &self.path)?;

        tracing::debug!(seq, size_bytes, path = %self.path.display(), "snapshot written");
        Ok(CheckpointResult { seq, size_bytes })
    }
}

/// Load the snapshot at `path`, if one exists.
pub fn load_snapshot(path: &std::path::Path) -> Result<Option<Snapshot>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path)?;
    Ok(Some(Snapshot::decode(&bytes)?))
}
