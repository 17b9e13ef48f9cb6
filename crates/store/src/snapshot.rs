// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned, compressed snapshots of the materialized run state.
//!
//! A snapshot pins the WAL sequence it reflects; recovery loads the
//! snapshot and replays only the WAL tail above that sequence.

use crate::state::RunState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("unsupported snapshot version {found} (current {current})")]
    UnsupportedVersion { found: u32, current: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// WAL sequence this snapshot reflects.
    pub seq: u64,
    /// RFC 3339 timestamp of when the snapshot was taken.
    pub taken_at: String,
    pub state: RunState,
}

impl Snapshot {
    pub fn new(seq: u64, state: RunState) -> Self {
        Self {
            version: CURRENT_SNAPSHOT_VERSION,
            seq,
            taken_at: chrono::Utc::now().to_rfc3339(),
            state,
        }
    }

    /// Serialize and zstd-compress.
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        let json = serde_json::to_vec(self)?;
        Ok(zstd::encode_all(json.as_slice(), ZSTD_LEVEL)?)
    }

    /// Decompress and deserialize, rejecting unknown versions.
    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let json = zstd::decode_all(bytes)?;
        let snapshot: Snapshot = serde_json::from_slice(&json)?;
        if snapshot.version > CURRENT_SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                current: CURRENT_SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
