// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log of committed decision batches.
//!
//! One JSON line per committed command. On reopen, entries above the
//! snapshot's processed sequence are replayed into the materialized
//! state; replaying a run's full stream from an empty state reproduces
//! the final state bit-exact.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use wonder_core::Decision;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("WAL IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAL entry corrupt at line {line}: {source}")]
    Corrupt {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("WAL serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One committed command: its name, enqueue timestamp, and the full
/// decision batch (state and effect phases).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub command: String,
    pub now_ms: u64,
    pub decisions: Vec<Decision>,
}

/// Append-only decision log with sequential read-back for recovery.
pub struct Wal {
    path: PathBuf,
    writer: BufWriter<File>,
    write_seq: u64,
    processed_seq: u64,
    /// Entries appended or recovered but not yet handed out by
    /// `next_unprocessed`.
    unread: VecDeque<WalEntry>,
}

impl Wal {
    /// Open the WAL, reading back any entries with `seq > processed_seq`
    /// (recovery after a crash between append and checkpoint).
    pub fn open(path: &Path, processed_seq: u64) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut write_seq = processed_seq;
        let mut unread = VecDeque::new();
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            for (idx, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let entry: WalEntry = serde_json::from_str(&line)
                    .map_err(|source| WalError::Corrupt { line: idx + 1, source })?;
                write_seq = write_seq.max(entry.seq);
                if entry.seq > processed_seq {
                    unread.push_back(entry);
                }
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            write_seq,
            processed_seq,
            unread,
        })
    }

    /// Append a committed batch; returns its sequence number.
    pub fn append(
        &mut self,
        command: &str,
        now_ms: u64,
        decisions: Vec<Decision>,
    ) -> Result<u64, WalError> {
        self.write_seq += 1;
        let entry = WalEntry {
            seq: self.write_seq,
            command: command.to_string(),
            now_ms,
            decisions,
        };
        let line = serde_json::to_string(&entry)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.unread.push_back(entry);
        Ok(self.write_seq)
    }

    pub fn flush(&mut self) -> Result<(), WalError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Next entry that has not been marked processed.
    pub fn next_unprocessed(&mut self) -> Result<Option<WalEntry>, WalError> {
        Ok(self.unread.pop_front())
    }

    pub fn mark_processed(&mut self, seq: u64) {
        self.processed_seq = self.processed_seq.max(seq);
        let processed = self.processed_seq;
        self.unread.retain(|e| e.seq > processed);
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
