// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trace-event buffering and batched flush to the events sink.

use crate::adapters::EventSink;
use std::sync::Arc;
use wonder_core::{RunId, TraceEvent};

const FLUSH_BATCH: usize = 64;

/// Buffers trace events for one run, stamping the run id and the
/// run-monotonic sequence, and flushes them to the sink in batches.
pub struct TraceEmitter<S> {
    sink: Arc<S>,
    run_id: RunId,
    enabled: bool,
    seq: u64,
    buf: Vec<TraceEvent>,
}

impl<S: EventSink> TraceEmitter<S> {
    pub fn new(sink: Arc<S>, run_id: RunId, enabled: bool) -> Self {
        Self { sink, run_id, enabled, seq: 0, buf: Vec::new() }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Stamp and buffer one event.
    pub fn emit(&mut self, mut event: TraceEvent) {
        if !self.enabled {
            return;
        }
        self.seq += 1;
        event.seq = self.seq;
        event.run_id = self.run_id;
        self.buf.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = TraceEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Flush buffered events to the sink. Sink failures are logged and
    /// dropped; observability must never fail a run.
    pub async fn flush(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.buf);
        for chunk in events.chunks(FLUSH_BATCH) {
            if let Err(e) = self.sink.append(chunk.to_vec()).await {
                tracing::warn!(run_id = %self.run_id, error = %e, "trace flush failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
