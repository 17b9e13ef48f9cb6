// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapters::BufferSink;
use wonder_core::TraceEvent;

fn emitter(enabled: bool) -> (Arc<BufferSink>, TraceEmitter<BufferSink>) {
    let sink = Arc::new(BufferSink::new());
    let emitter = TraceEmitter::new(Arc::clone(&sink), RunId::from_string("run-test"), enabled);
    (sink, emitter)
}

#[tokio::test]
async fn emits_with_monotonic_seq_and_run_id() {
    let (sink, mut emitter) = emitter(true);

    emitter.emit(TraceEvent::dispatch("batch.start", 1));
    emitter.emit(TraceEvent::dispatch("batch.complete", 2));
    emitter.flush().await;

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].seq, 1);
    assert_eq!(events[1].seq, 2);
    assert!(events.iter().all(|e| e.run_id == "run-test"));
}

#[tokio::test]
async fn disabled_emitter_drops_events() {
    let (sink, mut emitter) = emitter(false);
    emitter.emit(TraceEvent::dispatch("batch.start", 1));
    emitter.flush().await;
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn seq_continues_across_flushes() {
    let (sink, mut emitter) = emitter(true);

    emitter.emit(TraceEvent::dispatch("batch.start", 1));
    emitter.flush().await;
    emitter.emit(TraceEvent::dispatch("batch.complete", 2));
    emitter.flush().await;

    let events = sink.events();
    assert_eq!(events[1].seq, 2);
}

#[tokio::test]
async fn large_batches_flush_in_chunks() {
    let (sink, mut emitter) = emitter(true);
    for i in 0..150u64 {
        emitter.emit(TraceEvent::operation("tokens.created", i));
    }
    emitter.flush().await;
    assert_eq!(sink.events().len(), 150);
    assert_eq!(emitter.buffered(), 0);
}
