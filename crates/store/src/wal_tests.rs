// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;
use wonder_core::{CommandKind, Decision};

fn test_decisions(at_ms: u64) -> Vec<Decision> {
    vec![Decision::ScheduleAlarm { at_ms }]
}

#[test]
fn open_creates_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("decisions.wal");

    let wal = Wal::open(&path, 0).unwrap();

    assert!(path.exists());
    assert_eq!(wal.write_seq(), 0);
    assert_eq!(wal.processed_seq(), 0);
}

#[test]
fn append_and_flush() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("decisions.wal");

    let mut wal = Wal::open(&path, 0).unwrap();

    let seq1 = wal.append("start", 1, test_decisions(1)).unwrap();
    let seq2 = wal.append("task_result", 2, test_decisions(2)).unwrap();

    assert_eq!(seq1, 1);
    assert_eq!(seq2, 2);

    wal.flush().unwrap();

    let metadata = std::fs::metadata(&path).unwrap();
    assert!(metadata.len() > 0);
}

#[test]
fn next_unprocessed_returns_in_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("decisions.wal");

    let mut wal = Wal::open(&path, 0).unwrap();

    wal.append("start", 1, test_decisions(1)).unwrap();
    wal.append("alarm", 2, test_decisions(2)).unwrap();

    let entry1 = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(entry1.seq, 1);
    assert_eq!(entry1.command, "start");

    let entry2 = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(entry2.seq, 2);
    assert_eq!(entry2.command, "alarm");

    assert!(wal.next_unprocessed().unwrap().is_none());
}

#[test]
fn mark_processed_advances_and_drops() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("decisions.wal");

    let mut wal = Wal::open(&path, 0).unwrap();

    wal.append("start", 1, test_decisions(1)).unwrap();
    wal.append("alarm", 2, test_decisions(2)).unwrap();
    wal.flush().unwrap();

    wal.mark_processed(2);

    assert_eq!(wal.processed_seq(), 2);
    assert!(wal.next_unprocessed().unwrap().is_none());
}

#[test]
fn reopen_with_processed_seq_skips_processed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("decisions.wal");

    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append("start", 1, test_decisions(1)).unwrap();
        wal.append("task_result", 2, test_decisions(2)).unwrap();
        wal.append("alarm", 3, test_decisions(3)).unwrap();
        wal.flush().unwrap();
    }

    // Reopen with processed_seq=2 (simulating recovery from snapshot)
    let mut wal = Wal::open(&path, 2).unwrap();

    let entry = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(entry.seq, 3);
    assert_eq!(entry.command, "alarm");
    assert!(wal.next_unprocessed().unwrap().is_none());
    assert_eq!(wal.write_seq(), 3);
}

#[test]
fn reopen_continues_sequence() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("decisions.wal");

    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append("start", 1, test_decisions(1)).unwrap();
        wal.flush().unwrap();
    }

    let mut wal = Wal::open(&path, 1).unwrap();
    let seq = wal.append("alarm", 2, test_decisions(2)).unwrap();
    assert_eq!(seq, 2);
}

#[test]
fn corrupt_line_is_reported_with_position() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("decisions.wal");

    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append("start", 1, test_decisions(1)).unwrap();
        wal.flush().unwrap();
    }
    use std::io::Write as _;
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    writeln!(file, "{{not json").unwrap();

    match Wal::open(&path, 0) {
        Err(WalError::Corrupt { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected corrupt error, got {:?}", other.map(|w| w.write_seq())),
    }
}

#[test]
fn entries_preserve_decisions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("decisions.wal");

    let decisions = vec![
        Decision::EnqueueCommandSelf { command: CommandKind::Alarm },
        Decision::ScheduleAlarm { at_ms: 7 },
    ];

    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append("alarm", 7, decisions.clone()).unwrap();
        wal.flush().unwrap();
    }

    let mut wal = Wal::open(&path, 0).unwrap();
    let entry = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(entry.decisions, decisions);
    assert_eq!(entry.now_ms, 7);
}
