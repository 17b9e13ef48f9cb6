// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn alarm_lifecycle() {
    let mut scheduler = Scheduler::new();
    assert_eq!(scheduler.next_deadline(), None);

    scheduler.set(1_500);
    assert_eq!(scheduler.next_deadline(), Some(1_500));

    // Not due yet
    assert!(!scheduler.take_due(1_000));
    assert_eq!(scheduler.next_deadline(), Some(1_500));

    // Fires once, then empty
    assert!(scheduler.take_due(1_500));
    assert!(!scheduler.take_due(2_000));
    assert_eq!(scheduler.next_deadline(), None);
}

#[test]
fn set_replaces_pending_deadline() {
    let mut scheduler = Scheduler::new();
    scheduler.set(5_000);
    scheduler.set(1_000);
    assert_eq!(scheduler.next_deadline(), Some(1_000));
    assert!(scheduler.take_due(1_000));
}

#[test]
fn clear_disarms() {
    let mut scheduler = Scheduler::new();
    scheduler.set(1_000);
    scheduler.clear();
    assert!(!scheduler.take_due(9_999));
}
