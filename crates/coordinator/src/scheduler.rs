// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The run's alarm slot.
//!
//! A run has at most one pending alarm; `SCHEDULE_ALARM` replaces it.
//! The dispatcher loop sleeps until the deadline and feeds an `Alarm`
//! command back into the queue when it fires.

/// Single-slot alarm scheduler.
#[derive(Debug, Default)]
pub struct Scheduler {
    at_ms: Option<u64>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the alarm. Replaces any pending deadline.
    pub fn set(&mut self, at_ms: u64) {
        self.at_ms = Some(at_ms);
    }

    pub fn clear(&mut self) {
        self.at_ms = None;
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.at_ms
    }

    /// Consume the alarm if its deadline has passed.
    pub fn take_due(&mut self, now_ms: u64) -> bool {
        match self.at_ms {
            Some(at) if at <= now_ms => {
                self.at_ms = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
