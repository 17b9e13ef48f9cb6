// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-coordinator configuration. There is no process-global state:
//! everything a run needs is passed in at construction.

use std::path::PathBuf;
use std::time::Duration;

/// Bounded retry for external effects.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_millis(50) }
    }
}

impl RetryPolicy {
    /// Exponential backoff delay before attempt `attempt` (1-based; no
    /// delay before the first attempt).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            Duration::ZERO
        } else {
            self.base_delay * 2u32.saturating_pow(attempt - 2)
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Directory for this run's local store.
    pub store_dir: PathBuf,
    /// Emit trace events to the event sink.
    pub trace_enabled: bool,
    /// Keep the store directory after the run reaches a terminal state
    /// (replay debugging). Default: delete it.
    pub retain_store: bool,
    pub effect_retry: RetryPolicy,
    /// Definition-cache capacity.
    pub def_cache_capacity: usize,
    /// Command-queue depth.
    pub queue_depth: usize,
}

impl CoordinatorConfig {
    pub fn new(store_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: store_dir.into(),
            trace_enabled: true,
            retain_store: false,
            effect_retry: RetryPolicy::default(),
            def_cache_capacity: 64,
            queue_depth: 256,
        }
    }

    wonder_core::setters! {
        set {
            trace_enabled: bool,
            retain_store: bool,
            effect_retry: RetryPolicy,
            def_cache_capacity: usize,
        }
    }
}
