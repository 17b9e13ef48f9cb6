// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Phase 1 of command application: the state-mutation executor.
//!
//! Every decision of the batch goes through one store transaction; state
//! decisions mutate, effect decisions ride along into the WAL so the
//! persisted stream is the complete plan. Any apply error aborts the
//! whole batch.

use crate::error::CoordinatorError;
use wonder_core::{Decision, TraceEvent};
use wonder_store::LocalStore;

/// Apply a planned decision batch transactionally. Returns the
/// `operation.*` trace events describing what was written.
pub fn apply_state(
    store: &mut LocalStore,
    command: &str,
    now_ms: u64,
    decisions: &[Decision],
) -> Result<Vec<TraceEvent>, CoordinatorError> {
    let mut txn = store.transaction(command, now_ms);
    for decision in decisions {
        if let Err(e) = txn.apply(decision) {
            tracing::error!(
                command,
                decision = decision.name(),
                error = %e,
                "state apply failed, aborting batch"
            );
            return Err(CoordinatorError::Apply(e));
        }
    }
    Ok(txn.commit()?)
}
