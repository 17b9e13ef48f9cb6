// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator-level errors.
//!
//! Business failures are never surfaced here; planning expresses those
//! as decisions. These errors are infrastructure (store, adapters) or
//! programming errors (planning/apply inconsistencies).

use crate::plan::PlanError;
use thiserror::Error;
use wonder_store::{ApplyError, StoreError};

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("apply error: {0}")]
    Apply(#[from] ApplyError),

    #[error("planning error: {0}")]
    Plan(#[from] PlanError),

    #[error("resources error: {0}")]
    Resources(String),

    #[error("definition not found: {0} v{1:?}")]
    DefinitionNotFound(wonder_core::DefId, Option<u32>),

    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    #[error("command queue closed")]
    QueueClosed,
}
