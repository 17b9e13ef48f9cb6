// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wonder-core: Domain types for the Wonder workflow Coordinator

pub mod macros;

pub mod clock;
pub mod command;
pub mod condition;
pub mod decision;
pub mod definition;
pub mod error;
pub mod id;
pub mod merge;
pub mod path;
pub mod run;
pub mod token;
pub mod trace;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use command::{Command, CommandKind};
pub use condition::{CmpEvaluator, ConditionError, ConditionEvaluator};
pub use decision::{Decision, Phase};
pub use definition::{
    ActionRef, LoopSpec, MergeSpec, Node, OnEarlyComplete, OnTimeout, SpawnSpec, SyncSpec,
    Transition, WaitFor, WorkflowDef,
};
pub use error::{ErrorObject, FailureKind};
pub use id::{short, DefId, NodeId, RunId, TokenId, TransitionId};
pub use merge::MergeStrategy;
pub use path::{ContextPath, PathError, Section};
pub use run::{
    DispatchKind, OnFailure, ParentRef, PendingDispatch, RunMeta, RunOutcome, RunStatus,
    SubworkflowRecord, WorkflowStatus,
};
pub use token::{Token, TokenStatus};
pub use trace::TraceEvent;
