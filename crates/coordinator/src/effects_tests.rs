// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapters::{NoopPeer, StaticResources};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use wonder_core::{FakeClock, NodeId, TokenId};

/// Executor that fails the first `fail_count` dispatches with a
/// retriable error, then records successes.
#[derive(Default)]
struct FlakyExecutor {
    fail_count: Mutex<u32>,
    attempts: Mutex<u32>,
    dispatched: Mutex<Vec<TaskDispatch>>,
}

impl FlakyExecutor {
    fn failing(n: u32) -> Self {
        Self { fail_count: Mutex::new(n), ..Default::default() }
    }
}

#[async_trait]
impl ExecutorAdapter for FlakyExecutor {
    async fn dispatch_task(&self, task: TaskDispatch) -> Result<(), AdapterError> {
        *self.attempts.lock() += 1;
        let mut remaining = self.fail_count.lock();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(AdapterError::Unavailable("executor offline".into()));
        }
        self.dispatched.lock().push(task);
        Ok(())
    }
}

fn executor_under_test(
    flaky: Arc<FlakyExecutor>,
) -> (
    EffectExecutor<FlakyExecutor, StaticResources, NoopPeer, FakeClock>,
    mpsc::Receiver<Command>,
    Arc<Mutex<Scheduler>>,
) {
    let (tx, rx) = mpsc::channel(16);
    let scheduler = Arc::new(Mutex::new(Scheduler::new()));
    let retry = RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(1) };
    let effects = EffectExecutor::new(
        RunId::from_string("run-effects"),
        flaky,
        Arc::new(StaticResources::new()),
        Arc::new(NoopPeer),
        tx,
        Arc::clone(&scheduler),
        retry,
        FakeClock::new(),
    );
    (effects, rx, scheduler)
}

fn dispatch_decision() -> Decision {
    Decision::DispatchToken {
        token_id: TokenId::from_seq(1),
        node_id: NodeId::new("a"),
        action_id: "action.a".into(),
        input: json!({"q": 1}),
        timeout_ms: None,
    }
}

#[tokio::test]
async fn dispatch_retries_transient_failures() {
    let flaky = Arc::new(FlakyExecutor::failing(2));
    let (effects, _rx, _) = executor_under_test(Arc::clone(&flaky));

    let trace = effects.execute_all(vec![dispatch_decision()]).await;

    assert!(trace.is_empty(), "successful dispatch emits no failure trace");
    assert_eq!(*flaky.attempts.lock(), 3);
    assert_eq!(flaky.dispatched.lock().len(), 1);
}

#[tokio::test]
async fn exhausted_dispatch_enqueues_task_error() {
    let flaky = Arc::new(FlakyExecutor::failing(10));
    let (effects, mut rx, _) = executor_under_test(Arc::clone(&flaky));

    let trace = effects.execute_all(vec![dispatch_decision()]).await;

    // Capped at max_attempts
    assert_eq!(*flaky.attempts.lock(), 3);
    assert_eq!(trace.len(), 1);
    assert_eq!(trace[0].name, "dispatch.error");
    assert_eq!(trace[0].token_id, Some(TokenId::from_seq(1)));

    let follow_up = rx.recv().await.unwrap();
    match follow_up.kind {
        CommandKind::TaskError { token_id, error } => {
            assert_eq!(token_id, TokenId::from_seq(1));
            assert_eq!(error.code, "dispatch_failed");
        }
        other => panic!("expected TaskError, got {}", other.name()),
    }
}

#[tokio::test]
async fn schedule_alarm_arms_scheduler() {
    let flaky = Arc::new(FlakyExecutor::default());
    let (effects, _rx, scheduler) = executor_under_test(flaky);

    effects.execute_all(vec![Decision::ScheduleAlarm { at_ms: 4_000 }]).await;
    assert_eq!(scheduler.lock().next_deadline(), Some(4_000));

    // Replaces, never accumulates
    effects.execute_all(vec![Decision::ScheduleAlarm { at_ms: 2_000 }]).await;
    assert_eq!(scheduler.lock().next_deadline(), Some(2_000));
}

#[tokio::test]
async fn enqueue_command_self_feeds_queue() {
    let flaky = Arc::new(FlakyExecutor::default());
    let (effects, mut rx, _) = executor_under_test(flaky);

    effects
        .execute_all(vec![Decision::EnqueueCommandSelf { command: CommandKind::Alarm }])
        .await;

    let command = rx.recv().await.unwrap();
    assert!(matches!(command.kind, CommandKind::Alarm));
}

#[tokio::test]
async fn rejected_errors_do_not_retry() {
    #[derive(Default)]
    struct Rejecting {
        attempts: Mutex<u32>,
    }

    #[async_trait]
    impl ExecutorAdapter for Rejecting {
        async fn dispatch_task(&self, _task: TaskDispatch) -> Result<(), AdapterError> {
            *self.attempts.lock() += 1;
            Err(AdapterError::Rejected("bad action".into()))
        }
    }

    let rejecting = Arc::new(Rejecting::default());
    let (tx, _rx) = mpsc::channel(16);
    let effects = EffectExecutor::new(
        RunId::from_string("run-effects"),
        Arc::clone(&rejecting),
        Arc::new(StaticResources::new()),
        Arc::new(NoopPeer),
        tx,
        Arc::new(Mutex::new(Scheduler::new())),
        RetryPolicy::default(),
        FakeClock::new(),
    );

    effects.execute_all(vec![dispatch_decision()]).await;
    assert_eq!(*rejecting.attempts.lock(), 1);
}
