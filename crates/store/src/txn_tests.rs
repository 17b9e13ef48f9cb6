// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tempfile::tempdir;
use wonder_core::decision::ContextWrite;
use wonder_core::{
    ContextPath, Decision, NodeId, Token, TokenId, TokenStatus,
};

fn root_token() -> Token {
    Token::builder().id(TokenId::from_seq(0)).node_id(NodeId::new("a")).build()
}

#[test]
fn commit_publishes_state_and_appends_wal() {
    let dir = tempdir().unwrap();
    let mut store = LocalStore::open(dir.path().join("run")).unwrap();

    let mut txn = store.transaction("start", 100);
    txn.apply(&Decision::CreateToken { token: root_token() }).unwrap();
    txn.apply(&Decision::ScheduleAlarm { at_ms: 500 }).unwrap();
    let trace = txn.commit().unwrap();

    assert_eq!(store.state().tokens.len(), 1);
    assert_eq!(trace.len(), 1); // effect decisions produce no operation events
    assert_eq!(store.state().next_token_seq, 1);
}

#[test]
fn dropped_txn_leaves_no_trace() {
    let dir = tempdir().unwrap();
    let mut store = LocalStore::open(dir.path().join("run")).unwrap();

    {
        let mut txn = store.transaction("start", 100);
        txn.apply(&Decision::CreateToken { token: root_token() }).unwrap();
        // dropped without commit
    }

    assert!(store.state().tokens.is_empty());
}

#[test]
fn failed_apply_aborts_whole_batch() {
    let dir = tempdir().unwrap();
    let mut store = LocalStore::open(dir.path().join("run")).unwrap();

    let mut txn = store.transaction("start", 100);
    txn.apply(&Decision::CreateToken { token: root_token() }).unwrap();
    let err = txn.apply(&Decision::UpdateTokenStatus {
        token_id: TokenId::from_seq(0),
        status: TokenStatus::Executing, // pending -> executing is illegal
        error: None,
    });
    assert!(err.is_err());
    drop(txn);

    assert!(store.state().tokens.is_empty());
}

#[test]
fn empty_txn_commits_nothing() {
    let dir = tempdir().unwrap();
    let mut store = LocalStore::open(dir.path().join("run")).unwrap();
    let txn = store.transaction("alarm", 100);
    txn.commit().unwrap();
    assert_eq!(store.state().tokens.len(), 0);
}

#[test]
fn scratch_state_reflects_applied_decisions() {
    let dir = tempdir().unwrap();
    let mut store = LocalStore::open(dir.path().join("run")).unwrap();

    let mut txn = store.transaction("start", 100);
    txn.apply(&Decision::CreateToken { token: root_token() }).unwrap();
    assert_eq!(txn.state().tokens.len(), 1);
}

#[test]
fn reopen_recovers_committed_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run");

    {
        let mut store = LocalStore::open(&path).unwrap();
        let mut txn = store.transaction("start", 100);
        txn.apply(&Decision::CreateToken { token: root_token() }).unwrap();
        txn.apply(&Decision::SetContextField {
            write: ContextWrite {
                path: ContextPath::parse("state.x").unwrap(),
                value: json!(9),
            },
        })
        .unwrap();
        txn.commit().unwrap();
    }

    let store = LocalStore::open(&path).unwrap();
    assert_eq!(store.state().tokens.len(), 1);
    assert_eq!(store.state().context.state["x"], 9);
}

#[test]
fn checkpoint_then_reopen_skips_replayed_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run");

    {
        let mut store = LocalStore::open(&path).unwrap();
        let mut txn = store.transaction("start", 100);
        txn.apply(&Decision::CreateToken { token: root_token() }).unwrap();
        txn.commit().unwrap();
        let result = store.checkpoint().unwrap();
        assert_eq!(result.seq, 1);

        let mut txn = store.transaction("task_result", 200);
        txn.apply(&Decision::UpdateTokenStatus {
            token_id: TokenId::from_seq(0),
            status: TokenStatus::Dispatched,
            error: None,
        })
        .unwrap();
        txn.commit().unwrap();
    }

    let store = LocalStore::open(&path).unwrap();
    assert_eq!(
        store.state().token(&TokenId::from_seq(0)).unwrap().status,
        TokenStatus::Dispatched
    );
}

#[test]
fn destroy_removes_store_directory() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run");

    let mut store = LocalStore::open(&path).unwrap();
    let mut txn = store.transaction("start", 100);
    txn.apply(&Decision::CreateToken { token: root_token() }).unwrap();
    txn.commit().unwrap();

    store.destroy().unwrap();
    assert!(!path.exists());
}
