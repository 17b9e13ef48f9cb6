// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapters::StaticResources;
use wonder_core::test_support::{linear_def, task_node, transition, workflow_def};

fn cache_with(defs: Vec<wonder_core::WorkflowDef>) -> DefinitionCache<StaticResources> {
    let resources = StaticResources::new();
    for def in defs {
        resources.insert(def);
    }
    DefinitionCache::new(Arc::new(resources), 8)
}

#[tokio::test]
async fn fetches_and_caches() {
    let def = linear_def(&["a", "b"]);
    let id = def.id;
    let cache = cache_with(vec![def]);

    let first = cache.get(&id, Some(1)).await.unwrap();
    let second = cache.get(&id, Some(1)).await.unwrap();
    assert_eq!(first.name, "linear");
    // Second hit comes from cache: same allocation.
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn resolves_latest_version() {
    let mut v1 = linear_def(&["a", "b"]);
    v1.version = 1;
    let mut v2 = linear_def(&["a", "b", "c"]);
    v2.version = 2;
    let id = v1.id;
    let cache = cache_with(vec![v1, v2]);

    let latest = cache.get(&id, None).await.unwrap();
    assert_eq!(latest.version, 2);
}

#[tokio::test]
async fn unknown_definition_is_a_resources_error() {
    let cache = cache_with(vec![]);
    let err = cache
        .get(&wonder_core::DefId::from_string("def-ghost"), Some(1))
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::Resources(_)));
}

#[tokio::test]
async fn invalid_definition_is_rejected_at_admission() {
    let def = workflow_def(
        "broken",
        "a",
        vec![task_node("a")],
        vec![transition("t", "a", Some("ghost"))],
    );
    let id = def.id;
    let cache = cache_with(vec![def]);

    let err = cache.get(&id, Some(1)).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::InvalidDefinition(_)));
}
