// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-through definition cache.
//!
//! Definitions are immutable per `(id, version)`, so cached entries never
//! invalidate; LRU eviction only bounds memory. Definitions are validated
//! once at admission, so a structurally broken definition never reaches
//! planning.

use crate::adapters::ResourcesAdapter;
use crate::error::CoordinatorError;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use wonder_core::{DefId, WorkflowDef};

pub struct DefinitionCache<R> {
    resources: Arc<R>,
    cache: Mutex<LruCache<(DefId, u32), Arc<WorkflowDef>>>,
}

impl<R: ResourcesAdapter> DefinitionCache<R> {
    pub fn new(resources: Arc<R>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self { resources, cache: Mutex::new(LruCache::new(capacity)) }
    }

    /// Fetch a definition, hitting the resources catalog on miss.
    ///
    /// `version: None` resolves the latest version through the catalog
    /// and caches under the resolved version.
    pub async fn get(
        &self,
        id: &DefId,
        version: Option<u32>,
    ) -> Result<Arc<WorkflowDef>, CoordinatorError> {
        if let Some(version) = version {
            if let Some(def) = self.cache.lock().get(&(*id, version)) {
                return Ok(Arc::clone(def));
            }
        }

        let def = self
            .resources
            .get_workflow_def(id, version)
            .await
            .map_err(|e| CoordinatorError::Resources(e.to_string()))?;

        def.validate()
            .map_err(|e| CoordinatorError::InvalidDefinition(e.to_string()))?;

        let def = Arc::new(def);
        self.cache.lock().put((def.id, def.version), Arc::clone(&def));
        Ok(def)
    }
}

#[cfg(test)]
#[path = "defs_tests.rs"]
mod tests;
