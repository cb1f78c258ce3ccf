// src/engine/cache.rs

//! Run-scoped result cache.
//!
//! Every unit of work publishes its vertex's result into the entry of its
//! run. Publishing is a read-modify-write of that entry, so it happens
//! under the run's lock (see [`CacheService::lock`]).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

/// Storage for per-run entries, keyed by run id.
pub trait CacheService: Send + Sync {
    fn get(&self, run_id: &str) -> Option<Map<String, Value>>;
    fn set(&self, run_id: &str, entry: Map<String, Value>);
    fn delete(&self, run_id: &str);
    /// The lock guarding the entry of `run_id`. Always the same lock for
    /// the same run id.
    fn lock(&self, run_id: &str) -> Arc<AsyncMutex<()>>;
}

/// Process-local [`CacheService`].
#[derive(Debug, Default)]
pub struct InMemoryCacheService {
    entries: Mutex<HashMap<String, Map<String, Value>>>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl InMemoryCacheService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheService for InMemoryCacheService {
    fn get(&self, run_id: &str) -> Option<Map<String, Value>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(run_id).cloned()
    }

    fn set(&self, run_id: &str, entry: Map<String, Value>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(run_id.to_string(), entry);
    }

    fn delete(&self, run_id: &str) {
        debug!(run_id, "dropping cache entry");
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(run_id);
        self.locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(run_id);
    }

    fn lock(&self, run_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(run_id.to_string()).or_default())
    }
}

/// Publish one vertex result into the run's entry, under the run's lock.
pub async fn publish_result(cache: &dyn CacheService, run_id: &str, vertex_id: &str, result: &Value) {
    let lock = cache.lock(run_id);
    let _guard = lock.lock().await;

    let mut entry = cache.get(run_id).unwrap_or_default();
    entry.insert(vertex_id.to_string(), result.clone());
    cache.set(run_id, entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn same_run_id_gets_same_lock() {
        let cache = InMemoryCacheService::new();
        assert!(Arc::ptr_eq(&cache.lock("r"), &cache.lock("r")));
        assert!(!Arc::ptr_eq(&cache.lock("r"), &cache.lock("other")));
    }

    #[tokio::test]
    async fn concurrent_publishes_are_not_lost() {
        let cache: Arc<dyn CacheService> = Arc::new(InMemoryCacheService::new());
        let mut handles = Vec::new();
        for i in 0..20 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                publish_result(cache.as_ref(), "run", &format!("V-{i}"), &json!(i)).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(cache.get("run").map(|e| e.len()), Some(20));
        cache.delete("run");
        assert!(cache.get("run").is_none());
    }
}
