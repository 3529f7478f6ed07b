//! In-process dispatcher that runs jobs on the tokio runtime.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::CacheConfig;
use crate::dispatch::{Dispatcher, JobSpec, Registry, Worker};
use crate::error::Result;
use crate::store::SharedStore;

/// Dispatcher that spawns each enqueued job as a tokio task.
#[derive(Clone)]
pub struct LocalDispatcher {
    registry: Arc<Registry>,
    worker: Arc<Worker>,
}

impl LocalDispatcher {
    pub fn new(registry: Registry, store: SharedStore, config: CacheConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            worker: Arc::new(Worker::new(store, config)),
        }
    }
}

#[async_trait]
impl Dispatcher for LocalDispatcher {
    /// Unknown computations are rejected here rather than inside the task.
    async fn enqueue(&self, job: JobSpec) -> Result<()> {
        let bound = self.registry.resolve(&job)?;
        let worker = self.worker.clone();
        debug!(key = %job.cache_key, "job enqueued");

        tokio::spawn(async move {
            let key = job.cache_key.clone();
            if let Err(err) = worker.perform(&bound, job.freshness_ttl).await {
                error!(key = %key, error = %err, "background job failed");
            }
        });
        Ok(())
    }

    async fn perform_now(&self, job: JobSpec) -> Result<Value> {
        let bound = self.registry.resolve(&job)?;
        self.worker.perform(&bound, job.freshness_ttl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEntry;
    use crate::dispatch::Invocation;
    use crate::error::CacheError;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::time::Duration;

    fn dispatcher(store: &Arc<MemoryStore>) -> LocalDispatcher {
        let registry = Registry::new().register("Math", "double", |call: Invocation| async move {
            let n = call.args.first().and_then(Value::as_i64).unwrap_or(0);
            Ok(json!(n * 2))
        });
        LocalDispatcher::new(registry, store.clone(), CacheConfig::default())
    }

    #[tokio::test]
    async fn test_perform_now_populates_cache() {
        let store = Arc::new(MemoryStore::new());
        let job = JobSpec::builder("Math", "double").args(vec![json!(21)]).build();

        let value = dispatcher(&store).perform_now(job.clone()).await.unwrap();
        assert_eq!(value, json!(42));

        let entry = CacheEntry::load(store.as_ref(), &job.cache_key).await.unwrap().unwrap();
        assert_eq!(entry.value, json!(42));
    }

    #[tokio::test]
    async fn test_enqueue_runs_in_background() {
        let store = Arc::new(MemoryStore::new());
        let job = JobSpec::builder("Math", "double").args(vec![json!(4)]).build();

        dispatcher(&store).enqueue(job.clone()).await.unwrap();

        let mut entry = None;
        for _ in 0..50 {
            entry = CacheEntry::load(store.as_ref(), &job.cache_key).await.unwrap();
            if entry.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(entry.unwrap().value, json!(8));
    }

    #[tokio::test]
    async fn test_enqueue_rejects_unknown_job() {
        let store = Arc::new(MemoryStore::new());
        let job = JobSpec::builder("Math", "triple").build();

        let result = dispatcher(&store).enqueue(job).await;
        assert!(matches!(result, Err(CacheError::UnknownComputation { .. })));
    }
}
