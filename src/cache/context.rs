//! Shared handles every promise needs: the store, a dispatcher and the cache
//! configuration.

use std::sync::Arc;

use crate::cache::Promise;
use crate::config::CacheConfig;
use crate::dispatch::{Dispatcher, JobBuilder, JobSpec, LocalDispatcher, Registry};
use crate::store::SharedStore;

#[derive(Clone)]
pub struct CacheContext {
    store: SharedStore,
    dispatcher: Arc<dyn Dispatcher>,
    config: CacheConfig,
}

impl CacheContext {
    pub fn new(store: SharedStore, dispatcher: Arc<dyn Dispatcher>, config: CacheConfig) -> Self {
        Self {
            store,
            dispatcher,
            config,
        }
    }

    /// Context that computes in-process with the functions in `registry`.
    pub fn local(store: SharedStore, registry: Registry, config: CacheConfig) -> Self {
        let dispatcher = LocalDispatcher::new(registry, store.clone(), config.clone());
        Self::new(store, Arc::new(dispatcher), config)
    }

    /// Starts a job using the configured freshness TTL.
    pub fn job(&self, target: impl Into<String>, method: impl Into<String>) -> JobBuilder {
        JobSpec::builder(target, method).freshness_ttl(self.config.freshness_ttl)
    }

    pub fn promise(&self, job: JobSpec) -> Promise {
        Promise::new(
            job,
            self.store.clone(),
            self.dispatcher.clone(),
            self.config.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Invocation;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_job_uses_configured_freshness() {
        let config = CacheConfig::default().with_freshness_ttl(Duration::from_secs(12));
        let ctx = CacheContext::local(Arc::new(MemoryStore::new()), Registry::new(), config);

        let job = ctx.job("Report", "total").build();
        assert_eq!(job.freshness_ttl, Duration::from_secs(12));
    }

    #[tokio::test]
    async fn test_local_context_fetches() {
        let registry = Registry::new()
            .register("Report", "total", |_call: Invocation| async move { Ok(json!(99)) });
        let ctx = CacheContext::local(Arc::new(MemoryStore::new()), registry, CacheConfig::default());

        let promise = ctx.promise(ctx.job("Report", "total").build());
        let value = promise.fetch(Duration::from_secs(2), false).await.unwrap();
        assert_eq!(value, json!(99));
    }
}
