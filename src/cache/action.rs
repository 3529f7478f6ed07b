//! Cached Action
//!
//! Makes one registered computation cacheable: a reusable description of
//! `target.method` (optionally bound to one object) that hands out promises
//! for concrete argument lists.

use std::time::Duration;

use serde_json::Value;

use crate::cache::{CacheContext, ComputationKey, Promise};
use crate::dispatch::JobSpec;
use crate::error::Result;

/// How long [`CachedAction::get`] is prepared to wait (24 hours).
pub const GET_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone)]
pub struct CachedAction {
    ctx: CacheContext,
    target: String,
    method: String,
    object_param: Option<String>,
    cache_key: Option<ComputationKey>,
    freshness_ttl: Option<Duration>,
    interlock_ttl: Option<Duration>,
}

impl CachedAction {
    pub fn new(ctx: CacheContext, target: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            ctx,
            target: target.into(),
            method: method.into(),
            object_param: None,
            cache_key: None,
            freshness_ttl: None,
            interlock_ttl: None,
        }
    }

    /// Binds the action to one instance of the target.
    pub fn for_object(mut self, object_param: impl Into<String>) -> Self {
        self.object_param = Some(object_param.into());
        self
    }

    /// Caches every call under `key` regardless of arguments.
    pub fn with_cache_key(mut self, key: ComputationKey) -> Self {
        self.cache_key = Some(key);
        self
    }

    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.freshness_ttl = Some(ttl);
        self
    }

    pub fn interlock_timeout(mut self, ttl: Duration) -> Self {
        self.interlock_ttl = Some(ttl);
        self
    }

    fn job(&self, args: Vec<Value>) -> JobSpec {
        let mut builder = self.ctx.job(self.target.clone(), self.method.clone()).args(args);
        if let Some(object_param) = &self.object_param {
            builder = builder.object(object_param.clone());
        }
        if let Some(key) = &self.cache_key {
            builder = builder.cache_key(key.clone());
        }
        if let Some(ttl) = self.freshness_ttl {
            builder = builder.freshness_ttl(ttl);
        }
        builder.build()
    }

    pub fn promise(&self, args: Vec<Value>) -> Promise {
        let promise = self.ctx.promise(self.job(args));
        match self.interlock_ttl {
            Some(ttl) => promise.with_interlock_ttl(ttl),
            None => promise,
        }
    }

    pub fn cache_key(&self, args: Vec<Value>) -> ComputationKey {
        self.job(args).cache_key
    }

    /// The fresh cached value, if any, without computing anything.
    pub async fn if_available(&self, args: Vec<Value>) -> Result<Option<Value>> {
        self.promise(args).existing_value(false).await
    }

    /// The cached value, computing it if stale or missing.
    pub async fn get(&self, args: Vec<Value>) -> Result<Value> {
        self.promise(args).fetch(GET_TIMEOUT, false).await
    }

    /// Recomputes now and repopulates the cache.
    pub async fn refresh(&self, args: Vec<Value>) -> Result<Value> {
        self.promise(args).refresh().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::dispatch::{Invocation, Registry};
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn action(calls: Arc<AtomicUsize>) -> CachedAction {
        let registry = Registry::new().register("Doohickey", "make_a_thing", move |call: Invocation| {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(json!({"name": call.object_param, "run": n}))
            }
        });
        let ctx = CacheContext::local(Arc::new(MemoryStore::new()), registry, CacheConfig::default());
        CachedAction::new(ctx, "Doohickey", "make_a_thing").for_object("7")
    }

    #[tokio::test]
    async fn test_get_caches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let action = action(calls.clone());

        assert_eq!(action.if_available(vec![]).await.unwrap(), None);

        let first = action.get(vec![]).await.unwrap();
        let second = action.get(vec![]).await.unwrap();
        assert_eq!(first, json!({"name": "7", "run": 1}));
        assert_eq!(second, first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(action.if_available(vec![]).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_refresh_recomputes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let action = action(calls.clone());

        action.get(vec![json!(1)]).await.unwrap();
        let refreshed = action.refresh(vec![json!(1)]).await.unwrap();

        assert_eq!(refreshed["run"], 2);
        assert_eq!(action.get(vec![json!(1)]).await.unwrap()["run"], 2);
    }

    #[test]
    fn test_cache_key_shapes() {
        let action = action(Arc::new(AtomicUsize::new(0)));

        assert_eq!(action.cache_key(vec![]).as_str(), "Doohickey/7/make_a_thing");
        assert_ne!(action.cache_key(vec![json!(1)]), action.cache_key(vec![json!(2)]));

        let pinned = action.with_cache_key(ComputationKey::explicit("things/latest"));
        assert_eq!(pinned.cache_key(vec![json!(1)]).as_str(), "things/latest");
    }
}
