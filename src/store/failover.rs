//! Failover Store Module
//!
//! Decorator that survives a primary/replica failover: when the backend reports
//! a read-only replica, the connection is re-established and the command is
//! retried exactly once.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::StoreResult;
use crate::store::{SetOptions, Store};

type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Wraps any [`Store`] with a single reconnect-and-retry on read-only errors.
///
/// Every other error, and a second read-only error, is returned unchanged.
#[derive(Debug, Clone)]
pub struct FailoverStore<S> {
    inner: S,
}

impl<S: Store> FailoverStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    async fn retrying<'a, T, F>(&'a self, command: &'static str, key: &str, call: F) -> StoreResult<T>
    where
        F: Fn(&'a S) -> StoreFuture<'a, T> + Send,
    {
        match call(&self.inner).await {
            Err(err) if err.is_read_only() => {
                warn!(command, key, error = %err, "store is a read-only replica, reconnecting");
                self.inner.reconnect().await?;
                call(&self.inner).await
            }
            result => result,
        }
    }
}

#[async_trait]
impl<S: Store> Store for FailoverStore<S> {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.retrying("GET", key, |store| store.get(key)).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, options: SetOptions) -> StoreResult<bool> {
        self.retrying("SET", key, |store| store.set(key, value.clone(), options))
            .await
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.retrying("DEL", key, |store| store.delete(key)).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.retrying("EXPIRE", key, |store| store.expire(key, ttl))
            .await
    }

    async fn set_if_absent(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<bool> {
        self.retrying("SET NX", key, |store| {
            store.set_if_absent(key, value.clone(), ttl)
        })
        .await
    }

    async fn push_and_expire(&self, key: &str, item: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        self.retrying("LPUSH", key, |store| {
            store.push_and_expire(key, item.clone(), ttl)
        })
        .await
    }

    async fn blocking_pop(
        &self,
        key: &str,
        timeout: Option<Duration>,
    ) -> StoreResult<Option<Vec<u8>>> {
        self.retrying("BRPOP", key, |store| store.blocking_pop(key, timeout))
            .await
    }

    async fn reconnect(&self) -> StoreResult<()> {
        self.inner.reconnect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// A replica that is promoted back to primary on reconnect.
    #[derive(Debug, Default)]
    struct PromotingStore {
        memory: MemoryStore,
        reconnects: AtomicUsize,
        stays_replica: bool,
    }

    #[async_trait]
    impl Store for PromotingStore {
        async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
            self.memory.get(key).await
        }

        async fn set(&self, key: &str, value: Vec<u8>, options: SetOptions) -> StoreResult<bool> {
            self.memory.set(key, value, options).await
        }

        async fn delete(&self, key: &str) -> StoreResult<bool> {
            self.memory.delete(key).await
        }

        async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
            self.memory.expire(key, ttl).await
        }

        async fn push_and_expire(
            &self,
            key: &str,
            item: Vec<u8>,
            ttl: Duration,
        ) -> StoreResult<()> {
            self.memory.push_and_expire(key, item, ttl).await
        }

        async fn blocking_pop(
            &self,
            key: &str,
            timeout: Option<Duration>,
        ) -> StoreResult<Option<Vec<u8>>> {
            self.memory.blocking_pop(key, timeout).await
        }

        async fn reconnect(&self) -> StoreResult<()> {
            self.reconnects.fetch_add(1, Ordering::SeqCst);
            if !self.stays_replica {
                self.memory.set_read_only(false);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_retries_once_after_reconnect() {
        let inner = Arc::new(PromotingStore::default());
        inner.memory.set_read_only(true);
        let store = FailoverStore::new(inner.clone());

        let written = store
            .set("narf", b"blah".to_vec(), SetOptions::default())
            .await
            .unwrap();

        assert!(written);
        assert_eq!(inner.reconnects.load(Ordering::SeqCst), 1);
        assert_eq!(store.get("narf").await.unwrap(), Some(b"blah".to_vec()));
    }

    #[tokio::test]
    async fn test_second_read_only_error_propagates() {
        let inner = Arc::new(PromotingStore {
            stays_replica: true,
            ..Default::default()
        });
        inner.memory.set_read_only(true);
        let store = FailoverStore::new(inner.clone());

        let result = store.delete("narf").await;

        assert!(matches!(result, Err(StoreError::ReadOnly(_))));
        assert_eq!(inner.reconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let inner = Arc::new(PromotingStore::default());
        let store = FailoverStore::new(inner.clone());

        let result = store.get("").await;

        assert!(matches!(result, Err(StoreError::Protocol(_))));
        assert_eq!(inner.reconnects.load(Ordering::SeqCst), 0);
    }
}
