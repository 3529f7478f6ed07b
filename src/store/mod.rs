//! Store Module
//!
//! The shared key-value/list store every coordination primitive is built on.
//! Anything offering these primitives, with cross-process atomicity on the
//! conditional create, can back the cache.

mod failover;
mod http;
mod memory;
mod slot;
mod stats;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreResult;

pub use failover::FailoverStore;
pub use http::HttpStore;
pub use memory::MemoryStore;
pub use slot::{current_timestamp_ms, ttl_ms, Slot, SlotValue};
pub use stats::StoreStats;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 512;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 16 * 1024 * 1024; // 16 MB

/// Options for [`Store::set`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Expire the key after this long; `None` keeps it until deleted
    pub ttl: Option<Duration>,
    /// Only write when the key does not exist yet
    pub only_if_absent: bool,
}

impl SetOptions {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            only_if_absent: false,
        }
    }

    pub fn only_if_absent(mut self) -> Self {
        self.only_if_absent = true;
        self
    }
}

/// Minimal shared-storage contract.
///
/// Backends report a read-only replica as [`StoreError::ReadOnly`]; wrap them
/// in a [`FailoverStore`] to get the reconnect-and-retry-once behaviour.
///
/// [`StoreError::ReadOnly`]: crate::error::StoreError::ReadOnly
#[async_trait]
pub trait Store: Send + Sync {
    /// Reads a byte value. Missing and expired keys read as `None`.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Writes a byte value, replacing any previous value and TTL.
    ///
    /// Returns `false` only when `only_if_absent` is set and the key exists.
    async fn set(&self, key: &str, value: Vec<u8>, options: SetOptions) -> StoreResult<bool>;

    /// Removes a key of any kind. Returns whether something was removed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Applies a TTL to an existing key. Returns `false` if the key is missing.
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Atomically creates `key` with `ttl` if it does not exist yet.
    ///
    /// Returns true iff this call created it.
    async fn set_if_absent(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<bool> {
        self.set(key, value, SetOptions::with_ttl(ttl).only_if_absent())
            .await
    }

    /// Pushes `item` onto the head of the list at `key`, then sets the list's TTL.
    async fn push_and_expire(&self, key: &str, item: Vec<u8>, ttl: Duration) -> StoreResult<()>;

    /// Pops the tail of the list at `key`, waiting for an item if it is empty.
    ///
    /// `None` or a zero timeout waits indefinitely. A positive timeout yields
    /// `Ok(None)` once it elapses.
    async fn blocking_pop(&self, key: &str, timeout: Option<Duration>)
        -> StoreResult<Option<Vec<u8>>>;

    /// Drops and re-establishes the underlying connection.
    async fn reconnect(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// A store shared between promises, interlocks and workers.
pub type SharedStore = Arc<dyn Store>;

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, options: SetOptions) -> StoreResult<bool> {
        (**self).set(key, value, options).await
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        (**self).delete(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        (**self).expire(key, ttl).await
    }

    async fn set_if_absent(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<bool> {
        (**self).set_if_absent(key, value, ttl).await
    }

    async fn push_and_expire(&self, key: &str, item: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        (**self).push_and_expire(key, item, ttl).await
    }

    async fn blocking_pop(
        &self,
        key: &str,
        timeout: Option<Duration>,
    ) -> StoreResult<Option<Vec<u8>>> {
        (**self).blocking_pop(key, timeout).await
    }

    async fn reconnect(&self) -> StoreResult<()> {
        (**self).reconnect().await
    }
}
