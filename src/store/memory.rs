//! Memory Store Module
//!
//! In-process store engine: byte values and lists in a HashMap with TTL
//! expiration, plus a blocking pop driven by push notifications.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{
    SetOptions, Slot, SlotValue, Store, StoreStats, MAX_KEY_LENGTH, MAX_VALUE_SIZE,
};

#[derive(Debug, Default)]
struct State {
    slots: HashMap<String, Slot>,
    stats: StoreStats,
}

impl State {
    /// Returns the live slot at `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str) -> Option<&mut Slot> {
        if self.slots.get(key).is_some_and(Slot::is_expired) {
            self.slots.remove(key);
            self.stats.record_expired(1);
        }
        self.slots.get_mut(key)
    }
}

// == Memory Store ==
/// Shared in-process store with TTL support.
///
/// Every operation is atomic with respect to the others, which makes
/// `set_if_absent` a valid election primitive for all tasks sharing the store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    /// Woken on every list push
    pushed: Notify,
    /// When set, every write fails with `StoreError::ReadOnly`
    read_only: AtomicBool,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty, writable store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches the store between primary and read-only replica behaviour.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::SeqCst)
    }

    // == Stats ==
    /// Returns current store statistics.
    pub async fn stats(&self) -> StoreStats {
        let state = self.state.lock().await;
        let mut stats = state.stats.clone();
        stats.set_total_keys(state.slots.len());
        stats
    }

    // == Length ==
    /// Returns the current number of keys, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.state.lock().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // == TTL ==
    /// Returns the remaining lifetime of a live key, `None` if missing or persistent.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let mut state = self.state.lock().await;
        state
            .live(key)
            .and_then(|slot| slot.ttl_remaining_ms())
            .map(Duration::from_millis)
    }

    // == Purge Expired ==
    /// Removes all expired keys from the store.
    ///
    /// Returns the number of keys removed.
    pub async fn purge_expired(&self) -> usize {
        let mut state = self.state.lock().await;
        let before = state.slots.len();
        state.slots.retain(|_, slot| !slot.is_expired());
        let count = before - state.slots.len();

        state.stats.record_expired(count);
        let total = state.slots.len();
        state.stats.set_total_keys(total);
        count
    }

    fn ensure_writable(&self) -> StoreResult<()> {
        if self.is_read_only() {
            Err(StoreError::ReadOnly("memory store is a replica".to_string()))
        } else {
            Ok(())
        }
    }

    async fn try_pop(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.ensure_writable()?;
        let mut state = self.state.lock().await;
        let popped = match state.live(key) {
            None => None,
            Some(Slot {
                value: SlotValue::List(items),
                ..
            }) => items.pop_back(),
            Some(_) => return Err(wrong_type(key)),
        };

        // Lists vanish once drained
        let drained = state
            .slots
            .get(key)
            .is_some_and(|slot| matches!(&slot.value, SlotValue::List(items) if items.is_empty()));
        if drained {
            state.slots.remove(key);
        }
        Ok(popped)
    }
}

fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::Protocol("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(StoreError::Protocol(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

fn validate_value(value: &[u8]) -> StoreResult<()> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(StoreError::Protocol(format!(
            "Value exceeds maximum size of {} bytes",
            MAX_VALUE_SIZE
        )));
    }
    Ok(())
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Protocol(format!(
        "WRONGTYPE Operation against a key holding the wrong kind of value: {key}"
    ))
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        validate_key(key)?;
        let mut state = self.state.lock().await;
        let found = state.live(key).map(|slot| slot.value.clone());
        match found {
            Some(SlotValue::Bytes(value)) => {
                state.stats.record_hit();
                Ok(Some(value))
            }
            Some(SlotValue::List(_)) => Err(wrong_type(key)),
            None => {
                state.stats.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, options: SetOptions) -> StoreResult<bool> {
        validate_key(key)?;
        validate_value(&value)?;
        self.ensure_writable()?;
        if options.ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(StoreError::Protocol(format!(
                "invalid expire time in set: {key}"
            )));
        }

        let mut state = self.state.lock().await;
        if options.only_if_absent && state.live(key).is_some() {
            return Ok(false);
        }

        state
            .slots
            .insert(key.to_string(), Slot::new(SlotValue::Bytes(value), options.ttl));
        let total = state.slots.len();
        state.stats.set_total_keys(total);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        validate_key(key)?;
        self.ensure_writable()?;
        let mut state = self.state.lock().await;
        let existed = state.live(key).is_some();
        if existed {
            state.slots.remove(key);
            let total = state.slots.len();
            state.stats.set_total_keys(total);
        }
        Ok(existed)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        validate_key(key)?;
        self.ensure_writable()?;
        let mut state = self.state.lock().await;
        match state.live(key) {
            None => Ok(false),
            Some(_) if ttl.is_zero() => {
                state.slots.remove(key);
                Ok(true)
            }
            Some(slot) => {
                slot.set_ttl(ttl);
                Ok(true)
            }
        }
    }

    async fn push_and_expire(&self, key: &str, item: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        validate_key(key)?;
        validate_value(&item)?;
        self.ensure_writable()?;
        {
            let mut state = self.state.lock().await;
            state.live(key);
            let slot = state
                .slots
                .entry(key.to_string())
                .or_insert_with(Slot::empty_list);
            match &mut slot.value {
                SlotValue::List(items) => items.push_front(item),
                SlotValue::Bytes(_) => return Err(wrong_type(key)),
            }
            if ttl.is_zero() {
                state.slots.remove(key);
            } else {
                slot.set_ttl(ttl);
            }
        }
        debug!(key, "pushed list item");
        self.pushed.notify_waiters();
        Ok(())
    }

    async fn blocking_pop(
        &self,
        key: &str,
        timeout: Option<Duration>,
    ) -> StoreResult<Option<Vec<u8>>> {
        validate_key(key)?;
        // Zero, absent and unrepresentably long timeouts all wait indefinitely
        let deadline = timeout
            .filter(|timeout| !timeout.is_zero())
            .and_then(|timeout| Instant::now().checked_add(timeout));

        loop {
            // Register interest before looking, so a push in between still wakes us
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_pop(key).await? {
                return Ok(Some(item));
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Ok(None);
                    }
                }
                None => notified.await,
            }
        }
    }
}
