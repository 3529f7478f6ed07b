//! Completion Signal
//!
//! Broadcast-style "computation finished" notification built on a list and a
//! blocking pop, which hands each item to exactly one waiter. A waiter that
//! receives the item pushes it straight back with a short TTL, so other
//! waiters blocked at that moment get woken in turn.
//!
//! This is best effort. Under heavy concurrency or slow consumers some waiters
//! miss the window and fall back to their own timeout handling.

use std::time::Duration;

use tracing::debug;

use crate::cache::ComputationKey;
use crate::error::StoreResult;
use crate::store::SharedStore;

/// Item pushed onto the signal list.
pub const DONE_MESSAGE: &[u8] = b"done";

/// What a wait on the signal observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    Signaled,
    TimedOut,
}

/// Completion signal channel over `<key>/done`.
#[derive(Clone)]
pub struct CompletionSignal {
    store: SharedStore,
    /// Lifetime of the signal list after each push
    ttl: Duration,
}

impl CompletionSignal {
    pub fn new(store: SharedStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Announces that the computation for `key` has finished.
    pub async fn signal(&self, key: &ComputationKey) -> StoreResult<()> {
        self.store
            .push_and_expire(&key.done_key(), DONE_MESSAGE.to_vec(), self.ttl)
            .await
    }

    /// Blocks until the computation for `key` signals or `timeout` elapses.
    ///
    /// A zero timeout waits indefinitely, like the underlying blocking pop.
    pub async fn wait(&self, key: &ComputationKey, timeout: Duration) -> StoreResult<SignalOutcome> {
        match self.store.blocking_pop(&key.done_key(), Some(timeout)).await? {
            Some(_) => {
                debug!(key = %key, "got done message");
                // Put it back for any other readers
                self.signal(key).await?;
                Ok(SignalOutcome::Signaled)
            }
            None => Ok(SignalOutcome::TimedOut),
        }
    }
}
