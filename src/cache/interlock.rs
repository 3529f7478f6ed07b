//! Interlock
//!
//! A self-expiring lease in the shared store that elects exactly one party to
//! compute a given key. Expiry is the only deadlock protection: if the elected
//! computer dies without releasing, the lease lapses after its TTL and a later
//! requester can win a new election.

use std::time::Duration;

use tracing::debug;

use crate::cache::ComputationKey;
use crate::error::StoreResult;
use crate::store::SharedStore;

/// Value written to a held lock.
pub const LOCK_MARKER: &[u8] = b"winner!";

/// Shortest lease the store accepts.
const MIN_TTL: Duration = Duration::from_millis(1);

/// Election lock for one computation key, stored at `<key>/lock`.
#[derive(Clone)]
pub struct Interlock {
    store: SharedStore,
    key: String,
}

impl Interlock {
    pub fn new(store: SharedStore, computation_key: &ComputationKey) -> Self {
        Self {
            store,
            key: computation_key.lock_key(),
        }
    }

    /// Store key holding the lock.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Tries to win the election; returns true iff this call created the lock.
    pub async fn try_acquire(&self, ttl: Duration) -> StoreResult<bool> {
        let won = self
            .store
            .set_if_absent(&self.key, LOCK_MARKER.to_vec(), ttl.max(MIN_TTL))
            .await?;
        debug!(key = %self.key, won, "interlock election");
        Ok(won)
    }

    /// Whether some party currently holds the lock.
    ///
    /// Best effort only: the answer can be out of date by the time it is used.
    pub async fn is_held(&self) -> StoreResult<bool> {
        Ok(self.store.get(&self.key).await?.is_some())
    }

    /// Drops the lock whoever holds it. Safe to call when nobody does.
    pub async fn release(&self) -> StoreResult<()> {
        self.store.delete(&self.key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn interlock(store: &Arc<MemoryStore>) -> Interlock {
        Interlock::new(store.clone(), &ComputationKey::explicit("Doohickey/./do_a_thing"))
    }

    #[tokio::test]
    async fn test_only_first_acquire_wins() {
        let store = Arc::new(MemoryStore::new());
        let lock = interlock(&store);

        assert_eq!(lock.key(), "Doohickey/./do_a_thing/lock");
        assert!(lock.try_acquire(Duration::from_secs(60)).await.unwrap());
        assert!(!lock.try_acquire(Duration::from_secs(60)).await.unwrap());
        assert!(lock.is_held().await.unwrap());
    }

    #[tokio::test]
    async fn test_release_allows_new_election() {
        let store = Arc::new(MemoryStore::new());
        let lock = interlock(&store);

        lock.try_acquire(Duration::from_secs(60)).await.unwrap();
        lock.release().await.unwrap();

        assert!(!lock.is_held().await.unwrap());
        assert!(lock.try_acquire(Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let lock = interlock(&store);

        lock.release().await.unwrap();
        lock.release().await.unwrap();
        assert!(!lock.is_held().await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_self_expires() {
        let store = Arc::new(MemoryStore::new());
        let lock = interlock(&store);

        assert!(lock.try_acquire(Duration::from_millis(50)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(!lock.is_held().await.unwrap());
        assert!(lock.try_acquire(Duration::from_millis(50)).await.unwrap());
    }

    #[tokio::test]
    async fn test_unbounded_lease() {
        let store = Arc::new(MemoryStore::new());
        let lock = interlock(&store);

        assert!(lock.try_acquire(Duration::MAX).await.unwrap());
        assert!(lock.is_held().await.unwrap());
        assert!(!lock.try_acquire(Duration::MAX).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_acquire_elects_one() {
        let store = Arc::new(MemoryStore::new());

        let attempts: Vec<_> = (0..16)
            .map(|_| {
                let lock = interlock(&store);
                tokio::spawn(async move { lock.try_acquire(Duration::from_secs(5)).await })
            })
            .collect();

        let mut winners = 0;
        for attempt in attempts {
            if attempt.await.unwrap().unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
