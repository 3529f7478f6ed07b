//! Worker
//!
//! Executes one computation on the winning side of an interlock election.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info};

use crate::cache::{CacheEntry, CompletionSignal, Interlock};
use crate::config::CacheConfig;
use crate::dispatch::Computable;
use crate::error::Result;
use crate::store::SharedStore;

/// Runs computations and publishes their results.
#[derive(Clone)]
pub struct Worker {
    store: SharedStore,
    config: CacheConfig,
}

impl Worker {
    pub fn new(store: SharedStore, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// Runs `job`, writes the entry fresh for `fresh_for` and signals waiters.
    ///
    /// The interlock is released whatever happens, after the entry is written
    /// on success. A failed computation writes nothing and signals nobody, so
    /// waiters time out.
    pub async fn perform(&self, job: &dyn Computable, fresh_for: Duration) -> Result<Value> {
        let key = job.key();
        let outcome = self.compute_and_publish(job, fresh_for).await;

        let released = Interlock::new(self.store.clone(), &key).release().await;
        if let Err(err) = &released {
            error!(key = %key, error = %err, "failed to release interlock");
        }

        let value = outcome?;
        released?;
        Ok(value)
    }

    async fn compute_and_publish(&self, job: &dyn Computable, fresh_for: Duration) -> Result<Value> {
        let key = job.key();
        debug!(key = %key, "computing");

        let value = match job.run().await {
            Ok(value) => value,
            Err(err) => {
                error!(key = %key, error = %err, "computation failed");
                return Err(err.into());
            }
        };

        CacheEntry::new(value.clone(), fresh_for, self.config.generation.clone())
            .persist(self.store.as_ref(), &key, self.config.backstop_ttl)
            .await?;

        CompletionSignal::new(self.store.clone(), self.config.signal_ttl)
            .signal(&key)
            .await?;

        info!(key = %key, "computation published");
        Ok(value)
    }
}
