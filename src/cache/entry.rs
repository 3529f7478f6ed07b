//! Cache Entry Module
//!
//! A computed value together with the metadata that decides its freshness.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::Error as _, Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::cache::ComputationKey;
use crate::error::{Result, StoreResult};
use crate::store::{SetOptions, Store};

/// Longest validity window an entry can carry (100 years).
const MAX_WINDOW: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

// == Cache Entry ==
/// A computed value plus validity metadata.
///
/// Entries are never mutated in place; a recomputation writes a new entry
/// under the same key. `Value::Null` is a legitimate cached result, distinct
/// from a missing entry (`None` from [`CacheEntry::load`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The computed value
    pub value: Value,
    /// When the value was computed
    pub created_at: DateTime<Utc>,
    /// Last instant at which the value counts as fresh
    pub valid_until: DateTime<Utc>,
    /// Generation tag active when the entry was written
    pub generation: String,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry computed now and fresh for `fresh_for`.
    pub fn new(value: Value, fresh_for: Duration, generation: impl Into<String>) -> Self {
        let created_at = Utc::now();
        let window = chrono::Duration::from_std(fresh_for.min(MAX_WINDOW))
            .unwrap_or_else(|_| chrono::Duration::zero());
        let valid_until = created_at + window;

        Self {
            value,
            created_at,
            valid_until,
            generation: generation.into(),
        }
    }

    // == Staleness ==
    /// Checks staleness against an explicit clock reading.
    ///
    /// An entry is stale once `now` is past `valid_until`, or when it was
    /// written under a different generation.
    pub fn is_stale_at(&self, now: DateTime<Utc>, generation: &str) -> bool {
        now > self.valid_until || self.generation != generation
    }

    pub fn is_stale(&self, generation: &str) -> bool {
        self.is_stale_at(Utc::now(), generation)
    }

    pub fn is_fresh(&self, generation: &str) -> bool {
        !self.is_stale(generation)
    }

    // == Encoding ==
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decodes an entry, rejecting one whose validity window ends before it starts.
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        let entry: Self = serde_json::from_slice(bytes)?;
        if entry.created_at > entry.valid_until {
            return Err(serde_json::Error::custom(
                "entry created after the end of its validity window",
            ));
        }
        Ok(entry)
    }

    // == Store Access ==
    /// Reads the entry stored under `key`.
    ///
    /// An entry that cannot be decoded reads as missing.
    pub async fn load(store: &dyn Store, key: &ComputationKey) -> StoreResult<Option<Self>> {
        let Some(raw) = store.get(key.as_str()).await? else {
            return Ok(None);
        };

        match Self::from_bytes(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(err) => {
                warn!(key = %key, error = %err, "ignoring undecodable cache entry");
                Ok(None)
            }
        }
    }

    /// Writes the entry under `key`, physically expiring after `backstop_ttl`.
    pub async fn persist(
        &self,
        store: &dyn Store,
        key: &ComputationKey,
        backstop_ttl: Duration,
    ) -> Result<()> {
        let bytes = self.to_bytes()?;
        store
            .set(key.as_str(), bytes, SetOptions::with_ttl(backstop_ttl))
            .await?;
        Ok(())
    }
}
