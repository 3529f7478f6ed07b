//! Response DTOs for the store server API
//!
//! Shared by the server handlers and the `HttpStore` client.

use serde::{Deserialize, Serialize};

use crate::store::StoreStats;

/// Response body for `PUT /kv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResponse {
    pub key: String,
    /// False when an `nx` write found the key already present
    pub written: bool,
}

/// Response body for `DELETE /kv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveResponse {
    pub key: String,
    pub removed: bool,
}

/// Response body for `POST /kv/expire`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpireResponse {
    pub key: String,
    /// False when the key did not exist
    pub applied: bool,
}

/// Response body for `POST /list/push`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResponse {
    pub key: String,
    pub pushed: bool,
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub code: String,
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub total_keys: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<StoreStats> for StatsResponse {
    fn from(stats: StoreStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expired: stats.expired,
            total_keys: stats.total_keys,
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// True while the server runs as a read-only replica
    pub read_only: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy(read_only: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            read_only,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
