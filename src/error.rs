//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Marker carried by read-only replica failures, on the wire and in messages.
pub const READ_ONLY_CODE: &str = "READONLY";

// == Store Error Enum ==
/// Failures reported by a shared store backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store is a read-only replica (typically right after a failover).
    #[error("READONLY You can't write against a read only replica: {0}")]
    ReadOnly(String),

    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected or garbled a request
    #[error("Store protocol error: {0}")]
    Protocol(String),
}

impl StoreError {
    /// Returns true for the failover condition that warrants a reconnect and retry.
    pub fn is_read_only(&self) -> bool {
        matches!(self, StoreError::ReadOnly(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            StoreError::ReadOnly(_) => (StatusCode::CONFLICT, READ_ONLY_CODE),
            StoreError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
            StoreError::Protocol(_) => (StatusCode::BAD_REQUEST, "PROTOCOL"),
        };

        let body = Json(json!({
            "error": self.to_string(),
            "code": code,
        }));

        (status, body).into_response()
    }
}

// == Compute Error ==
/// Opaque failure raised by a compute function.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Computation failed: {0}")]
pub struct ComputeError(pub String);

impl ComputeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

// == Cache Error Enum ==
/// Unified error type for cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// No result became available within the caller's timeout
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// The shared store failed (after the single failover retry)
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A compute function failed while running synchronously
    #[error(transparent)]
    Compute(#[from] ComputeError),

    /// No compute function is registered for a target and method
    #[error("No computation registered for {target}.{method}")]
    UnknownComputation { target: String, method: String },

    /// The dispatcher could not accept a job
    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    /// A value could not be serialized for storage
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Result Type Aliases ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
