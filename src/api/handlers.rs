//! API Handlers
//!
//! HTTP request handlers exposing the store primitives.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::StoreError;
use crate::models::{
    validate_key, ExpireQuery, ExpireResponse, HealthResponse, KeyQuery, PopQuery, PushQuery,
    PushResponse, RemoveResponse, SetQuery, StatsResponse, WriteResponse,
};
use crate::store::{MemoryStore, SetOptions, Store};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The store being served
    pub store: Arc<MemoryStore>,
}

impl AppState {
    /// Creates a new AppState serving the given store.
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Creates a new AppState from server configuration.
    pub fn from_config(config: &crate::config::ServerConfig) -> Self {
        let store = MemoryStore::new();
        store.set_read_only(config.read_only);
        Self::new(store)
    }
}

fn check_key(key: &str) -> Result<(), StoreError> {
    match validate_key(key) {
        Some(message) => Err(StoreError::Protocol(message)),
        None => Ok(()),
    }
}

/// Handler for GET /kv
///
/// Returns the raw value, or 404 when the key is missing or expired.
pub async fn get_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<Response, StoreError> {
    check_key(&query.key)?;

    let response = match state.store.get(&query.key).await? {
        Some(value) => value.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    };
    Ok(response)
}

/// Handler for PUT /kv
pub async fn set_handler(
    State(state): State<AppState>,
    Query(query): Query<SetQuery>,
    body: Bytes,
) -> Result<Json<WriteResponse>, StoreError> {
    check_key(&query.key)?;

    let options = SetOptions {
        ttl: query.ttl_ms.map(Duration::from_millis),
        only_if_absent: query.nx,
    };
    let written = state.store.set(&query.key, body.to_vec(), options).await?;

    Ok(Json(WriteResponse {
        key: query.key,
        written,
    }))
}

/// Handler for DELETE /kv
pub async fn delete_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<RemoveResponse>, StoreError> {
    check_key(&query.key)?;

    let removed = state.store.delete(&query.key).await?;

    Ok(Json(RemoveResponse {
        key: query.key,
        removed,
    }))
}

/// Handler for POST /kv/expire
pub async fn expire_handler(
    State(state): State<AppState>,
    Query(query): Query<ExpireQuery>,
) -> Result<Json<ExpireResponse>, StoreError> {
    check_key(&query.key)?;

    let applied = state
        .store
        .expire(&query.key, Duration::from_millis(query.ttl_ms))
        .await?;

    Ok(Json(ExpireResponse {
        key: query.key,
        applied,
    }))
}

/// Handler for POST /list/push
pub async fn push_handler(
    State(state): State<AppState>,
    Query(query): Query<PushQuery>,
    body: Bytes,
) -> Result<Json<PushResponse>, StoreError> {
    check_key(&query.key)?;

    state
        .store
        .push_and_expire(&query.key, body.to_vec(), Duration::from_millis(query.ttl_ms))
        .await?;

    Ok(Json(PushResponse {
        key: query.key,
        pushed: true,
    }))
}

/// Handler for POST /list/pop
///
/// Long-polls for an item. Answers 204 once the timeout elapses.
pub async fn pop_handler(
    State(state): State<AppState>,
    Query(query): Query<PopQuery>,
) -> Result<Response, StoreError> {
    check_key(&query.key)?;

    let timeout = query.timeout_ms.map(Duration::from_millis);
    let response = match state.store.blocking_pop(&query.key, timeout).await? {
        Some(item) => item.into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    };
    Ok(response)
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.store.stats().await.into())
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.store.is_read_only()))
}
