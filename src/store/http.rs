//! HTTP Store Module
//!
//! `Store` implementation talking to a remote store server over its HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult, READ_ONLY_CODE};
use crate::models::{
    ErrorResponse, ExpireQuery, ExpireResponse, KeyQuery, PopQuery, PushQuery, PushResponse,
    RemoveResponse, SetQuery, WriteResponse,
};
use crate::store::{ttl_ms, SetOptions, Store};

// == HTTP Store ==
/// Remote store client.
///
/// Holds a pooled `reqwest` client; `reconnect` swaps it for a fresh one so
/// stale connections to a demoted primary are dropped.
#[derive(Debug)]
pub struct HttpStore {
    base_url: String,
    client: RwLock<Client>,
}

impl HttpStore {
    /// Creates a client for the store server at `base_url` (e.g. `http://127.0.0.1:6380`).
    pub fn new(base_url: impl Into<String>) -> StoreResult<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: RwLock::new(build_client()?),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn client(&self) -> Client {
        self.client.read().await.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn build_client() -> StoreResult<Client> {
    Client::builder()
        .build()
        .map_err(|err| StoreError::Unavailable(err.to_string()))
}

fn transport(err: reqwest::Error) -> StoreError {
    if err.is_decode() {
        StoreError::Protocol(err.to_string())
    } else {
        StoreError::Unavailable(err.to_string())
    }
}

fn millis(duration: Duration) -> u64 {
    ttl_ms(duration)
}

/// Maps a non-success response onto the store error taxonomy.
async fn check(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: ErrorResponse = response.json().await.unwrap_or_default();
    let message = if body.error.is_empty() {
        status.to_string()
    } else {
        body.error
    };

    Err(match status {
        StatusCode::CONFLICT if body.code == READ_ONLY_CODE => StoreError::ReadOnly(message),
        StatusCode::SERVICE_UNAVAILABLE => StoreError::Unavailable(message),
        _ => StoreError::Protocol(message),
    })
}

async fn json<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
    check(response).await?.json().await.map_err(transport)
}

#[async_trait]
impl Store for HttpStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let response = self
            .client()
            .await
            .get(self.url("/kv"))
            .query(&KeyQuery { key: key.to_string() })
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let bytes = check(response).await?.bytes().await.map_err(transport)?;
        Ok(Some(bytes.to_vec()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, options: SetOptions) -> StoreResult<bool> {
        let query = SetQuery {
            key: key.to_string(),
            ttl_ms: options.ttl.map(millis),
            nx: options.only_if_absent,
        };
        let response = self
            .client()
            .await
            .put(self.url("/kv"))
            .query(&query)
            .body(value)
            .send()
            .await
            .map_err(transport)?;

        let body: WriteResponse = json(response).await?;
        Ok(body.written)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let response = self
            .client()
            .await
            .delete(self.url("/kv"))
            .query(&KeyQuery { key: key.to_string() })
            .send()
            .await
            .map_err(transport)?;

        let body: RemoveResponse = json(response).await?;
        Ok(body.removed)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let query = ExpireQuery {
            key: key.to_string(),
            ttl_ms: millis(ttl),
        };
        let response = self
            .client()
            .await
            .post(self.url("/kv/expire"))
            .query(&query)
            .send()
            .await
            .map_err(transport)?;

        let body: ExpireResponse = json(response).await?;
        Ok(body.applied)
    }

    async fn push_and_expire(&self, key: &str, item: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        let query = PushQuery {
            key: key.to_string(),
            ttl_ms: millis(ttl),
        };
        let response = self
            .client()
            .await
            .post(self.url("/list/push"))
            .query(&query)
            .body(item)
            .send()
            .await
            .map_err(transport)?;

        let _: PushResponse = json(response).await?;
        Ok(())
    }

    async fn blocking_pop(
        &self,
        key: &str,
        timeout: Option<Duration>,
    ) -> StoreResult<Option<Vec<u8>>> {
        let query = PopQuery {
            key: key.to_string(),
            timeout_ms: timeout.map(millis),
        };
        let response = self
            .client()
            .await
            .post(self.url("/list/pop"))
            .query(&query)
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NO_CONTENT {
            debug!(key, "pop timed out");
            return Ok(None);
        }
        let bytes = check(response).await?.bytes().await.map_err(transport)?;
        Ok(Some(bytes.to_vec()))
    }

    async fn reconnect(&self) -> StoreResult<()> {
        let fresh = build_client()?;
        *self.client.write().await = fresh;
        info!(base_url = %self.base_url, "reconnected to store");
        Ok(())
    }
}
