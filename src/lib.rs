//! Smart Cache - A distributed, stale-tolerant memoization cache
//!
//! Shares expensive computations across many concurrent requesters through a
//! key-value/list store: one requester wins an interlock and computes, the
//! rest wait on a completion signal or fall back to a stale value.

pub mod api;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{AwaitOptions, CacheContext, CacheEntry, CachedAction, ComputationKey, Outcome, Promise};
pub use config::{CacheConfig, ServerConfig};
pub use dispatch::{Dispatcher, Invocation, JobSpec, LocalDispatcher, Registry};
pub use error::{CacheError, ComputeError, StoreError};
pub use store::{FailoverStore, HttpStore, MemoryStore, SharedStore, Store};
pub use tasks::spawn_cleanup_task;
