//! Dispatch Module
//!
//! The boundary between the coordination protocol and whatever actually runs
//! computations. A [`Dispatcher`] receives serializable [`JobSpec`]s; on the
//! executing side a job is resolved into a [`Computable`] and handed to the
//! [`Worker`], which publishes the result and always releases the interlock.

mod local;
mod registry;
mod worker;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::ComputationKey;
use crate::config::DEFAULT_FRESHNESS_TTL;
use crate::error::{ComputeError, Result};

pub use local::LocalDispatcher;
pub use registry::{BoundJob, Invocation, Registry};
pub use worker::Worker;

// == Job Spec ==
/// Everything an executor needs to run one computation and publish its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Name of the thing the method is called on
    pub target: String,
    /// Identifies one instance of the target; `None` for class-level methods
    pub object_param: Option<String>,
    /// Method to call
    pub method: String,
    /// Arguments passed to the method
    pub args: Vec<Value>,
    /// Where the result is cached
    pub cache_key: ComputationKey,
    /// How long the result stays fresh
    #[serde(with = "duration_secs")]
    pub freshness_ttl: Duration,
}

impl JobSpec {
    /// Starts describing a call of `method` on `target`.
    pub fn builder(target: impl Into<String>, method: impl Into<String>) -> JobBuilder {
        JobBuilder {
            target: target.into(),
            object_param: None,
            method: method.into(),
            args: Vec::new(),
            cache_key: None,
            freshness_ttl: DEFAULT_FRESHNESS_TTL,
        }
    }

    pub fn computation_key(&self) -> &ComputationKey {
        &self.cache_key
    }

    pub fn invocation(&self) -> Invocation {
        Invocation {
            object_param: self.object_param.clone(),
            args: self.args.clone(),
        }
    }
}

/// Builder for [`JobSpec`]; derives the computation key unless one is given.
#[derive(Debug, Clone)]
pub struct JobBuilder {
    target: String,
    object_param: Option<String>,
    method: String,
    args: Vec<Value>,
    cache_key: Option<ComputationKey>,
    freshness_ttl: Duration,
}

impl JobBuilder {
    /// Binds the call to one instance of the target.
    pub fn object(mut self, object_param: impl Into<String>) -> Self {
        self.object_param = Some(object_param.into());
        self
    }

    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Caches under `key` instead of the derived key.
    pub fn cache_key(mut self, key: ComputationKey) -> Self {
        self.cache_key = Some(key);
        self
    }

    pub fn freshness_ttl(mut self, ttl: Duration) -> Self {
        self.freshness_ttl = ttl;
        self
    }

    pub fn build(self) -> JobSpec {
        let cache_key = self.cache_key.unwrap_or_else(|| {
            ComputationKey::derive(
                &self.target,
                self.object_param.as_deref(),
                &self.method,
                &self.args,
            )
        });

        JobSpec {
            target: self.target,
            object_param: self.object_param,
            method: self.method,
            args: self.args,
            cache_key,
            freshness_ttl: self.freshness_ttl,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

// == Traits ==
/// A unit of cacheable work.
#[async_trait]
pub trait Computable: Send + Sync {
    /// Where the result of this computation is cached.
    fn key(&self) -> ComputationKey;

    /// Performs the computation.
    async fn run(&self) -> std::result::Result<Value, ComputeError>;
}

/// Executes jobs on behalf of promises.
///
/// Implementations must honour the worker contract for every enqueued job:
/// on success write the entry and signal completion, and in all cases release
/// the interlock. [`Worker`] implements that contract.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Queues `job` for asynchronous execution and returns once it is accepted.
    async fn enqueue(&self, job: JobSpec) -> Result<()>;

    /// Runs `job` to completion in the caller's task, populating the cache.
    async fn perform_now(&self, job: JobSpec) -> Result<Value>;
}
