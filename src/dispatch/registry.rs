//! Compute Function Registry
//!
//! Maps `(target, method)` pairs onto async compute functions so a serialized
//! [`JobSpec`] can be turned back into something runnable.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::ComputationKey;
use crate::dispatch::{Computable, JobSpec};
use crate::error::{CacheError, ComputeError, Result};

/// Arguments a compute function is called with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    pub object_param: Option<String>,
    pub args: Vec<Value>,
}

type ComputeFuture = Pin<Box<dyn Future<Output = std::result::Result<Value, ComputeError>> + Send>>;
type ComputeFn = Arc<dyn Fn(Invocation) -> ComputeFuture + Send + Sync>;

/// Registered compute functions.
#[derive(Clone, Default)]
pub struct Registry {
    functions: HashMap<(String, String), ComputeFn>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `function` as the implementation of `method` on `target`.
    ///
    /// # Example
    /// ```ignore
    /// let registry = Registry::new().register("Report", "total", |call: Invocation| async move {
    ///     Ok(json!(call.args.len()))
    /// });
    /// ```
    pub fn register<F, Fut>(
        mut self,
        target: impl Into<String>,
        method: impl Into<String>,
        function: F,
    ) -> Self
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, ComputeError>> + Send + 'static,
    {
        let boxed: ComputeFn =
            Arc::new(move |call: Invocation| -> ComputeFuture { Box::pin(function(call)) });
        self.functions.insert((target.into(), method.into()), boxed);
        self
    }

    pub fn contains(&self, target: &str, method: &str) -> bool {
        self.functions
            .contains_key(&(target.to_string(), method.to_string()))
    }

    fn lookup(&self, target: &str, method: &str) -> Result<ComputeFn> {
        self.functions
            .get(&(target.to_string(), method.to_string()))
            .cloned()
            .ok_or_else(|| CacheError::UnknownComputation {
                target: target.to_string(),
                method: method.to_string(),
            })
    }

    /// Calls a compute function directly, bypassing the cache entirely.
    pub async fn call(&self, target: &str, method: &str, invocation: Invocation) -> Result<Value> {
        let function = self.lookup(target, method)?;
        Ok(function(invocation).await?)
    }

    /// Pairs `job` with its compute function.
    pub fn resolve(&self, job: &JobSpec) -> Result<BoundJob> {
        Ok(BoundJob {
            function: self.lookup(&job.target, &job.method)?,
            job: job.clone(),
        })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(
                self.functions
                    .keys()
                    .map(|(target, method)| format!("{target}.{method}")),
            )
            .finish()
    }
}

/// A job resolved against the registry, ready to run.
pub struct BoundJob {
    job: JobSpec,
    function: ComputeFn,
}

#[async_trait]
impl Computable for BoundJob {
    fn key(&self) -> ComputationKey {
        self.job.cache_key.clone()
    }

    async fn run(&self) -> std::result::Result<Value, ComputeError> {
        (self.function)(self.job.invocation()).await
    }
}
