//! Promise
//!
//! Orchestrates one requester's view of a cached computation: check the entry,
//! elect a computer through the interlock, wait on the completion signal and
//! apply the staleness policy when the wait runs out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CompletionSignal, ComputationKey, Interlock, SignalOutcome};
use crate::config::CacheConfig;
use crate::dispatch::{Dispatcher, JobSpec};
use crate::error::{CacheError, Result};
use crate::store::{ttl_ms, SharedStore};

// == Outcome ==
/// Result of awaiting a promise.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A fresh value, either already cached or just computed
    Ready(Value),
    /// The previous, stale value, served because the wait timed out
    Stale(Value),
    /// Nothing to serve within the timeout
    TimedOut,
}

impl Outcome {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Ready(value) | Outcome::Stale(value) => Some(value),
            Outcome::TimedOut => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Outcome::Ready(value) | Outcome::Stale(value) => Some(value),
            Outcome::TimedOut => None,
        }
    }

    /// True only when there is no value at all.
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Outcome::TimedOut)
    }
}

/// Policy applied when a wait runs out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AwaitOptions {
    /// Return `CacheError::Timeout` instead of `Outcome::TimedOut`
    pub raise_on_timeout: bool,
    /// Serve the previous entry, if any, instead of timing out
    pub serve_stale_on_timeout: bool,
}

impl AwaitOptions {
    pub fn raise_on_timeout(mut self) -> Self {
        self.raise_on_timeout = true;
        self
    }

    pub fn serve_stale_on_timeout(mut self) -> Self {
        self.serve_stale_on_timeout = true;
        self
    }
}

// == Promise ==
/// A requester's handle on one cached computation.
pub struct Promise {
    job: JobSpec,
    config: CacheConfig,
    store: SharedStore,
    dispatcher: Arc<dyn Dispatcher>,
    interlock: Interlock,
    signal: CompletionSignal,
    interlock_ttl: Option<Duration>,
    timed_out: AtomicBool,
}

impl Promise {
    pub fn new(
        job: JobSpec,
        store: SharedStore,
        dispatcher: Arc<dyn Dispatcher>,
        config: CacheConfig,
    ) -> Self {
        let interlock = Interlock::new(store.clone(), &job.cache_key);
        let signal = CompletionSignal::new(store.clone(), config.signal_ttl);

        Self {
            job,
            config,
            store,
            dispatcher,
            interlock,
            signal,
            interlock_ttl: None,
            timed_out: AtomicBool::new(false),
        }
    }

    /// Overrides how long an election win blocks other computers.
    pub fn with_interlock_ttl(mut self, ttl: Duration) -> Self {
        self.interlock_ttl = Some(ttl);
        self
    }

    pub fn computation_key(&self) -> &ComputationKey {
        &self.job.cache_key
    }

    fn lease(&self) -> Duration {
        self.interlock_ttl
            .unwrap_or_else(|| self.config.interlock_ttl_for(self.job.freshness_ttl))
    }

    // == Cache Reads ==
    pub async fn current_result(&self) -> Result<Option<CacheEntry>> {
        Ok(CacheEntry::load(self.store.as_ref(), self.computation_key()).await?)
    }

    /// The cached value if there is one, never triggering a computation.
    pub async fn existing_value(&self, allow_stale: bool) -> Result<Option<Value>> {
        let value = self
            .current_result()
            .await?
            .filter(|entry| allow_stale || entry.is_fresh(&self.config.generation))
            .map(|entry| entry.value);
        Ok(value)
    }

    /// Whether an entry exists but has gone stale.
    pub async fn is_stale_value_available(&self) -> Result<bool> {
        Ok(self
            .current_result()
            .await?
            .is_some_and(|entry| entry.is_stale(&self.config.generation)))
    }

    /// Whether some party is computing this key right now.
    pub async fn is_working(&self) -> Result<bool> {
        Ok(self.interlock.is_held().await?)
    }

    /// Whether the last wait on this promise ran out.
    pub fn timed_out(&self) -> bool {
        self.timed_out.load(Ordering::SeqCst)
    }

    // == Protocol ==
    /// Dispatches the computation unless another party already holds the
    /// interlock. Safe to call repeatedly.
    pub async fn start(&self) -> Result<&Self> {
        let key = self.computation_key();

        if !self.interlock.try_acquire(self.lease()).await? {
            debug!(key = %key, "computation already in progress");
            return Ok(self);
        }

        info!(key = %key, "won interlock, dispatching computation");
        if let Err(err) = self.dispatcher.enqueue(self.job.clone()).await {
            warn!(key = %key, error = %err, "dispatch failed, releasing interlock");
            if let Err(release_err) = self.interlock.release().await {
                warn!(key = %key, error = %release_err, "failed to release interlock");
            }
            return Err(err);
        }
        Ok(self)
    }

    /// Returns the value, computing it if needed and waiting up to `timeout`.
    ///
    /// A fresh entry returns at once without touching the interlock. A zero
    /// `timeout` starts the computation but does not wait for it. A signal
    /// only counts if the entry it leaves behind is fresh.
    pub async fn await_result(&self, timeout: Duration, options: AwaitOptions) -> Result<Outcome> {
        let key = self.computation_key();
        let mut previous = self.current_result().await?;

        if let Some(entry) = &previous {
            if entry.is_fresh(&self.config.generation) {
                debug!(key = %key, "fresh entry");
                self.timed_out.store(false, Ordering::SeqCst);
                return Ok(Outcome::Ready(entry.value.clone()));
            }
        }

        self.start().await?;

        let waited = if timeout.is_zero() {
            SignalOutcome::TimedOut
        } else {
            self.signal.wait(key, timeout).await?
        };

        if waited == SignalOutcome::Signaled {
            match self.current_result().await? {
                Some(entry) if entry.is_fresh(&self.config.generation) => {
                    debug!(key = %key, "computation finished");
                    self.timed_out.store(false, Ordering::SeqCst);
                    return Ok(Outcome::Ready(entry.value));
                }
                Some(entry) => {
                    warn!(key = %key, "signaled but entry is still stale");
                    previous = Some(entry);
                }
                None => warn!(key = %key, "signaled but no entry found"),
            }
        }

        self.timed_out.store(true, Ordering::SeqCst);

        if options.serve_stale_on_timeout {
            if let Some(entry) = previous {
                warn!(key = %key, "timed out awaiting computation, serving stale");
                return Ok(Outcome::Stale(entry.value));
            }
        }

        warn!(key = %key, timeout_ms = ttl_ms(timeout), "timed out awaiting computation");
        if options.raise_on_timeout {
            return Err(CacheError::Timeout(key.to_string()));
        }
        Ok(Outcome::TimedOut)
    }

    /// Like [`Promise::await_result`] but a timeout is always an error.
    pub async fn fetch(&self, timeout: Duration, serve_stale_on_timeout: bool) -> Result<Value> {
        let mut options = AwaitOptions::default().raise_on_timeout();
        options.serve_stale_on_timeout = serve_stale_on_timeout;

        self.await_result(timeout, options)
            .await?
            .into_value()
            .ok_or_else(|| CacheError::Timeout(self.computation_key().to_string()))
    }

    /// Whether a fresh value became available within `timeout`.
    pub async fn ready_within(&self, timeout: Duration) -> Result<bool> {
        let outcome = self.await_result(timeout, AwaitOptions::default()).await?;
        Ok(matches!(outcome, Outcome::Ready(_)))
    }

    /// Recomputes in the caller's task, bypassing the interlock.
    pub async fn refresh(&self) -> Result<Value> {
        info!(key = %self.computation_key(), "refreshing");
        self.dispatcher.perform_now(self.job.clone()).await
    }
}
