//! Configuration Module
//!
//! Handles loading cache and store-server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default freshness window for computed values (one hour).
pub const DEFAULT_FRESHNESS_TTL: Duration = Duration::from_secs(60 * 60);

/// Default physical lifetime of a cache entry (30 days).
pub const DEFAULT_BACKSTOP_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default lifetime of a completion signal.
pub const DEFAULT_SIGNAL_TTL: Duration = Duration::from_millis(1000);

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// == Cache Config ==
/// Parameters shared by every promise, interlock and worker.
///
/// The generation tag is threaded explicitly into every entry write and
/// freshness check. Bump it (for example on deployment) to invalidate all
/// previously written entries at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a computed value is considered fresh
    pub freshness_ttl: Duration,
    /// Lifetime of an election lock; `None` falls back to `freshness_ttl`
    pub interlock_ttl: Option<Duration>,
    /// Cache-namespace epoch recorded in every entry
    pub generation: String,
    /// Physical lifetime of an entry in the store, independent of freshness
    pub backstop_ttl: Duration,
    /// Lifetime of the completion signal list
    pub signal_ttl: Duration,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FRESHNESS_TTL_SECS` - Freshness window (default: 3600)
    /// - `INTERLOCK_TTL_SECS` - Election lock lifetime (default: freshness window)
    /// - `CACHE_GENERATION` - Generation tag (default: crate version)
    /// - `BACKSTOP_TTL_SECS` - Physical entry lifetime (default: 30 days)
    /// - `SIGNAL_TTL_MS` - Completion signal lifetime (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            freshness_ttl: Duration::from_secs(env_or(
                "FRESHNESS_TTL_SECS",
                defaults.freshness_ttl.as_secs(),
            )),
            interlock_ttl: env::var("INTERLOCK_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs),
            generation: env::var("CACHE_GENERATION").unwrap_or(defaults.generation),
            backstop_ttl: Duration::from_secs(env_or(
                "BACKSTOP_TTL_SECS",
                defaults.backstop_ttl.as_secs(),
            )),
            signal_ttl: Duration::from_millis(env_or(
                "SIGNAL_TTL_MS",
                defaults.signal_ttl.as_millis() as u64,
            )),
        }
    }

    /// Election lock lifetime for a job fresh for `freshness_ttl`.
    pub fn interlock_ttl_for(&self, freshness_ttl: Duration) -> Duration {
        self.interlock_ttl.unwrap_or(freshness_ttl)
    }

    /// Set the freshness window.
    pub fn with_freshness_ttl(mut self, ttl: Duration) -> Self {
        self.freshness_ttl = ttl;
        self
    }

    /// Set an explicit election lock lifetime.
    pub fn with_interlock_ttl(mut self, ttl: Duration) -> Self {
        self.interlock_ttl = Some(ttl);
        self
    }

    /// Set the generation tag.
    pub fn with_generation(mut self, generation: impl Into<String>) -> Self {
        self.generation = generation.into();
        self
    }

    /// Set the physical entry lifetime.
    pub fn with_backstop_ttl(mut self, ttl: Duration) -> Self {
        self.backstop_ttl = ttl;
        self
    }

    /// Set the completion signal lifetime.
    pub fn with_signal_ttl(mut self, ttl: Duration) -> Self {
        self.signal_ttl = ttl;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            freshness_ttl: DEFAULT_FRESHNESS_TTL,
            interlock_ttl: None,
            generation: env!("CARGO_PKG_VERSION").to_string(),
            backstop_ttl: DEFAULT_BACKSTOP_TTL,
            signal_ttl: DEFAULT_SIGNAL_TTL,
        }
    }
}

// == Server Config ==
/// Store server configuration parameters.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Serve as a read-only replica, rejecting every write
    pub read_only: bool,
}

impl ServerConfig {
    /// Creates a new ServerConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 6380)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `READ_ONLY` - Start as a read-only replica (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            read_only: env_or("READ_ONLY", defaults.read_only),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_port: 6380,
            cleanup_interval: 1,
            read_only: false,
        }
    }
}
