//! Store Slot Module
//!
//! Defines a single keyed slot in the in-memory store with TTL support.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// What a slot holds: a plain byte value or a list of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValue {
    Bytes(Vec<u8>),
    /// Front = head (push side), back = tail (pop side)
    List(VecDeque<Vec<u8>>),
}

// == Slot ==
/// Represents a single store slot with value and metadata.
#[derive(Debug, Clone)]
pub struct Slot {
    /// The stored value
    pub value: SlotValue,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl Slot {
    // == Constructor ==
    /// Creates a new slot with optional TTL.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl` - Optional time to live
    pub fn new(value: SlotValue, ttl: Option<Duration>) -> Self {
        let now = current_timestamp_ms();
        Self {
            value,
            created_at: now,
            expires_at: ttl.map(|ttl| now.saturating_add(ttl_ms(ttl))),
        }
    }

    /// Creates an empty list slot without expiration.
    pub fn empty_list() -> Self {
        Self::new(SlotValue::List(VecDeque::new()), None)
    }

    // == Set TTL ==
    /// Restarts the expiration clock from now.
    pub fn set_ttl(&mut self, ttl: Duration) {
        self.expires_at = Some(current_timestamp_ms().saturating_add(ttl_ms(ttl)));
    }

    // == Is Expired ==
    /// Checks if the slot has expired.
    ///
    /// Boundary condition: a slot is expired once the current time is greater
    /// than or equal to the expiration time.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the slot has expired
    /// - `Some(remaining_ms)` if the slot has TTL and hasn't expired
    /// - `None` if the slot never expires
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }
}

// == Utility Functions ==
/// Whole milliseconds in `ttl`, saturating at `u64::MAX`.
pub fn ttl_ms(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
