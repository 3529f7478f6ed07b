//! Cache Module
//!
//! The coordination protocol: computation keys, cache entries, the interlock
//! that elects one computer, the completion signal that wakes waiters, and
//! the promise that ties them together.

mod action;
mod context;
mod entry;
mod interlock;
mod key;
mod promise;
mod signal;


// Re-export public types
pub use action::{CachedAction, GET_TIMEOUT};
pub use context::CacheContext;
pub use entry::CacheEntry;
pub use interlock::{Interlock, LOCK_MARKER};
pub use key::{args_digest, ComputationKey, NO_OBJECT};
pub use promise::{AwaitOptions, Outcome, Promise};
pub use signal::{CompletionSignal, SignalOutcome, DONE_MESSAGE};
