//! # Processed-Message Ledger
//!
//! Remembers the ids of recently applied messages so a message that is
//! redelivered after a rolled-back receive is not applied a second time.
//!
//! - Ids are kept for a validity window, then garbage-collected
//! - Collection runs lazily on insert, at most once per interval
//! - Memory is therefore bounded by the delivery rate times the window

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Time-bounded set of processed message ids.
#[derive(Debug)]
pub struct ProcessedMessageLedger {
    /// Map of message id -> timestamp when it was first applied.
    seen: HashMap<Uuid, u64>,

    /// How long an id is remembered, in seconds.
    validity_window_secs: u64,

    /// Last garbage collection timestamp.
    last_gc: u64,

    /// Garbage collection interval in seconds.
    gc_interval_secs: u64,
}

impl ProcessedMessageLedger {
    /// Default validity window: ten minutes.
    pub const DEFAULT_VALIDITY_WINDOW: u64 = 600;

    /// Default garbage collection interval.
    pub const DEFAULT_GC_INTERVAL: u64 = 30;

    /// Create a ledger with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Self::DEFAULT_VALIDITY_WINDOW, Self::DEFAULT_GC_INTERVAL)
    }

    /// Create a ledger with custom settings.
    #[must_use]
    pub fn with_config(validity_window_secs: u64, gc_interval_secs: u64) -> Self {
        Self {
            seen: HashMap::new(),
            validity_window_secs,
            last_gc: Self::current_timestamp(),
            gc_interval_secs,
        }
    }

    /// Record `id` as applied now.
    ///
    /// Returns `false` if the id was already recorded (a duplicate delivery).
    pub fn record(&mut self, id: Uuid) -> bool {
        self.record_at(id, Self::current_timestamp())
    }

    /// Record `id` as applied at `now` (Unix seconds).
    pub fn record_at(&mut self, id: Uuid, now: u64) -> bool {
        if now.saturating_sub(self.last_gc) > self.gc_interval_secs {
            self.garbage_collect(now);
            self.last_gc = now;
        }

        if self.seen.contains_key(&id) {
            return false;
        }
        self.seen.insert(id, now);
        true
    }

    /// Check if an id exists without adding it.
    #[must_use]
    pub fn contains(&self, id: &Uuid) -> bool {
        self.seen.contains_key(id)
    }

    /// Get the number of remembered ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Remove expired ids.
    fn garbage_collect(&mut self, now: u64) {
        let expiry_threshold = now.saturating_sub(self.validity_window_secs);
        self.seen.retain(|_, &mut ts| ts > expiry_threshold);
    }

    /// Get current Unix timestamp.
    fn current_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl Default for ProcessedMessageLedger {
    fn default() -> Self {
        Self::new()
    }
}
