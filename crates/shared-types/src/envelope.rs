//! # Queue Envelope
//!
//! The unit handed to and returned from a transport. The body is opaque
//! (produced by a `MessageSerializer`); routing only needs the headers.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::endpoint::Endpoint;

/// Header carrying the number of failed consumption attempts.
pub const RETRY_COUNT_HEADER: &str = "qb-retry-count";

/// A message as stored on a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    /// Unique message identifier. Stable across retries and forwards.
    pub id: Uuid,
    /// Logical message type name, e.g. `Orders.Commands.PlaceOrder`.
    pub message_type: String,
    /// Free-form transport headers.
    pub headers: BTreeMap<String, String>,
    /// Encoded payload.
    pub body: Vec<u8>,
    /// Endpoint that originally sent the message.
    pub source: Option<Endpoint>,
    /// Unix timestamp (seconds) of the first send.
    pub sent_at: u64,
}

impl QueueMessage {
    /// Create a new envelope with a fresh id.
    #[must_use]
    pub fn new(message_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message_type: message_type.into(),
            headers: BTreeMap::new(),
            body,
            source: None,
            sent_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: Endpoint) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Number of failed consumption attempts recorded so far.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.header(RETRY_COUNT_HEADER)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Record one more failed attempt.
    pub fn increment_retry_count(&mut self) -> u32 {
        let next = self.retry_count().saturating_add(1);
        self.headers
            .insert(RETRY_COUNT_HEADER.to_string(), next.to_string());
        next
    }
}
