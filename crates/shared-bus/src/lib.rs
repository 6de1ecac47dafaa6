//! # Shared Bus - Queue Collaborators
//!
//! The ports the topology consumes but does not own, plus in-memory
//! implementations used by the host binary and by tests.
//!
//! ```text
//!  ┌──────────────┐   encode()   ┌──────────────┐   send()    ┌───────────┐
//!  │  BusMessage  │ ───────────→ │  Serializer  │ ──────────→ │ Transport │
//!  └──────────────┘              │ (+ security) │             │  queues   │
//!         ↑         decode()     └──────────────┘  receive()  └───────────┘
//!         └────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Transport:** send / receive(timeout) / begin / commit / rollback
//! - **Serializer:** JSON with wire-encrypted fields and sealed messages
//! - **Subscription storage:** message type → subscriber endpoints
//! - **Ledger:** time-bounded record of applied message ids
//! - **Consumers:** the shared receive / commit / rollback loop

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod consumer;
pub mod ledger;
pub mod memory;
pub mod serializer;
pub mod subscriptions;
pub mod transport;

// Re-export main types
pub use consumer::{spawn_consumers, ConsumerSettings, Disposition, QueueConsumer};
pub use ledger::ProcessedMessageLedger;
pub use memory::InMemoryTransport;
pub use serializer::{JsonMessageSerializer, MessageSerializer, SerializationError};
pub use subscriptions::{InMemorySubscriptionStorage, SubscriptionStorage};
pub use transport::{TransactionId, Transport, TransportError};

use std::time::Duration;

/// How long a receive blocks before rechecking for shutdown.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(500);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_timeout_is_bounded() {
        assert!(DEFAULT_RECEIVE_TIMEOUT <= Duration::from_secs(1));
    }
}
