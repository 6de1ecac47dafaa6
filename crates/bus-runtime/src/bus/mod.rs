//! # Service Bus Role
//!
//! The bus every endpoint runs: owner-based sends, publish/subscribe over the
//! subscription storage, and the consumer side that feeds registered
//! [`MessageConsumer`]s.
//!
//! ```text
//!  send(msg) ──► owner_of(type) ──► router.resolve ──► encode ──► modules ──► transport
//!
//!  transport ──► modules.arrived ──► decode ──► consumers ──► modules.consumed
//!                                                  │ failure
//!                                                  ▼
//!                                 retry (header + 1) or <queue>.errors
//! ```

pub mod reflection;
pub mod router;
pub mod service_bus;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::BusMessage;

use crate::error::BusError;

pub use reflection::MessageReflection;
pub use router::EndpointRouter;
pub use service_bus::{BusDependencies, DefaultServiceBus};

/// Application handler for decoded messages.
#[async_trait]
pub trait MessageConsumer: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this consumer handles `message_type`.
    fn accepts(&self, message_type: &str) -> bool;

    async fn consume(&self, message: &BusMessage) -> Result<(), BusError>;
}

/// Consumer list shared between the builder and the bus.
#[derive(Clone, Default)]
pub struct ConsumerList(Arc<RwLock<Vec<Arc<dyn MessageConsumer>>>>);

impl ConsumerList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, consumer: Arc<dyn MessageConsumer>) {
        self.0.write().push(consumer);
    }

    /// Consumers accepting `message_type`, in registration order.
    #[must_use]
    pub fn accepting(&self, message_type: &str) -> Vec<Arc<dyn MessageConsumer>> {
        self.0
            .read()
            .iter()
            .filter(|consumer| consumer.accepts(message_type))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
