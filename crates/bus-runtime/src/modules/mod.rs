//! # Message Modules
//!
//! Hooks into the bus lifecycle. The bus calls every registered module, in
//! registration order, at four points:
//!
//! | Hook | When |
//! |------|------|
//! | `on_started` | once, before consumer tasks spawn |
//! | `on_message_arrived` | after a receive, before decoding |
//! | `on_message_consumed` | after consumers ran, success or not |
//! | `on_message_sent` | before the transport send |
//!
//! A failing hook is logged and never aborts message handling.

pub mod load_balancer;
pub mod logging;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{MessageSerializer, Transport};
use shared_types::{Endpoint, QueueMessage};

use crate::error::BusError;

pub use load_balancer::LoadBalancerMessageModule;
pub use logging::{MessageLogRecord, MessageLoggingModule, LOG_RECORD_MESSAGE_TYPE};

/// What a module may use from the bus that invokes it.
#[derive(Clone)]
pub struct ModuleContext {
    /// Endpoint the bus consumes from.
    pub endpoint: Endpoint,
    pub thread_count: usize,
    pub transport: Arc<dyn Transport>,
    pub serializer: Arc<dyn MessageSerializer>,
}

#[async_trait]
pub trait MessageModule: Send + Sync {
    fn name(&self) -> &str;

    async fn on_started(&self, _ctx: &ModuleContext) -> Result<(), BusError> {
        Ok(())
    }

    async fn on_message_arrived(
        &self,
        _ctx: &ModuleContext,
        _message: &QueueMessage,
    ) -> Result<(), BusError> {
        Ok(())
    }

    async fn on_message_consumed(
        &self,
        _ctx: &ModuleContext,
        _message: &QueueMessage,
        _succeeded: bool,
    ) -> Result<(), BusError> {
        Ok(())
    }

    async fn on_message_sent(
        &self,
        _ctx: &ModuleContext,
        _destination: &Endpoint,
        _message: &QueueMessage,
    ) -> Result<(), BusError> {
        Ok(())
    }
}

/// Module list shared between the builder and the bus.
///
/// Modules registered after the bus was created are still invoked.
#[derive(Clone, Default)]
pub struct ModuleList(Arc<RwLock<Vec<Arc<dyn MessageModule>>>>);

impl ModuleList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, module: Arc<dyn MessageModule>) {
        self.0.write().push(module);
    }

    /// Copy of the current list, so hooks run without holding the lock.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<dyn MessageModule>> {
        self.0.read().clone()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.0.read().iter().map(|m| m.name().to_string()).collect()
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
