//! Announces this bus' free capacity to its load balancer.

use std::sync::Arc;

use async_trait::async_trait;
use qb_02_load_balancer::ReadyForWork;
use shared_types::{Endpoint, QueueMessage};
use tracing::debug;

use crate::bus::EndpointRouter;
use crate::error::BusError;
use crate::modules::{MessageModule, ModuleContext};

/// Makes a bus a worker of a load balancer.
///
/// On start it declares `thread_count` free slots; after every consumed
/// message it gives one slot back.
pub struct LoadBalancerMessageModule {
    load_balancer: Endpoint,
    router: Arc<EndpointRouter>,
}

impl LoadBalancerMessageModule {
    #[must_use]
    pub fn new(load_balancer: Endpoint, router: Arc<EndpointRouter>) -> Self {
        Self {
            load_balancer,
            router,
        }
    }

    #[must_use]
    pub fn load_balancer_endpoint(&self) -> &Endpoint {
        &self.load_balancer
    }

    async fn announce(&self, ctx: &ModuleContext, capacity: u32) -> Result<(), BusError> {
        let signal = ReadyForWork::new(ctx.endpoint.clone(), capacity);
        let message = signal.to_queue_message(ctx.serializer.as_ref())?;
        let destination = self.router.resolve(&self.load_balancer);
        ctx.transport.send(&destination, message, None).await?;
        debug!(worker = %ctx.endpoint, %destination, capacity, "Ready for work announced");
        Ok(())
    }
}

#[async_trait]
impl MessageModule for LoadBalancerMessageModule {
    fn name(&self) -> &str {
        "load-balancer"
    }

    async fn on_started(&self, ctx: &ModuleContext) -> Result<(), BusError> {
        let capacity = u32::try_from(ctx.thread_count).unwrap_or(u32::MAX);
        self.announce(ctx, capacity).await
    }

    async fn on_message_consumed(
        &self,
        ctx: &ModuleContext,
        _message: &QueueMessage,
        _succeeded: bool,
    ) -> Result<(), BusError> {
        self.announce(ctx, 1).await
    }
}

#[cfg(test)]
mod tests {
    use shared_bus::{InMemoryTransport, JsonMessageSerializer, MessageSerializer, Transport};

    use super::*;

    #[tokio::test]
    async fn test_announces_thread_count_then_single_slots() {
        let transport = Arc::new(InMemoryTransport::new());
        let worker = Endpoint::parse("memory://localhost/worker").unwrap();
        let balancer = Endpoint::parse("memory://localhost/balancer").unwrap();
        transport.create_queue(&balancer).await.unwrap();

        let serializer: Arc<dyn MessageSerializer> = Arc::new(JsonMessageSerializer::new());
        let ctx = ModuleContext {
            endpoint: worker.clone(),
            thread_count: 3,
            transport: transport.clone(),
            serializer: serializer.clone(),
        };
        let module =
            LoadBalancerMessageModule::new(balancer.clone(), Arc::new(EndpointRouter::new()));

        module.on_started(&ctx).await.unwrap();
        let job = QueueMessage::new("Orders.Commands.PlaceOrder", Vec::new());
        module.on_message_consumed(&ctx, &job, true).await.unwrap();

        let capacities: Vec<u32> = transport
            .peek_all(&balancer)
            .iter()
            .map(|m| ReadyForWork::from_queue_message(m, serializer.as_ref()).unwrap())
            .inspect(|signal| assert_eq!(signal.endpoint, worker))
            .map(|signal| signal.capacity)
            .collect();
        assert_eq!(capacities, vec![3, 1]);
    }
}
