//! The default service bus.

use std::sync::Arc;

use async_trait::async_trait;
use bus_telemetry::{MESSAGES_CONSUMED, MESSAGES_SENT, SECURITY_REJECTIONS};
use qb_01_configuration::BusConfiguration;
use shared_bus::{
    spawn_consumers, ConsumerSettings, Disposition, MessageSerializer, QueueConsumer,
    SubscriptionStorage, TransactionId, Transport,
};
use shared_types::{BusMessage, Endpoint, IsolationLevel, MessageOwners, QueueMessage};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bus::{ConsumerList, EndpointRouter, MessageReflection};
use crate::error::BusError;
use crate::modules::{ModuleContext, ModuleList};

/// Header naming why a message was moved to the error queue.
pub const ERROR_REASON_HEADER: &str = "qb-error-reason";

/// Collaborators the bus is built from.
#[derive(Clone)]
pub struct BusDependencies {
    pub transport: Arc<dyn Transport>,
    pub subscriptions: Arc<dyn SubscriptionStorage>,
    pub serializer: Arc<dyn MessageSerializer>,
    pub reflection: Arc<MessageReflection>,
    pub router: Arc<EndpointRouter>,
    pub modules: ModuleList,
    pub consumers: ConsumerList,
}

pub struct DefaultServiceBus {
    error_queue: Endpoint,
    number_of_retries: u32,
    transactional: bool,
    isolation_level: IsolationLevel,
    owners: MessageOwners,
    subscriptions: Arc<dyn SubscriptionStorage>,
    reflection: Arc<MessageReflection>,
    router: Arc<EndpointRouter>,
    modules: ModuleList,
    consumers: ConsumerList,
    ctx: ModuleContext,
}

impl DefaultServiceBus {
    #[must_use]
    pub fn new(config: &BusConfiguration, deps: BusDependencies) -> Self {
        let transactional = config.is_transactional() && config.consume_in_transaction;
        info!(
            endpoint = %config.endpoint,
            threads = config.thread_count,
            retries = config.number_of_retries,
            transactional,
            isolation = %config.queue_isolation_level,
            use_dtc = config.use_dtc,
            owners = config.message_owners.len(),
            "Service bus created"
        );
        Self {
            error_queue: config.error_queue(),
            number_of_retries: config.number_of_retries,
            transactional,
            isolation_level: config.queue_isolation_level,
            owners: config.message_owners.clone(),
            subscriptions: deps.subscriptions,
            reflection: deps.reflection,
            router: deps.router,
            modules: deps.modules,
            consumers: deps.consumers,
            ctx: ModuleContext {
                endpoint: config.endpoint.clone(),
                thread_count: config.thread_count,
                transport: deps.transport,
                serializer: deps.serializer,
            },
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.ctx.endpoint
    }

    #[must_use]
    pub fn error_queue(&self) -> &Endpoint {
        &self.error_queue
    }

    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.ctx.thread_count
    }

    #[must_use]
    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    #[must_use]
    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    #[must_use]
    pub fn owners(&self) -> &MessageOwners {
        &self.owners
    }

    #[must_use]
    pub fn modules(&self) -> &ModuleList {
        &self.modules
    }

    #[must_use]
    pub fn consumers(&self) -> &ConsumerList {
        &self.consumers
    }

    /// Queues this bus needs deployed.
    #[must_use]
    pub fn queues(&self) -> Vec<Endpoint> {
        vec![self.ctx.endpoint.clone(), self.error_queue.clone()]
    }

    /// Send to the owner of the message's type. Returns the owner endpoint.
    ///
    /// # Errors
    ///
    /// `NoOwner` if no owner selects the type; otherwise encode and transport
    /// failures. Encrypted content without negotiated security is rejected
    /// before anything is sent.
    pub async fn send(&self, message: &BusMessage) -> Result<Endpoint, BusError> {
        let owner = self.owner_endpoint(self.reflection.type_name(message))?;
        self.send_to(&owner, message).await?;
        Ok(owner)
    }

    /// Send to an explicit endpoint, after router remapping.
    pub async fn send_to(
        &self,
        destination: &Endpoint,
        message: &BusMessage,
    ) -> Result<(), BusError> {
        let destination = self.router.resolve(destination);
        let body = self.encode(message)?;
        let envelope = QueueMessage::new(self.reflection.type_name(message), body)
            .with_source(self.ctx.endpoint.clone());

        for module in self.modules.snapshot() {
            if let Err(e) = module.on_message_sent(&self.ctx, &destination, &envelope).await {
                warn!(module = module.name(), error = %e, "Send hook failed");
            }
        }

        let id = envelope.id;
        self.ctx.transport.send(&destination, envelope, None).await?;
        MESSAGES_SENT.inc();
        debug!(%id, message_type = %message.message_type, %destination, "Message sent");
        Ok(())
    }

    /// Send to every subscriber of the message's type.
    ///
    /// # Errors
    ///
    /// `NoSubscribers` when nobody subscribed; stops at the first failed send.
    pub async fn publish(&self, message: &BusMessage) -> Result<usize, BusError> {
        let message_type = self.reflection.type_name(message);
        let subscribers = self.subscriptions.subscribers_of(message_type);
        if subscribers.is_empty() {
            return Err(BusError::NoSubscribers {
                message_type: message_type.to_string(),
            });
        }
        for subscriber in &subscribers {
            self.send_to(subscriber, message).await?;
        }
        Ok(subscribers.len())
    }

    /// Subscribe this bus to `message_type` at its owner.
    ///
    /// # Errors
    ///
    /// `NoOwner` if no owner selects the type.
    pub fn subscribe(&self, message_type: &str) -> Result<Endpoint, BusError> {
        let owner = self.owner_endpoint(message_type)?;
        self.subscriptions
            .add_subscription(message_type, &self.ctx.endpoint);
        info!(message_type, %owner, subscriber = %self.ctx.endpoint, "Subscribed");
        Ok(owner)
    }

    pub fn unsubscribe(&self, message_type: &str) {
        self.subscriptions
            .remove_subscription(message_type, &self.ctx.endpoint);
    }

    /// Run module start hooks, then spawn `thread_count` consumer tasks.
    pub async fn start(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        for module in self.modules.snapshot() {
            if let Err(e) = module.on_started(&self.ctx).await {
                warn!(module = module.name(), error = %e, "Start hook failed");
            }
        }

        info!(
            endpoint = %self.ctx.endpoint,
            threads = self.ctx.thread_count,
            modules = ?self.modules.names(),
            consumers = self.consumers.len(),
            "Service bus started"
        );
        let consumer: Arc<dyn QueueConsumer> = self.clone();
        spawn_consumers(
            ConsumerSettings {
                role: "bus",
                endpoint: self.ctx.endpoint.clone(),
                thread_count: self.ctx.thread_count,
                transactional: self.transactional,
            },
            Arc::clone(&self.ctx.transport),
            consumer,
            shutdown,
        )
    }

    fn owner_endpoint(&self, message_type: &str) -> Result<Endpoint, BusError> {
        self.owners
            .owner_of(message_type)
            .map(|owner| owner.endpoint.clone())
            .ok_or_else(|| BusError::NoOwner {
                message_type: message_type.to_string(),
            })
    }

    fn encode(&self, message: &BusMessage) -> Result<Vec<u8>, BusError> {
        self.ctx.serializer.encode(message).map_err(|e| {
            let e = BusError::from(e);
            if e.is_security_rejection() {
                SECURITY_REJECTIONS.inc();
                error!(message_type = %message.message_type, error = %e, "Refusing to send");
            }
            e
        })
    }

    async fn dispatch(&self, message: &BusMessage) -> Result<(), BusError> {
        let consumers = self.consumers.accepting(&message.message_type);
        if consumers.is_empty() {
            debug!(message_type = %message.message_type, "No consumer for message");
        }
        for consumer in consumers {
            consumer.consume(message).await?;
        }
        Ok(())
    }

    /// Retry via this bus' own queue, or give up to the error queue.
    async fn handle_failure(
        &self,
        message: &QueueMessage,
        tx: Option<TransactionId>,
        reason: &BusError,
    ) -> Disposition {
        let mut retry = message.clone();
        let attempts = retry.increment_retry_count();
        if attempts >= self.number_of_retries {
            return self.move_to_error_queue(retry, tx, &reason.to_string()).await;
        }

        warn!(id = %message.id, attempts, error = %reason, "Consumer failed, retrying");
        match self.ctx.transport.send(&self.ctx.endpoint, retry, tx).await {
            Ok(()) => Disposition::Commit,
            Err(e) => {
                error!(id = %message.id, error = %e, "Failed to requeue for retry");
                Disposition::Rollback
            }
        }
    }

    async fn move_to_error_queue(
        &self,
        message: QueueMessage,
        tx: Option<TransactionId>,
        reason: &str,
    ) -> Disposition {
        let id = message.id;
        let message = message.with_header(ERROR_REASON_HEADER, reason);
        match self.ctx.transport.send(&self.error_queue, message, tx).await {
            Ok(()) => {
                warn!(%id, error_queue = %self.error_queue, reason, "Message moved to error queue");
                Disposition::Commit
            }
            Err(e) => {
                error!(%id, error = %e, "Failed to move message to error queue");
                Disposition::Rollback
            }
        }
    }
}

#[async_trait]
impl QueueConsumer for DefaultServiceBus {
    async fn consume(&self, message: QueueMessage, tx: Option<TransactionId>) -> Disposition {
        for module in self.modules.snapshot() {
            if let Err(e) = module.on_message_arrived(&self.ctx, &message).await {
                warn!(module = module.name(), error = %e, "Arrival hook failed");
            }
        }

        let decoded = match self.ctx.serializer.decode(&message.body) {
            Ok(decoded) => decoded,
            Err(e) => {
                let e = BusError::from(e);
                if e.is_security_rejection() {
                    SECURITY_REJECTIONS.inc();
                }
                return self.move_to_error_queue(message, tx, &e.to_string()).await;
            }
        };

        let outcome = self.dispatch(&decoded).await;
        let succeeded = outcome.is_ok();
        for module in self.modules.snapshot() {
            if let Err(e) = module.on_message_consumed(&self.ctx, &message, succeeded).await {
                warn!(module = module.name(), error = %e, "Consumed hook failed");
            }
        }

        match outcome {
            Ok(()) => {
                MESSAGES_CONSUMED.inc();
                Disposition::Commit
            }
            Err(e) => self.handle_failure(&message, tx, &e).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use shared_bus::{InMemorySubscriptionStorage, InMemoryTransport, JsonMessageSerializer};
    use shared_crypto::SecurityError;
    use shared_types::{MessageOwner, RETRY_COUNT_HEADER};

    use super::*;
    use crate::bus::MessageConsumer;

    struct FailingConsumer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MessageConsumer for FailingConsumer {
        fn name(&self) -> &str {
            "failing"
        }

        fn accepts(&self, message_type: &str) -> bool {
            message_type.starts_with("Orders.")
        }

        async fn consume(&self, _message: &BusMessage) -> Result<(), BusError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(BusError::Consumer {
                consumer: "failing".into(),
                reason: "always".into(),
            })
        }
    }

    fn endpoint(path: &str) -> Endpoint {
        Endpoint::parse(&format!("memory://localhost/{path}")).unwrap()
    }

    async fn bus_with(
        config: BusConfiguration,
        consumers: ConsumerList,
    ) -> (Arc<InMemoryTransport>, DefaultServiceBus) {
        let transport = Arc::new(InMemoryTransport::new());
        let deps = BusDependencies {
            transport: transport.clone(),
            subscriptions: Arc::new(InMemorySubscriptionStorage::new()),
            serializer: Arc::new(JsonMessageSerializer::new()),
            reflection: Arc::new(MessageReflection::new()),
            router: Arc::new(EndpointRouter::new()),
            modules: ModuleList::new(),
            consumers,
        };
        let bus = DefaultServiceBus::new(&config, deps);
        for queue in bus.queues() {
            transport.create_queue(&queue).await.unwrap();
        }
        (transport, bus)
    }

    #[tokio::test]
    async fn test_send_routes_to_first_matching_owner() {
        let config = BusConfiguration::new(endpoint("client"))
            .with_message_owner(MessageOwner::new("Orders", endpoint("orders")))
            .with_message_owner(MessageOwner::new("Orders.Commands", endpoint("never")));
        let (transport, bus) = bus_with(config, ConsumerList::new()).await;
        transport.create_queue(&endpoint("orders")).await.unwrap();

        let owner = bus
            .send(&BusMessage::new("Orders.Commands.PlaceOrder"))
            .await
            .unwrap();

        assert_eq!(owner, endpoint("orders"));
        let sent = transport.peek_all(&endpoint("orders"));
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].source.as_ref(), Some(&endpoint("client")));
    }

    #[tokio::test]
    async fn test_send_without_owner_fails() {
        let (_transport, bus) =
            bus_with(BusConfiguration::new(endpoint("client")), ConsumerList::new()).await;

        let err = bus.send(&BusMessage::new("Billing.Charge")).await.unwrap_err();
        assert!(matches!(err, BusError::NoOwner { .. }));
    }

    #[tokio::test]
    async fn test_encrypted_field_refused_without_security() {
        let config = BusConfiguration::new(endpoint("client"))
            .with_message_owner(MessageOwner::new("Orders", endpoint("orders")));
        let (transport, bus) = bus_with(config, ConsumerList::new()).await;
        transport.create_queue(&endpoint("orders")).await.unwrap();

        let message =
            BusMessage::new("Orders.Commands.PlaceOrder").with_encrypted_field("card", "4111");
        let err = bus.send(&message).await.unwrap_err();

        assert!(err.is_security_rejection());
        assert!(matches!(
            err,
            BusError::Serialization(shared_bus::SerializationError::Security(
                SecurityError::SecurityDisabled { .. }
            ))
        ));
        assert_eq!(transport.depth(&endpoint("orders")), 0);
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let config = BusConfiguration::new(endpoint("orders"))
            .with_message_owner(MessageOwner::new("Orders.Events", endpoint("orders")));
        let (transport, bus) = bus_with(config, ConsumerList::new()).await;

        let none = bus.publish(&BusMessage::new("Orders.Events.Placed")).await;
        assert!(matches!(none, Err(BusError::NoSubscribers { .. })));

        assert_eq!(bus.subscribe("Orders.Events.Placed").unwrap(), endpoint("orders"));
        let delivered = bus.publish(&BusMessage::new("Orders.Events.Placed")).await.unwrap();

        assert_eq!(delivered, 1);
        assert_eq!(transport.depth(&endpoint("orders")), 1);
    }

    #[tokio::test]
    async fn test_failures_retried_then_moved_to_error_queue() {
        let consumer = Arc::new(FailingConsumer {
            calls: AtomicUsize::new(0),
        });
        let consumers = ConsumerList::new();
        consumers.push(consumer.clone());
        let config = BusConfiguration::new(endpoint("orders")).with_number_of_retries(2);
        let (transport, bus) = bus_with(config, consumers).await;

        let body = JsonMessageSerializer::new()
            .encode(&BusMessage::new("Orders.Commands.PlaceOrder"))
            .unwrap();
        let original = QueueMessage::new("Orders.Commands.PlaceOrder", body);

        assert_eq!(bus.consume(original.clone(), None).await, Disposition::Commit);
        let retried = transport.peek_all(&endpoint("orders"));
        assert_eq!(retried.len(), 1);
        assert_eq!(retried[0].header(RETRY_COUNT_HEADER), Some("1"));

        let retried = retried.into_iter().next().unwrap();
        assert_eq!(bus.consume(retried, None).await, Disposition::Commit);

        let errors = transport.peek_all(bus.error_queue());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].id, original.id);
        assert!(errors[0].header(ERROR_REASON_HEADER).is_some());
        assert_eq!(consumer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_undecodable_message_goes_to_error_queue() {
        let (transport, bus) =
            bus_with(BusConfiguration::new(endpoint("orders")), ConsumerList::new()).await;

        let garbage = QueueMessage::new("Orders.Commands.PlaceOrder", b"not json".to_vec());
        assert_eq!(bus.consume(garbage, None).await, Disposition::Commit);
        assert_eq!(transport.depth(bus.error_queue()), 1);
    }
}
