//! # Composition Scenarios
//!
//! Extensions discovered from the scan set, components registered through
//! the capability registry, and fail-fast on unregistered roles.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use bus_runtime::{
        compose, BusConfigurationAware, BusContainerBuilder, BusError, Capability, Component,
        ComponentInstance, CompositionError, DefaultServiceBus, ExtensionRegistry,
        MessageConsumer, ServiceLocator,
    };
    use qb_01_configuration::BusConfiguration;
    use shared_types::{BusMessage, MessageOwner};
    use tokio::sync::mpsc;

    use crate::integration::fixtures::{builder, endpoint};

    /// Forwards every consumed message type to a channel.
    struct Forwarding {
        seen: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl MessageConsumer for Forwarding {
        fn name(&self) -> &str {
            "forwarding"
        }

        fn accepts(&self, message_type: &str) -> bool {
            message_type.starts_with("Orders.")
        }

        async fn consume(&self, message: &BusMessage) -> Result<(), BusError> {
            let _ = self.seen.send(message.message_type.clone());
            Ok(())
        }
    }

    /// Registers every consumer component when its module is scanned.
    struct RegisterConsumers;

    impl BusConfigurationAware for RegisterConsumers {
        fn configure(
            &self,
            _config: &BusConfiguration,
            builder: &dyn BusContainerBuilder,
            _locator: &ServiceLocator,
        ) -> Result<(), CompositionError> {
            builder.register_all(Capability::MessageConsumer, &[])?;
            Ok(())
        }
    }

    /// Needs the bus while default services are still being registered.
    struct NeedsBus;

    impl BusConfigurationAware for NeedsBus {
        fn configure(
            &self,
            _config: &BusConfiguration,
            _builder: &dyn BusContainerBuilder,
            locator: &ServiceLocator,
        ) -> Result<(), CompositionError> {
            locator.resolve::<Arc<DefaultServiceBus>>()?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_scanned_extension_registers_consumer_that_receives_messages() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let registry = ExtensionRegistry::new()
            .with_extension("orders-handlers", Arc::new(RegisterConsumers))
            .with_component(Component::new(
                "forwarding",
                "orders-handlers",
                Capability::MessageConsumer,
                move |_| {
                    Ok(ComponentInstance::Consumer(Arc::new(Forwarding {
                        seen: tx.clone(),
                    })))
                },
            ));
        let config = BusConfiguration::new(endpoint("orders"))
            .with_scan_assembly("orders-handlers")
            .with_message_owner(MessageOwner::new("Orders", endpoint("orders")));
        let (_transport, builder) = builder(config);
        let builder = builder.with_extensions(registry);

        let topology = compose(&builder).unwrap();
        topology.deploy().await.unwrap();
        topology.start().await;

        topology
            .bus()
            .send(&BusMessage::new("Orders.Commands.PlaceOrder").with_field("quantity", 3))
            .await
            .unwrap();

        let seen = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seen, "Orders.Commands.PlaceOrder");
        assert!(topology.locator().contains_named("forwarding"));

        topology.shutdown().await;
    }

    #[test]
    fn test_unregistered_role_fails_composition() {
        let config = BusConfiguration::new(endpoint("orders")).with_scan_assembly("early");
        let (_transport, builder) = builder(config);
        let builder =
            builder.with_extensions(ExtensionRegistry::new().with_extension("early", Arc::new(NeedsBus)));

        let err = compose(&builder).err().unwrap();

        assert!(matches!(err, CompositionError::MissingDependency { .. }));
        assert!(builder.bus().is_none());
    }

    #[test]
    fn test_roles_stay_singletons_after_composition() {
        let config = BusConfiguration::new(endpoint("orders"))
            .with_load_balancer_endpoint(endpoint("balancer.ready"));
        let (_transport, builder) = builder(config);
        let topology = compose(&builder).unwrap();

        let bus = builder.register_bus().unwrap();
        assert!(Arc::ptr_eq(&bus, topology.bus()));

        builder
            .register_load_balancer_endpoint(&endpoint("balancer.ready"))
            .unwrap();
        builder.register_no_security().unwrap();
        builder
            .register_default_services(&builder.config().scan_assemblies)
            .unwrap();
        assert_eq!(topology.bus().modules().len(), 1);
    }
}
