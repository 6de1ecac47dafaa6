//! Cross-crate integration scenarios.

pub mod composition;
pub mod configuration;
pub mod load_balancing;
pub mod security;

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use bus_runtime::BusBuilder;
    use qb_01_configuration::BusConfiguration;
    use shared_bus::{InMemorySubscriptionStorage, InMemoryTransport};
    use shared_types::Endpoint;

    pub fn endpoint(path: &str) -> Endpoint {
        Endpoint::parse(&format!("memory://localhost/{path}")).unwrap()
    }

    pub fn builder(config: BusConfiguration) -> (Arc<InMemoryTransport>, BusBuilder) {
        let transport = Arc::new(InMemoryTransport::new());
        let builder = builder_on(config, &transport);
        (transport, builder)
    }

    /// A builder for a second process sharing `transport`.
    pub fn builder_on(config: BusConfiguration, transport: &Arc<InMemoryTransport>) -> BusBuilder {
        BusBuilder::new(
            config,
            transport.clone(),
            Arc::new(InMemorySubscriptionStorage::new()),
        )
    }
}
