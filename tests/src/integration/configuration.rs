//! # Configuration To Topology
//!
//! A TOML file is validated first and composed second; nothing registers
//! before validation succeeds.

#[cfg(test)]
mod tests {
    use bus_runtime::compose;
    use proptest::prelude::*;
    use qb_01_configuration::{
        BusConfiguration, ConfigError, LoadBalancerRole, TomlConfigLoader, DEFAULT_THREAD_COUNT,
    };
    use qb_02_load_balancer::BalancerState;
    use shared_crypto::SecurityMode;

    use crate::integration::fixtures::{builder, endpoint};

    #[tokio::test]
    async fn test_thread_count_two_reaches_the_bus() {
        let config = TomlConfigLoader::parse(
            r#"
            [bus]
            endpoint = "msmq://localhost/queue"
            threadCount = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.thread_count, 2);
        assert_eq!(
            BusConfiguration::new(endpoint("other")).thread_count,
            DEFAULT_THREAD_COUNT
        );

        let (transport, builder) = builder(config);
        let topology = compose(&builder).unwrap();
        topology.deploy().await.unwrap();

        assert_eq!(topology.bus().thread_count(), 2);
        assert_eq!(topology.bus().endpoint().as_str(), "msmq://localhost/queue");
        assert!(transport.queue_exists(topology.bus().endpoint()));
    }

    #[tokio::test]
    async fn test_full_file_composes_secondary_topology() {
        let key = hex::encode([7_u8; 32]);
        let toml = format!(
            r#"
            [bus]
            endpoint = "memory://localhost/orders"
            transactional = "true"
            loadBalancerEndpoint = "memory://localhost/orders.balancer.ready"
            logEndpoint = "memory://localhost/orders.log"

            [[assemblies]]
            name = "orders-handlers"

            [[messages]]
            name = "Orders.Commands"
            endpoint = "memory://localhost/orders"

            [loadBalancer]
            role = "secondary"
            endpoint = "memory://localhost/orders.balancer"
            readyForWorkEndpoint = "memory://localhost/orders.balancer.ready"
            primaryLoadBalancerEndpoint = "memory://primary-host/orders.balancer"

            [security]
            key = "{key}"
            "#
        );
        let config = TomlConfigLoader::parse(&toml).unwrap();
        assert!(matches!(
            config.load_balancer.as_ref().unwrap().role,
            LoadBalancerRole::Secondary { .. }
        ));

        let (transport, builder) = builder(config);
        let topology = compose(&builder).unwrap();
        topology.deploy().await.unwrap();

        let balancer = topology.load_balancer().unwrap();
        assert_eq!(balancer.state(), BalancerState::SecondaryStandby);
        assert!(balancer.config().transactional);
        assert!(topology.ready_for_work().unwrap().is_attached());
        assert_eq!(topology.security(), SecurityMode::Enabled);
        assert_eq!(topology.bus().modules().names(), vec!["load-balancer", "message-logging"]);
        for queue in ["orders", "orders.balancer", "orders.balancer.ready", "orders.log"] {
            assert!(transport.queue_exists(&endpoint(queue)), "{queue} missing");
        }
    }

    #[test]
    fn test_secondary_without_primary_rejected_before_composition() {
        let err = TomlConfigLoader::parse(
            r#"
            [bus]
            endpoint = "memory://localhost/orders"

            [loadBalancer]
            role = "secondary"
            endpoint = "memory://localhost/orders.balancer"
            "#,
        )
        .unwrap_err();

        assert_eq!(err, ConfigError::MissingPrimaryEndpoint);
    }

    proptest! {
        #[test]
        fn prop_bus_runs_configured_thread_count(threads in 1_usize..64) {
            let toml = format!(
                "[bus]\nendpoint = \"memory://localhost/orders\"\nthreadCount = {threads}\n"
            );
            let config = TomlConfigLoader::parse(&toml).unwrap();
            let (_transport, builder) = builder(config);
            let topology = compose(&builder).unwrap();

            prop_assert_eq!(topology.bus().thread_count(), threads);
        }
    }
}
