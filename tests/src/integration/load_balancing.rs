//! # Load Balancing Scenarios
//!
//! A balancer process and a worker process share one transport. The worker
//! announces free slots through the ready-for-work queue; the balancer never
//! sends a worker more than it asked for.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use bus_runtime::{compose, BusError, MessageConsumer};
    use qb_01_configuration::{BusConfiguration, LoadBalancerConfiguration};
    use qb_02_load_balancer::{BalancerState, LoadBalancerError, ReadyForWork, WorkOutcome};
    use shared_bus::{Disposition, Transport};
    use shared_types::{BusMessage, MessageOwner, QueueMessage};
    use tokio::sync::mpsc;

    use crate::integration::fixtures::{builder, builder_on, endpoint};

    /// Worker handler reporting every unit it processed.
    struct Worker {
        done: mpsc::UnboundedSender<i64>,
    }

    #[async_trait]
    impl MessageConsumer for Worker {
        fn name(&self) -> &str {
            "worker"
        }

        fn accepts(&self, message_type: &str) -> bool {
            message_type == "Orders.Commands.PlaceOrder"
        }

        async fn consume(&self, message: &BusMessage) -> Result<(), BusError> {
            let order = message
                .plain("order")
                .and_then(|value| value.as_i64())
                .unwrap_or_default();
            let _ = self.done.send(order);
            Ok(())
        }
    }

    fn work(order: i64) -> QueueMessage {
        QueueMessage::new("Orders.Commands.PlaceOrder", Vec::new())
            .with_header("order", order.to_string())
    }

    fn balancer_host() -> BusConfiguration {
        BusConfiguration::new(endpoint("dispatch"))
            .with_message_owner(MessageOwner::new("Orders", endpoint("balancer")))
            .with_load_balancer(
                LoadBalancerConfiguration::primary(endpoint("balancer"))
                    .with_ready_for_work(endpoint("balancer.ready")),
            )
    }

    #[tokio::test]
    async fn test_worker_receives_work_as_it_announces_capacity() {
        let (transport, balancer_builder) = builder(balancer_host());
        let balancer_topology = compose(&balancer_builder).unwrap();
        balancer_topology.deploy().await.unwrap();

        let worker_builder = builder_on(
            BusConfiguration::new(endpoint("worker"))
                .with_load_balancer_endpoint(endpoint("balancer.ready")),
            &transport,
        );
        let worker_topology = compose(&worker_builder).unwrap();
        let (done, mut completed) = mpsc::unbounded_channel();
        worker_topology
            .bus()
            .consumers()
            .push(Arc::new(Worker { done }));
        worker_topology.deploy().await.unwrap();

        balancer_topology.start().await;
        worker_topology.start().await;

        for order in [1, 2] {
            let sent = balancer_topology
                .bus()
                .send(&BusMessage::new("Orders.Commands.PlaceOrder").with_field("order", order))
                .await
                .unwrap();
            assert_eq!(sent, endpoint("balancer"));
        }

        let mut orders = Vec::new();
        for _ in 0..2 {
            let order = tokio::time::timeout(Duration::from_secs(5), completed.recv())
                .await
                .unwrap()
                .unwrap();
            orders.push(order);
        }
        assert_eq!(orders, vec![1, 2]);

        let status = balancer_topology.load_balancer().unwrap().status();
        assert_eq!(status.backlog, 0);

        worker_topology.shutdown().await;
        balancer_topology.shutdown().await;
    }

    #[tokio::test]
    async fn test_single_slot_releases_exactly_one_held_unit() {
        let (transport, builder) = builder(balancer_host());
        let topology = compose(&builder).unwrap();
        topology.deploy().await.unwrap();
        transport.create_queue(&endpoint("worker")).await.unwrap();

        let balancer = topology.load_balancer().unwrap();
        let first = work(1);
        let first_id = first.id;
        assert_eq!(
            balancer.accept_work(first).await.unwrap(),
            WorkOutcome::Held { depth: 1 }
        );
        assert_eq!(
            balancer.accept_work(work(2)).await.unwrap(),
            WorkOutcome::Held { depth: 2 }
        );

        let serializer = builder.serializer().unwrap();
        let signal = ReadyForWork::new(endpoint("worker"), 1)
            .to_queue_message(serializer.as_ref())
            .unwrap();
        let listener = topology.ready_for_work().unwrap();
        assert_eq!(listener.process(signal, None).await, Disposition::Commit);

        assert_eq!(transport.depth(&endpoint("worker")), 1);
        assert_eq!(balancer.status().backlog, 1);
        assert_eq!(transport.peek_all(&endpoint("worker"))[0].id, first_id);
    }

    #[tokio::test]
    async fn test_standby_secondary_forwards_until_promoted() {
        let config = BusConfiguration::new(endpoint("dispatch-backup")).with_load_balancer(
            LoadBalancerConfiguration::secondary(endpoint("backup"), endpoint("balancer")),
        );
        let (transport, builder) = builder(config);
        let topology = compose(&builder).unwrap();
        topology.deploy().await.unwrap();
        transport.create_queue(&endpoint("balancer")).await.unwrap();
        transport.create_queue(&endpoint("worker")).await.unwrap();

        let backup = topology.load_balancer().unwrap();
        assert_eq!(backup.state(), BalancerState::SecondaryStandby);
        assert_eq!(
            backup.accept_work(work(1)).await.unwrap(),
            WorkOutcome::Forwarded {
                primary: endpoint("balancer")
            }
        );
        assert_eq!(transport.depth(&endpoint("balancer")), 1);

        // Capacity recorded in standby is not acted on.
        assert_eq!(
            backup
                .apply_ready(ReadyForWork::new(endpoint("worker"), 2))
                .await
                .unwrap(),
            0
        );
        assert_eq!(transport.depth(&endpoint("worker")), 0);

        assert_eq!(backup.promote().await.unwrap(), 0);
        assert_eq!(backup.state(), BalancerState::SecondaryActive);
        assert_eq!(
            backup.accept_work(work(2)).await.unwrap(),
            WorkOutcome::Dispatched {
                worker: endpoint("worker")
            }
        );
        assert_eq!(transport.depth(&endpoint("worker")), 1);

        let err = backup.promote().await.unwrap_err();
        assert!(matches!(err, LoadBalancerError::InvalidTransition { .. }));
    }
}
