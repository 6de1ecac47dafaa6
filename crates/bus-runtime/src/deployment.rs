//! Deployment actions run by `Topology::deploy` before anything starts.

use async_trait::async_trait;
use shared_bus::{Transport, TransportError};
use shared_types::Endpoint;
use tracing::info;

/// Prepares transport resources for a role.
#[async_trait]
pub trait DeploymentAction: Send + Sync {
    /// Short label used in logs.
    fn describe(&self) -> String;

    async fn execute(&self, transport: &dyn Transport) -> Result<(), TransportError>;
}

/// Create the queues a role consumes from or writes to.
#[derive(Debug, Clone)]
pub struct CreateQueues {
    role: &'static str,
    queues: Vec<Endpoint>,
}

impl CreateQueues {
    #[must_use]
    pub fn new(role: &'static str, queues: Vec<Endpoint>) -> Self {
        Self { role, queues }
    }

    #[must_use]
    pub fn queues(&self) -> &[Endpoint] {
        &self.queues
    }
}

#[async_trait]
impl DeploymentAction for CreateQueues {
    fn describe(&self) -> String {
        format!("create {} queue(s) for {}", self.queues.len(), self.role)
    }

    async fn execute(&self, transport: &dyn Transport) -> Result<(), TransportError> {
        for queue in &self.queues {
            transport.create_queue(queue).await?;
            info!(role = self.role, %queue, "Queue ready");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use shared_bus::InMemoryTransport;

    use super::*;

    #[tokio::test]
    async fn test_creates_every_queue() {
        let transport = InMemoryTransport::new();
        let queues = vec![
            Endpoint::parse("memory://localhost/orders").unwrap(),
            Endpoint::parse("memory://localhost/orders.errors").unwrap(),
        ];
        let action = CreateQueues::new("bus", queues.clone());

        action.execute(&transport).await.unwrap();

        assert!(queues.iter().all(|q| transport.queue_exists(q)));
        assert_eq!(action.describe(), "create 2 queue(s) for bus");
    }
}
