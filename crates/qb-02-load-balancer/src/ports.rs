//! Ports of the load balancer.

use async_trait::async_trait;

use crate::domain::ReadyForWork;
use crate::error::LoadBalancerError;

/// Receives readiness signals from the ready-for-work listener.
///
/// Implemented by [`LoadBalancer`](crate::LoadBalancer). Returning `Ok`
/// means the capacity update has been applied; the listener records the
/// signal as processed only then.
#[async_trait]
pub trait ReadySignalSink: Send + Sync {
    /// Apply a worker's declared capacity.
    async fn ready_for_work(&self, signal: ReadyForWork) -> Result<(), LoadBalancerError>;
}
