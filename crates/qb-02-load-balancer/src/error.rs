//! Load balancer errors.

use shared_bus::{SerializationError, TransportError};
use thiserror::Error;

use crate::domain::BalancerState;

/// Load balancer and listener errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadBalancerError {
    /// Work could not be delivered and was held. Not fatal: it is retried on
    /// the next readiness signal.
    #[error("{depth} work unit(s) held: {reason}")]
    DispatchBacklog { depth: usize, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// A readiness message did not carry a valid endpoint and capacity.
    #[error("Malformed ready-for-work signal: {0}")]
    MalformedSignal(String),

    /// The requested role transition is not allowed from the current state.
    #[error("Cannot {action} a load balancer in state {from}")]
    InvalidTransition {
        from: BalancerState,
        action: &'static str,
    },
}
