//! Errors raised while composing the topology and while the bus runs.

use qb_01_configuration::ConfigError;
use qb_02_load_balancer::LoadBalancerError;
use shared_bus::{SerializationError, TransportError};
use shared_crypto::SecurityError;
use thiserror::Error;

/// Composition failed. The topology must not be started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    /// A role was resolved before anything registered it.
    #[error("missing dependency: {role} was resolved before it was registered")]
    MissingDependency { role: String },

    #[error("primary and secondary load balancer roles registered in the same process")]
    ConflictingLoadBalancerRoles,

    /// `register_security` and `register_no_security` were both called.
    #[error("security already configured as {existing}")]
    ConflictingSecurity { existing: &'static str },

    /// A component factory produced something other than its declared capability.
    #[error("component {name} does not provide {expected}")]
    CapabilityMismatch { name: String, expected: &'static str },

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl CompositionError {
    pub(crate) fn missing(role: impl Into<String>) -> Self {
        Self::MissingDependency { role: role.into() }
    }
}

/// Failure on the bus data path.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("no message owner for {message_type}")]
    NoOwner { message_type: String },

    #[error("no subscribers for {message_type}")]
    NoSubscribers { message_type: String },

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    LoadBalancer(#[from] LoadBalancerError),

    #[error("consumer {consumer} failed: {reason}")]
    Consumer { consumer: String, reason: String },
}

impl BusError {
    /// Whether this is the fail-closed security rejection.
    #[must_use]
    pub fn is_security_rejection(&self) -> bool {
        matches!(
            self,
            Self::Serialization(SerializationError::Security(
                SecurityError::SecurityDisabled { .. }
            )) | Self::LoadBalancer(LoadBalancerError::Serialization(
                SerializationError::Security(SecurityError::SecurityDisabled { .. })
            ))
        )
    }
}
