//! Balancer role state.

use std::fmt;

use qb_01_configuration::LoadBalancerRole;

use crate::error::LoadBalancerError;

/// Where a balancer stands in the failover topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalancerState {
    PrimaryActive,
    /// Forwards work to the primary; tracks worker capacity on its own.
    SecondaryStandby,
    /// Promoted secondary, dispatching for the primary's logical endpoint.
    SecondaryActive,
}

impl BalancerState {
    /// Initial state for a registered role.
    #[must_use]
    pub fn for_role(role: &LoadBalancerRole) -> Self {
        match role {
            LoadBalancerRole::Primary => Self::PrimaryActive,
            LoadBalancerRole::Secondary { .. } => Self::SecondaryStandby,
        }
    }

    /// Whether this balancer dispatches work itself.
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, Self::SecondaryStandby)
    }

    /// Standby secondary becomes the active dispatcher.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any state other than `SecondaryStandby`.
    pub fn promote(self) -> Result<Self, LoadBalancerError> {
        match self {
            Self::SecondaryStandby => Ok(Self::SecondaryActive),
            from => Err(LoadBalancerError::InvalidTransition {
                from,
                action: "promote",
            }),
        }
    }
}

impl fmt::Display for BalancerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PrimaryActive => "Primary-Active",
            Self::SecondaryStandby => "Secondary-Standby",
            Self::SecondaryActive => "Secondary-Active",
        };
        f.write_str(name)
    }
}
