//! # Load Balancer Configuration
//!
//! A secondary balancer always knows its primary's address; a primary never
//! references another balancer. The role type carries that invariant, so a
//! constructed [`LoadBalancerConfiguration`] cannot violate it.

use std::fmt;

use shared_types::Endpoint;

use super::bus::DEFAULT_THREAD_COUNT;

/// Role a balancer is registered as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadBalancerRole {
    /// Authoritative dispatcher for its endpoint.
    Primary,
    /// Standby for the balancer at `primary`.
    Secondary { primary: Endpoint },
}

impl LoadBalancerRole {
    /// Accepted names in raw configuration.
    pub const NAMES: [&'static str; 2] = ["primary", "secondary"];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary { .. } => "secondary",
        }
    }

    #[must_use]
    pub fn is_secondary(&self) -> bool {
        matches!(self, Self::Secondary { .. })
    }
}

impl fmt::Display for LoadBalancerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings for one load balancer and its ready-for-work listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerConfiguration {
    pub role: LoadBalancerRole,
    /// Queue the balancer consumes work and readiness signals from.
    pub endpoint: Endpoint,
    /// Dedicated readiness queue, if the listener is deployed.
    pub ready_for_work_endpoint: Option<Endpoint>,
    pub thread_count: usize,
    pub transactional: bool,
}

impl LoadBalancerConfiguration {
    /// Primary balancer with a single transactional consumer.
    #[must_use]
    pub fn primary(endpoint: Endpoint) -> Self {
        Self {
            role: LoadBalancerRole::Primary,
            endpoint,
            ready_for_work_endpoint: None,
            thread_count: DEFAULT_THREAD_COUNT,
            transactional: true,
        }
    }

    /// Secondary balancer standing by for `primary`.
    #[must_use]
    pub fn secondary(endpoint: Endpoint, primary: Endpoint) -> Self {
        Self {
            role: LoadBalancerRole::Secondary { primary },
            ..Self::primary(endpoint)
        }
    }

    #[must_use]
    pub fn with_ready_for_work(mut self, endpoint: Endpoint) -> Self {
        self.ready_for_work_endpoint = Some(endpoint);
        self
    }

    #[must_use]
    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    #[must_use]
    pub fn with_transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }

    /// The primary's address, for a secondary.
    #[must_use]
    pub fn primary_load_balancer_endpoint(&self) -> Option<&Endpoint> {
        match &self.role {
            LoadBalancerRole::Secondary { primary } => Some(primary),
            LoadBalancerRole::Primary => None,
        }
    }
}
