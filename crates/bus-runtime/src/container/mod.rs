//! # Bus Container
//!
//! The composition root. Every role lives in a single-assignment slot, so
//! registering a role twice hands back the instance created the first time.
//!
//! ## Registration Order
//!
//! Roles are registered in strict dependency order by [`compose`]:
//!
//! ```text
//! Step 0: Default services (locator, reflection, serializer, router, extensions)
//! Step 1: Service bus
//! Step 2: Load balancer, primary or secondary (optional)
//! Step 3: Ready-for-work listener (optional)
//! Step 4: Peripheral modules: load balancer endpoint, logging endpoint (optional)
//! Step 5: Security, or the fail-closed no-security posture
//! ```
//!
//! Anything resolved before it was registered fails with
//! `CompositionError::MissingDependency` while composing, never later on
//! the message path.

pub mod builder;
pub mod singleton;
pub mod topology;

use std::collections::BTreeSet;
use std::sync::Arc;

use qb_01_configuration::{BusConfiguration, LoadBalancerConfiguration};
use qb_02_load_balancer::{LoadBalancer, ReadyForWorkListener};
use shared_crypto::{EncryptionService, SecretKey};
use shared_types::Endpoint;

use crate::bus::DefaultServiceBus;
use crate::error::CompositionError;
use crate::modules::{LoadBalancerMessageModule, MessageLoggingModule};
use crate::registry::Capability;

pub use builder::BusBuilder;
pub use singleton::Singleton;
pub use topology::{compose, Topology, TopologyStatus};

/// Operations a composition root offers to `compose` and to extensions.
pub trait BusContainerBuilder: Send + Sync {
    /// The validated configuration being composed.
    fn config(&self) -> &BusConfiguration;

    /// Create locator, reflection helper, serializer and endpoint router, then
    /// invoke the configuration-aware extensions shipped in `scan`.
    /// Runs once; later calls do nothing.
    fn register_default_services(&self, scan: &BTreeSet<String>) -> Result<(), CompositionError>;

    fn register_bus(&self) -> Result<Arc<DefaultServiceBus>, CompositionError>;

    fn register_primary_load_balancer(
        &self,
        config: &LoadBalancerConfiguration,
    ) -> Result<Arc<LoadBalancer>, CompositionError>;

    /// The configuration must carry the primary's endpoint.
    fn register_secondary_load_balancer(
        &self,
        config: &LoadBalancerConfiguration,
    ) -> Result<Arc<LoadBalancer>, CompositionError>;

    fn register_ready_for_work(
        &self,
        config: &LoadBalancerConfiguration,
    ) -> Result<Arc<ReadyForWorkListener>, CompositionError>;

    fn register_load_balancer_endpoint(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Arc<LoadBalancerMessageModule>, CompositionError>;

    fn register_logging_endpoint(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Arc<MessageLoggingModule>, CompositionError>;

    fn register_security(
        &self,
        key: &SecretKey,
    ) -> Result<Arc<dyn EncryptionService>, CompositionError>;

    fn register_no_security(&self) -> Result<(), CompositionError>;

    /// Register every known implementer of `capability` not named in
    /// `excludes` as a named singleton. Returns the newly registered names.
    fn register_all(
        &self,
        capability: Capability,
        excludes: &[&str],
    ) -> Result<Vec<String>, CompositionError>;
}
