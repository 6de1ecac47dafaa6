//! # Bus Configuration Model
//!
//! Built once at startup and immutable afterwards. The composition root
//! receives it by reference; nothing reads configuration through ambient
//! lookup.

use std::collections::BTreeSet;

use shared_types::{Endpoint, IsolationLevel, MessageOwner, MessageOwners, TransactionalMode};

use super::load_balancer::LoadBalancerConfiguration;
use super::security::SecuritySettings;

/// Consumer tasks per endpoint when `threadCount` is absent.
pub const DEFAULT_THREAD_COUNT: usize = 1;

/// Delivery attempts before a message moves to the error queue.
pub const DEFAULT_NUMBER_OF_RETRIES: u32 = 5;

/// Validated bus settings.
#[derive(Debug, Clone)]
pub struct BusConfiguration {
    /// Queue this bus consumes from.
    pub endpoint: Endpoint,
    pub thread_count: usize,
    pub number_of_retries: u32,
    pub transactional: TransactionalMode,
    pub queue_isolation_level: IsolationLevel,
    pub consume_in_transaction: bool,
    /// Enlist queue operations in a distributed transaction.
    pub use_dtc: bool,
    /// Use sibling queues (`orders.errors`) instead of sub-queues.
    pub use_flat_queue_structure: bool,
    /// Modules whose extensions and components are discovered at composition.
    pub scan_assemblies: BTreeSet<String>,
    /// Ordered routing table; the first matching owner wins.
    pub message_owners: MessageOwners,
    /// Where `LoadBalancerMessageModule` announces readiness.
    pub load_balancer_endpoint: Option<Endpoint>,
    /// Where `MessageLoggingModule` copies traffic.
    pub log_endpoint: Option<Endpoint>,
    pub load_balancer: Option<LoadBalancerConfiguration>,
    pub security: SecuritySettings,
}

impl BusConfiguration {
    /// Configuration with every optional setting at its default.
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            thread_count: DEFAULT_THREAD_COUNT,
            number_of_retries: DEFAULT_NUMBER_OF_RETRIES,
            transactional: TransactionalMode::Unspecified,
            queue_isolation_level: IsolationLevel::default(),
            consume_in_transaction: true,
            use_dtc: true,
            use_flat_queue_structure: false,
            scan_assemblies: BTreeSet::new(),
            message_owners: MessageOwners::new(),
            load_balancer_endpoint: None,
            log_endpoint: None,
            load_balancer: None,
            security: SecuritySettings::Disabled,
        }
    }

    #[must_use]
    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    #[must_use]
    pub fn with_number_of_retries(mut self, retries: u32) -> Self {
        self.number_of_retries = retries;
        self
    }

    #[must_use]
    pub fn with_transactional(mut self, mode: TransactionalMode) -> Self {
        self.transactional = mode;
        self
    }

    #[must_use]
    pub fn with_message_owner(mut self, owner: MessageOwner) -> Self {
        self.message_owners.push(owner);
        self
    }

    #[must_use]
    pub fn with_scan_assembly(mut self, module: impl Into<String>) -> Self {
        self.scan_assemblies.insert(module.into());
        self
    }

    #[must_use]
    pub fn with_load_balancer(mut self, config: LoadBalancerConfiguration) -> Self {
        self.load_balancer = Some(config);
        self
    }

    #[must_use]
    pub fn with_load_balancer_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.load_balancer_endpoint = Some(endpoint);
        self
    }

    #[must_use]
    pub fn with_log_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.log_endpoint = Some(endpoint);
        self
    }

    #[must_use]
    pub fn with_security(mut self, security: SecuritySettings) -> Self {
        self.security = security;
        self
    }

    /// Switch to sibling error/log queues.
    #[must_use]
    pub fn use_flat_queue_structure(mut self) -> Self {
        self.use_flat_queue_structure = true;
        self
    }

    /// Whether queue operations run inside a transaction.
    ///
    /// `Unspecified` resolves to transactional, matching the queue default.
    #[must_use]
    pub fn is_transactional(&self) -> bool {
        self.transactional.is_transactional_or(true)
    }

    /// Auxiliary queue of the bus endpoint, laid out per the queue structure.
    #[must_use]
    pub fn auxiliary_queue(&self, suffix: &str) -> Endpoint {
        if self.use_flat_queue_structure {
            self.endpoint.sub_queue(suffix)
        } else {
            self.endpoint.nested_queue(suffix)
        }
    }

    /// Error queue for messages that exhausted their retries.
    #[must_use]
    pub fn error_queue(&self) -> Endpoint {
        self.auxiliary_queue("errors")
    }
}
