//! # Subscription Storage
//!
//! Which endpoints want to receive published messages of a given type.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use shared_types::Endpoint;

/// Storage of publish/subscribe registrations.
pub trait SubscriptionStorage: Send + Sync {
    /// Register `endpoint` for `message_type`. Duplicate registrations are ignored.
    fn add_subscription(&self, message_type: &str, endpoint: &Endpoint);

    /// Remove a registration, if present.
    fn remove_subscription(&self, message_type: &str, endpoint: &Endpoint);

    /// Endpoints subscribed to `message_type`, in registration order.
    fn subscribers_of(&self, message_type: &str) -> Vec<Endpoint>;
}

/// In-memory subscription storage.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionStorage {
    subscriptions: RwLock<BTreeMap<String, Vec<Endpoint>>>,
}

impl InMemorySubscriptionStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubscriptionStorage for InMemorySubscriptionStorage {
    fn add_subscription(&self, message_type: &str, endpoint: &Endpoint) {
        let mut subs = self.subscriptions.write();
        let entry = subs.entry(message_type.to_string()).or_default();
        if !entry.contains(endpoint) {
            entry.push(endpoint.clone());
        }
    }

    fn remove_subscription(&self, message_type: &str, endpoint: &Endpoint) {
        let mut subs = self.subscriptions.write();
        let Some(entry) = subs.get_mut(message_type) else {
            return;
        };
        entry.retain(|e| e != endpoint);
        if entry.is_empty() {
            subs.remove(message_type);
        }
    }

    fn subscribers_of(&self, message_type: &str) -> Vec<Endpoint> {
        self.subscriptions
            .read()
            .get(message_type)
            .cloned()
            .unwrap_or_default()
    }
}
