//! # Message Ownership
//!
//! Routing rules mapping a message-type selector to the endpoint that owns
//! (handles) messages of that type.

use serde::{Deserialize, Serialize};

use crate::endpoint::Endpoint;

/// A single ownership rule.
///
/// The selector is a type-name prefix: `Orders.Commands` owns
/// `Orders.Commands.PlaceOrder`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageOwner {
    /// Message-type selector (namespace prefix).
    pub name: String,
    /// Endpoint responsible for the selected messages.
    pub endpoint: Endpoint,
}

impl MessageOwner {
    #[must_use]
    pub fn new(name: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            name: name.into(),
            endpoint,
        }
    }

    /// Whether this rule selects `message_type`.
    #[must_use]
    pub fn is_owner(&self, message_type: &str) -> bool {
        message_type.starts_with(&self.name)
    }
}

/// Ordered owner table. Read-only once composition finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageOwners(Vec<MessageOwner>);

impl MessageOwners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule after all existing ones.
    pub fn push(&mut self, owner: MessageOwner) {
        self.0.push(owner);
    }

    /// First owner whose selector matches, in declaration order.
    #[must_use]
    pub fn owner_of(&self, message_type: &str) -> Option<&MessageOwner> {
        self.0.iter().find(|owner| owner.is_owner(message_type))
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageOwner> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<MessageOwner> for MessageOwners {
    fn from_iter<I: IntoIterator<Item = MessageOwner>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(s: &str) -> Endpoint {
        Endpoint::parse(s).unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let owners: MessageOwners = vec![
            MessageOwner::new("Orders", endpoint("msmq://localhost/orders")),
            MessageOwner::new("Orders.Billing", endpoint("msmq://localhost/billing")),
        ]
        .into_iter()
        .collect();

        let owner = owners.owner_of("Orders.Billing.Charge").unwrap();
        assert_eq!(owner.endpoint, endpoint("msmq://localhost/orders"));
    }

    #[test]
    fn test_no_owner() {
        let mut owners = MessageOwners::new();
        owners.push(MessageOwner::new("Orders", endpoint("msmq://localhost/orders")));
        assert!(owners.owner_of("Shipping.Dispatch").is_none());
        assert_eq!(owners.len(), 1);
    }

    #[test]
    fn test_duplicate_selectors_allowed() {
        let mut owners = MessageOwners::new();
        owners.push(MessageOwner::new("Orders", endpoint("msmq://a/orders")));
        owners.push(MessageOwner::new("Orders", endpoint("msmq://b/orders")));
        assert_eq!(owners.len(), 2);
        assert_eq!(
            owners.owner_of("Orders.Place").unwrap().endpoint,
            endpoint("msmq://a/orders")
        );
    }
}
