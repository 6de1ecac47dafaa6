//! Message-type naming used for owner routing and consumer matching.

use shared_types::BusMessage;

/// Separator between namespace segments of a message type.
pub const NAMESPACE_SEPARATOR: char = '.';

/// Naming helpers for message types.
///
/// Types are dotted names such as `Orders.Commands.PlaceOrder`; the namespace
/// is everything before the last segment.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageReflection;

impl MessageReflection {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn type_name<'a>(&self, message: &'a BusMessage) -> &'a str {
        &message.message_type
    }

    /// Dotted message-type name for a Rust type, `a::b::C` becoming `a.b.C`.
    #[must_use]
    pub fn type_name_of<T: ?Sized>(&self) -> String {
        std::any::type_name::<T>().replace("::", ".")
    }

    #[must_use]
    pub fn namespace<'a>(&self, message_type: &'a str) -> &'a str {
        message_type
            .rfind(NAMESPACE_SEPARATOR)
            .map_or("", |idx| &message_type[..idx])
    }

    #[must_use]
    pub fn short_name<'a>(&self, message_type: &'a str) -> &'a str {
        message_type
            .rfind(NAMESPACE_SEPARATOR)
            .map_or(message_type, |idx| &message_type[idx + 1..])
    }

    /// Whether `message_type` sits in `namespace` or one of its children.
    #[must_use]
    pub fn is_in_namespace(&self, message_type: &str, namespace: &str) -> bool {
        let ns = self.namespace(message_type);
        ns == namespace
            || ns
                .strip_prefix(namespace)
                .is_some_and(|rest| rest.starts_with(NAMESPACE_SEPARATOR))
    }
}
