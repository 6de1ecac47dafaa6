//! # Bus Message Model
//!
//! Application messages are a type name plus named fields. A field is either
//! plain JSON or a [`WireEncryptedString`], which must never reach the wire
//! unencrypted. A message can also be marked as wholly encrypted.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A string that is encrypted whenever it is written to the wire.
///
/// In memory it holds plaintext; `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct WireEncryptedString {
    value: String,
}

impl WireEncryptedString {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// The plaintext value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for WireEncryptedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WireEncryptedString(***)")
    }
}

/// Wire form of an encrypted value: hex-encoded nonce and ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedValue {
    pub nonce: String,
    pub ciphertext: String,
}

/// A message field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Plain(serde_json::Value),
    Encrypted(WireEncryptedString),
}

/// An application message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BusMessage {
    /// Fully qualified type name, e.g. `Orders.Commands.PlaceOrder`.
    pub message_type: String,
    /// When set, the whole field map is encrypted as one unit on the wire.
    pub encrypted: bool,
    pub fields: BTreeMap<String, FieldValue>,
}

impl BusMessage {
    #[must_use]
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            encrypted: false,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields
            .insert(name.into(), FieldValue::Plain(value.into()));
        self
    }

    #[must_use]
    pub fn with_encrypted_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(
            name.into(),
            FieldValue::Encrypted(WireEncryptedString::new(value)),
        );
        self
    }

    /// Mark the whole message as encrypted on the wire.
    #[must_use]
    pub fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Plain field value, if the field exists and is not encrypted.
    #[must_use]
    pub fn plain(&self, name: &str) -> Option<&serde_json::Value> {
        match self.fields.get(name) {
            Some(FieldValue::Plain(value)) => Some(value),
            _ => None,
        }
    }

    /// Whether any field needs wire encryption.
    #[must_use]
    pub fn has_encrypted_fields(&self) -> bool {
        self.fields
            .values()
            .any(|f| matches!(f, FieldValue::Encrypted(_)))
    }
}
