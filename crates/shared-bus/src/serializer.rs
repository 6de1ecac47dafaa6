//! # Message Serializer
//!
//! JSON encoding of [`BusMessage`]s. Encrypted fields and sealed messages go
//! through the installed [`WireSecurity`] converters; until security has been
//! negotiated the serializer behaves as if it were disabled.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use shared_crypto::{SecurityError, SecurityMode, WireSecurity};
use shared_types::{BusMessage, EncryptedValue, FieldValue};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from encoding or decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// JSON could not be produced or parsed.
    #[error("JSON error: {0}")]
    Json(String),

    /// A wire-encrypted value could not be converted.
    #[error(transparent)]
    Security(#[from] SecurityError),

    /// Structurally invalid wire message.
    #[error("Malformed message: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for SerializationError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

/// Encodes messages to bytes and back.
pub trait MessageSerializer: Send + Sync {
    /// Encode a message for the wire.
    fn encode(&self, message: &BusMessage) -> Result<Vec<u8>, SerializationError>;

    /// Decode a message read from the wire.
    fn decode(&self, bytes: &[u8]) -> Result<BusMessage, SerializationError>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireField {
    Plain(serde_json::Value),
    Encrypted(EncryptedValue),
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    #[serde(rename = "type")]
    message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, WireField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sealed: Option<EncryptedValue>,
}

/// JSON serializer with pluggable wire security.
#[derive(Debug, Default)]
pub struct JsonMessageSerializer {
    security: OnceLock<WireSecurity>,
}

impl JsonMessageSerializer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializer with security already installed.
    #[must_use]
    pub fn with_security(security: WireSecurity) -> Self {
        let serializer = Self::new();
        serializer.install_security(security);
        serializer
    }

    /// Install the converter pair. Only the first installation takes effect.
    ///
    /// Returns `false` if security was already installed.
    pub fn install_security(&self, security: WireSecurity) -> bool {
        let mode = security.mode();
        let installed = self.security.set(security).is_ok();
        if installed {
            debug!(?mode, "Wire security installed");
        }
        installed
    }

    /// Installed mode, if any.
    #[must_use]
    pub fn security_mode(&self) -> Option<SecurityMode> {
        self.security.get().map(WireSecurity::mode)
    }

    fn security(&self) -> WireSecurity {
        self.security
            .get()
            .cloned()
            .unwrap_or_else(WireSecurity::disabled)
    }

    fn encode_fields(
        security: &WireSecurity,
        fields: &BTreeMap<String, FieldValue>,
    ) -> Result<BTreeMap<String, WireField>, SerializationError> {
        fields
            .iter()
            .map(|(name, value)| {
                let wire = match value {
                    FieldValue::Plain(v) => WireField::Plain(v.clone()),
                    FieldValue::Encrypted(secret) => {
                        WireField::Encrypted(security.strings.to_wire(name, secret)?)
                    }
                };
                Ok((name.clone(), wire))
            })
            .collect()
    }

    fn decode_fields(
        security: &WireSecurity,
        fields: BTreeMap<String, WireField>,
    ) -> Result<BTreeMap<String, FieldValue>, SerializationError> {
        fields
            .into_iter()
            .map(|(name, wire)| {
                let value = match wire {
                    WireField::Plain(v) => FieldValue::Plain(v),
                    WireField::Encrypted(sealed) => {
                        FieldValue::Encrypted(security.strings.from_wire(&name, &sealed)?)
                    }
                };
                Ok((name, value))
            })
            .collect()
    }
}

impl MessageSerializer for JsonMessageSerializer {
    fn encode(&self, message: &BusMessage) -> Result<Vec<u8>, SerializationError> {
        let security = self.security();
        let fields = Self::encode_fields(&security, &message.fields).inspect_err(|e| {
            warn!(message_type = %message.message_type, error = %e, "Refusing to encode field");
        })?;

        let wire = if message.encrypted {
            let plaintext = serde_json::to_vec(&fields)?;
            WireMessage {
                message_type: message.message_type.clone(),
                fields: None,
                sealed: Some(security.messages.seal(&message.message_type, &plaintext)?),
            }
        } else {
            WireMessage {
                message_type: message.message_type.clone(),
                fields: Some(fields),
                sealed: None,
            }
        };

        Ok(serde_json::to_vec(&wire)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<BusMessage, SerializationError> {
        let wire: WireMessage = serde_json::from_slice(bytes)?;
        let security = self.security();

        let (encrypted, fields) = match (wire.fields, wire.sealed) {
            (Some(fields), None) => (false, fields),
            (None, Some(sealed)) => {
                let plaintext = security.messages.open(&wire.message_type, &sealed)?;
                (true, serde_json::from_slice(&plaintext)?)
            }
            (None, None) => (false, BTreeMap::new()),
            (Some(_), Some(_)) => {
                return Err(SerializationError::Malformed(format!(
                    "{} carries both plain and sealed fields",
                    wire.message_type
                )))
            }
        };

        Ok(BusMessage {
            fields: Self::decode_fields(&security, fields)?,
            message_type: wire.message_type,
            encrypted,
        })
    }
}
