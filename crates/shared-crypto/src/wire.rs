//! # Wire Converters
//!
//! Two converters sit between the serializer and the encryption service:
//!
//! - the **field converter** handles individual [`WireEncryptedString`] fields,
//! - the **message converter** handles messages marked as wholly encrypted.
//!
//! Each has a disabled variant that fails the moment it is asked to do
//! anything. A bus that never negotiated a key therefore refuses to send or
//! read encrypted data instead of leaking it as plaintext.

use std::sync::Arc;

use shared_types::{EncryptedValue, WireEncryptedString};
use thiserror::Error;

use crate::service::EncryptionService;
use crate::CryptoError;

/// Security negotiation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    /// An encrypted field or message was met while security is disabled.
    #[error("Cannot {operation} {subject}: wire encryption is disabled on this bus")]
    SecurityDisabled {
        /// `encrypt` or `decrypt`.
        operation: &'static str,
        /// What was being converted (field or message type).
        subject: String,
    },

    /// Encryption or decryption failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Decrypted bytes are not valid for the target type.
    #[error("Malformed encrypted payload: {0}")]
    MalformedPayload(String),
}

/// Converts [`WireEncryptedString`] fields to and from their wire form.
pub trait WireEncryptedStringConverter: Send + Sync {
    /// Encrypt a field value for the wire.
    fn to_wire(&self, field: &str, value: &WireEncryptedString)
        -> Result<EncryptedValue, SecurityError>;

    /// Decrypt a field value read from the wire.
    fn from_wire(&self, field: &str, value: &EncryptedValue)
        -> Result<WireEncryptedString, SecurityError>;
}

/// Converts the encoded body of a wholly encrypted message.
pub trait WireEncryptedMessageConverter: Send + Sync {
    /// Encrypt the serialized field map of `message_type`.
    fn seal(&self, message_type: &str, plaintext: &[u8]) -> Result<EncryptedValue, SecurityError>;

    /// Decrypt a sealed field map.
    fn open(&self, message_type: &str, value: &EncryptedValue) -> Result<Vec<u8>, SecurityError>;
}

/// Field converter backed by an [`EncryptionService`].
pub struct WireEncryptedStringConverterImpl {
    service: Arc<dyn EncryptionService>,
}

impl WireEncryptedStringConverterImpl {
    /// Wrap an encryption service.
    pub fn new(service: Arc<dyn EncryptionService>) -> Self {
        Self { service }
    }
}

impl WireEncryptedStringConverter for WireEncryptedStringConverterImpl {
    fn to_wire(
        &self,
        _field: &str,
        value: &WireEncryptedString,
    ) -> Result<EncryptedValue, SecurityError> {
        Ok(self.service.encrypt(value.value().as_bytes())?)
    }

    fn from_wire(
        &self,
        field: &str,
        value: &EncryptedValue,
    ) -> Result<WireEncryptedString, SecurityError> {
        let bytes = self.service.decrypt(value)?;
        let text = String::from_utf8(bytes)
            .map_err(|_| SecurityError::MalformedPayload(format!("field '{field}' is not UTF-8")))?;
        Ok(WireEncryptedString::new(text))
    }
}

/// Message converter backed by an [`EncryptionService`].
pub struct WireEncryptedMessageConverterImpl {
    service: Arc<dyn EncryptionService>,
}

impl WireEncryptedMessageConverterImpl {
    /// Wrap an encryption service.
    pub fn new(service: Arc<dyn EncryptionService>) -> Self {
        Self { service }
    }
}

impl WireEncryptedMessageConverter for WireEncryptedMessageConverterImpl {
    fn seal(&self, _message_type: &str, plaintext: &[u8]) -> Result<EncryptedValue, SecurityError> {
        Ok(self.service.encrypt(plaintext)?)
    }

    fn open(&self, _message_type: &str, value: &EncryptedValue) -> Result<Vec<u8>, SecurityError> {
        Ok(self.service.decrypt(value)?)
    }
}

/// Field converter used when no key was configured.
#[derive(Debug, Default)]
pub struct DisabledWireEncryptedStringConverter;

impl WireEncryptedStringConverter for DisabledWireEncryptedStringConverter {
    fn to_wire(
        &self,
        field: &str,
        _value: &WireEncryptedString,
    ) -> Result<EncryptedValue, SecurityError> {
        Err(SecurityError::SecurityDisabled {
            operation: "encrypt",
            subject: format!("field '{field}'"),
        })
    }

    fn from_wire(
        &self,
        field: &str,
        _value: &EncryptedValue,
    ) -> Result<WireEncryptedString, SecurityError> {
        Err(SecurityError::SecurityDisabled {
            operation: "decrypt",
            subject: format!("field '{field}'"),
        })
    }
}

/// Message converter used when no key was configured.
#[derive(Debug, Default)]
pub struct DisabledWireEncryptedMessageConverter;

impl WireEncryptedMessageConverter for DisabledWireEncryptedMessageConverter {
    fn seal(&self, message_type: &str, _plaintext: &[u8]) -> Result<EncryptedValue, SecurityError> {
        Err(SecurityError::SecurityDisabled {
            operation: "encrypt",
            subject: format!("message {message_type}"),
        })
    }

    fn open(&self, message_type: &str, _value: &EncryptedValue) -> Result<Vec<u8>, SecurityError> {
        Err(SecurityError::SecurityDisabled {
            operation: "decrypt",
            subject: format!("message {message_type}"),
        })
    }
}

/// Which converter pair is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityMode {
    /// Real encryption service behind both converters.
    Enabled,
    /// Fail-closed converters.
    Disabled,
}

/// The converter pair handed to a serializer.
#[derive(Clone)]
pub struct WireSecurity {
    /// Field converter.
    pub strings: Arc<dyn WireEncryptedStringConverter>,
    /// Whole-message converter.
    pub messages: Arc<dyn WireEncryptedMessageConverter>,
    mode: SecurityMode,
}

impl WireSecurity {
    /// Both converters backed by `service`.
    pub fn enabled(service: Arc<dyn EncryptionService>) -> Self {
        Self {
            strings: Arc::new(WireEncryptedStringConverterImpl::new(Arc::clone(&service))),
            messages: Arc::new(WireEncryptedMessageConverterImpl::new(service)),
            mode: SecurityMode::Enabled,
        }
    }

    /// Both converters fail closed.
    pub fn disabled() -> Self {
        Self {
            strings: Arc::new(DisabledWireEncryptedStringConverter),
            messages: Arc::new(DisabledWireEncryptedMessageConverter),
            mode: SecurityMode::Disabled,
        }
    }

    /// Installed mode.
    pub fn mode(&self) -> SecurityMode {
        self.mode
    }
}

impl std::fmt::Debug for WireSecurity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireSecurity").field("mode", &self.mode).finish()
    }
}
