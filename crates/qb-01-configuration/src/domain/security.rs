//! Security posture.

use shared_crypto::SecretKey;

/// Whether wire encryption is negotiated, and with which key.
#[derive(Debug, Clone, Default)]
pub enum SecuritySettings {
    /// Encrypted fields and messages fail closed.
    #[default]
    Disabled,
    /// AES-256 key shared by every endpoint of the bus.
    Enabled(SecretKey),
}

impl SecuritySettings {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }

    /// Key material, if security is enabled.
    #[must_use]
    pub fn key(&self) -> Option<&SecretKey> {
        match self {
            Self::Enabled(key) => Some(key),
            Self::Disabled => None,
        }
    }
}
