//! Crypto error types.

use thiserror::Error;

/// Failures of the AEAD layer underneath wire security.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Could not seal value: {0}")]
    Seal(String),

    /// Wrong key, wrong nonce, or tampered ciphertext. AES-GCM does not say which.
    #[error("Ciphertext failed authentication")]
    Open,

    /// Key or nonce material of the wrong size.
    #[error("{material} must be {expected} bytes, got {actual}")]
    InvalidLength {
        material: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A hex field of an encrypted wire value did not decode.
    #[error("Invalid {part} encoding: {reason}")]
    InvalidEncoding { part: &'static str, reason: String },
}
