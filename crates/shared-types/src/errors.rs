//! # Error Types
//!
//! Errors raised while building shared value types.

use thiserror::Error;

/// Errors that can occur while parsing an [`crate::Endpoint`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// The value is not an absolute URI.
    #[error("'{value}' is not an absolute URI: {reason}")]
    NotAbsolute { value: String, reason: String },
}

/// An enumerator name that does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct ParseEnumError {
    /// Name of the enumeration being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}
