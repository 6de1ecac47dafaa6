//! Configuration error types.
//!
//! Every variant is fatal at startup and is reported before any role is
//! registered.

use thiserror::Error;

/// Configuration loading and validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required section is absent.
    #[error("Could not find '{0}' section in configuration")]
    MissingSection(&'static str),

    /// An endpoint is missing or not an absolute URI.
    #[error("Attribute '{field}' has an invalid endpoint value '{value}': {reason}")]
    InvalidEndpoint {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// A boolean-like string is neither `true` nor `false`.
    #[error("Attribute '{field}' has an invalid value '{value}', expected 'true' or 'false'")]
    InvalidBoolean { field: &'static str, value: String },

    /// An enumerated value does not name a known member.
    #[error("Attribute '{field}' has an invalid value '{value}', expected one of: {expected}")]
    InvalidEnumValue {
        field: &'static str,
        value: String,
        expected: String,
    },

    /// A numeric value is outside its allowed range.
    #[error("Attribute '{field}' must be at least {minimum}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        minimum: i64,
    },

    /// A secondary load balancer was configured without its primary's address.
    #[error("A secondary load balancer requires 'primaryLoadBalancerEndpoint'")]
    MissingPrimaryEndpoint,

    /// A primary load balancer referenced another primary.
    #[error("A primary load balancer must not set 'primaryLoadBalancerEndpoint' (got '{endpoint}')")]
    UnexpectedPrimaryEndpoint { endpoint: String },

    /// The security key is not valid hex or has the wrong length.
    #[error("Invalid security key: {0}")]
    InvalidKey(String),

    /// The document is not valid TOML or has mistyped fields.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// The file could not be read.
    #[error("Failed to read configuration file '{path}': {error}")]
    Io { path: String, error: String },
}
