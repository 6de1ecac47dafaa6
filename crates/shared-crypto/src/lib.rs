//! # Shared Crypto - Wire Security
//!
//! ## Components
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `symmetric` | AES-256-GCM primitives and key handling |
//! | `service` | `EncryptionService` used by the wire converters |
//! | `wire` | Field and whole-message converters, enabled and fail-closed |
//!
//! ## Security Properties
//!
//! - **AES-256-GCM**: authenticated encryption, random 96-bit nonce per value
//! - **Fail closed**: with security disabled, any encrypted field or
//!   encrypted-message marker is an error, never plaintext on the wire
//! - **Key hygiene**: key material is zeroized on drop

#![warn(clippy::all)]

pub mod errors;
pub mod service;
pub mod symmetric;
pub mod wire;

// Re-exports
pub use errors::CryptoError;
pub use service::{AesEncryptionService, EncryptionService};
pub use symmetric::{Nonce, SecretKey, KEY_LEN, NONCE_LEN};
pub use wire::{
    DisabledWireEncryptedMessageConverter, DisabledWireEncryptedStringConverter, SecurityError,
    SecurityMode, WireEncryptedMessageConverter, WireEncryptedStringConverter, WireSecurity,
};
