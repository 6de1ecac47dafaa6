//! # Shared Types Crate
//!
//! Addressing, routing and envelope types used by every crate of the bus.
//!
//! ## Design Principles
//!
//! - **Absolute addressing**: an [`Endpoint`] can only be built from an
//!   absolute URI, so every queue address in the system is fully qualified.
//! - **Ordered ownership**: [`MessageOwners`] keeps owners in declaration
//!   order and the first matching owner wins.
//! - **Opaque bodies**: a [`QueueMessage`] carries an encoded body; only the
//!   serializer knows how [`BusMessage`] fields map to bytes.

pub mod endpoint;
pub mod envelope;
pub mod errors;
pub mod message;
pub mod options;
pub mod routing;

pub use endpoint::Endpoint;
pub use envelope::{QueueMessage, RETRY_COUNT_HEADER};
pub use errors::*;
pub use message::{BusMessage, EncryptedValue, FieldValue, WireEncryptedString};
pub use options::{IsolationLevel, TransactionalMode};
pub use routing::{MessageOwner, MessageOwners};
