//! # Transport Port
//!
//! What the balancer, the listener and the bus need from a queue system.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use shared_types::{Endpoint, QueueMessage};
use thiserror::Error;
use uuid::Uuid;

/// Identifies an open transactional unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(Uuid);

impl TransactionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from transport operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The destination queue does not exist.
    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    /// The transaction was never begun or already finished.
    #[error("Unknown transaction: {0}")]
    UnknownTransaction(TransactionId),

    /// Any other transport failure.
    #[error("Transport failure: {0}")]
    Failure(String),
}

/// Queue transport.
///
/// When `tx` is `Some`, a receive is only final once the transaction commits
/// (a rollback puts the message back at the head of its queue) and a send only
/// becomes visible at commit.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `message` to `destination`.
    async fn send(
        &self,
        destination: &Endpoint,
        message: QueueMessage,
        tx: Option<TransactionId>,
    ) -> Result<(), TransportError>;

    /// Receive the next message from `queue`, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when the timeout elapses with nothing to read.
    async fn receive(
        &self,
        queue: &Endpoint,
        timeout: Duration,
        tx: Option<TransactionId>,
    ) -> Result<Option<QueueMessage>, TransportError>;

    /// Open a transactional unit.
    async fn begin(&self) -> Result<TransactionId, TransportError>;

    /// Make the unit's receives final and its sends visible.
    async fn commit(&self, tx: TransactionId) -> Result<(), TransportError>;

    /// Undo the unit's receives and discard its sends.
    async fn rollback(&self, tx: TransactionId) -> Result<(), TransportError>;

    /// Create `queue` if it does not exist yet.
    async fn create_queue(&self, queue: &Endpoint) -> Result<(), TransportError>;
}
