//! # In-Memory Transport
//!
//! A process-local queue system with transactional receive and send.
//! Suitable for single-process hosting and tests; a networked queue would
//! implement the same [`Transport`] port.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{Endpoint, QueueMessage};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use crate::transport::{TransactionId, Transport, TransportError};

/// Work recorded under an open transaction.
#[derive(Debug, Default)]
struct PendingUnit {
    /// Messages taken off queues, restored on rollback.
    received: Vec<(Endpoint, QueueMessage)>,
    /// Messages held back until commit.
    sent: Vec<(Endpoint, QueueMessage)>,
}

/// In-memory implementation of [`Transport`].
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    /// Queue contents keyed by endpoint.
    queues: Mutex<HashMap<Endpoint, VecDeque<QueueMessage>>>,

    /// Open transactions.
    transactions: Mutex<HashMap<TransactionId, PendingUnit>>,

    /// Wakes receivers whenever a message becomes visible.
    arrivals: Notify,

    /// Total messages made visible on any queue.
    messages_enqueued: AtomicU64,
}

impl InMemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages currently visible on `queue`.
    #[must_use]
    pub fn depth(&self, queue: &Endpoint) -> usize {
        self.queues.lock().get(queue).map_or(0, VecDeque::len)
    }

    /// Snapshot of the messages currently visible on `queue`.
    #[must_use]
    pub fn peek_all(&self, queue: &Endpoint) -> Vec<QueueMessage> {
        self.queues
            .lock()
            .get(queue)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn queue_exists(&self, queue: &Endpoint) -> bool {
        self.queues.lock().contains_key(queue)
    }

    /// Number of transactions not yet committed or rolled back.
    #[must_use]
    pub fn open_transactions(&self) -> usize {
        self.transactions.lock().len()
    }

    /// Total messages made visible since creation.
    #[must_use]
    pub fn messages_enqueued(&self) -> u64 {
        self.messages_enqueued.load(Ordering::Relaxed)
    }

    fn enqueue(&self, destination: &Endpoint, message: QueueMessage) -> Result<(), TransportError> {
        let mut queues = self.queues.lock();
        let queue = queues
            .get_mut(destination)
            .ok_or_else(|| TransportError::QueueNotFound(destination.to_string()))?;
        queue.push_back(message);
        self.messages_enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn try_take(
        &self,
        queue: &Endpoint,
        tx: Option<TransactionId>,
    ) -> Result<Option<QueueMessage>, TransportError> {
        let mut queues = self.queues.lock();
        let messages = queues
            .get_mut(queue)
            .ok_or_else(|| TransportError::QueueNotFound(queue.to_string()))?;

        let Some(tx) = tx else {
            return Ok(messages.pop_front());
        };

        let mut transactions = self.transactions.lock();
        let unit = transactions
            .get_mut(&tx)
            .ok_or(TransportError::UnknownTransaction(tx))?;
        let Some(message) = messages.pop_front() else {
            return Ok(None);
        };
        unit.received.push((queue.clone(), message.clone()));
        Ok(Some(message))
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(
        &self,
        destination: &Endpoint,
        message: QueueMessage,
        tx: Option<TransactionId>,
    ) -> Result<(), TransportError> {
        let Some(tx) = tx else {
            self.enqueue(destination, message)?;
            self.arrivals.notify_waiters();
            return Ok(());
        };

        if !self.queue_exists(destination) {
            return Err(TransportError::QueueNotFound(destination.to_string()));
        }
        let mut transactions = self.transactions.lock();
        let unit = transactions
            .get_mut(&tx)
            .ok_or(TransportError::UnknownTransaction(tx))?;
        unit.sent.push((destination.clone(), message));
        Ok(())
    }

    async fn receive(
        &self,
        queue: &Endpoint,
        timeout: Duration,
        tx: Option<TransactionId>,
    ) -> Result<Option<QueueMessage>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before checking so an arrival in between
            // still wakes us.
            let notified = self.arrivals.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(message) = self.try_take(queue, tx)? {
                return Ok(Some(message));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn begin(&self) -> Result<TransactionId, TransportError> {
        let tx = TransactionId::new();
        self.transactions.lock().insert(tx, PendingUnit::default());
        Ok(tx)
    }

    async fn commit(&self, tx: TransactionId) -> Result<(), TransportError> {
        let unit = self
            .transactions
            .lock()
            .remove(&tx)
            .ok_or(TransportError::UnknownTransaction(tx))?;

        let sent = unit.sent.len();
        {
            let mut queues = self.queues.lock();
            for (destination, message) in unit.sent {
                // Queue existence was checked at send time; queues are never removed.
                if let Some(queue) = queues.get_mut(&destination) {
                    queue.push_back(message);
                    self.messages_enqueued.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        if sent > 0 {
            self.arrivals.notify_waiters();
        }
        debug!(%tx, received = unit.received.len(), sent, "Transaction committed");
        Ok(())
    }

    async fn rollback(&self, tx: TransactionId) -> Result<(), TransportError> {
        let unit = self
            .transactions
            .lock()
            .remove(&tx)
            .ok_or(TransportError::UnknownTransaction(tx))?;

        let restored = unit.received.len();
        {
            let mut queues = self.queues.lock();
            // Reverse so the original order is restored at the head.
            for (queue, message) in unit.received.into_iter().rev() {
                queues.entry(queue).or_default().push_front(message);
            }
        }
        if restored > 0 {
            self.arrivals.notify_waiters();
        }
        debug!(%tx, restored, discarded = unit.sent.len(), "Transaction rolled back");
        Ok(())
    }

    async fn create_queue(&self, queue: &Endpoint) -> Result<(), TransportError> {
        self.queues.lock().entry(queue.clone()).or_default();
        Ok(())
    }
}
