//! # Queue Consumers
//!
//! The receive loop shared by every role that drains a queue: the bus, the
//! load balancer and the ready-for-work listener.
//!
//! Each task repeatedly opens a transaction (when transactional), receives
//! with [`DEFAULT_RECEIVE_TIMEOUT`], hands the message to the consumer and
//! commits or rolls back according to the returned [`Disposition`]. Shutdown
//! is checked between receives, so a task always finishes its current unit.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared_types::{Endpoint, QueueMessage};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::transport::{TransactionId, Transport};
use crate::DEFAULT_RECEIVE_TIMEOUT;

/// Pause after a rollback or a transport failure before receiving again.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// What to do with the transactional unit once a message was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Make the receive final.
    Commit,
    /// Put the message back on its queue.
    ///
    /// Has no effect outside a transaction; non-transactional consumers keep
    /// whatever they cannot finish themselves.
    Rollback,
}

/// Handles messages received by [`spawn_consumers`].
#[async_trait]
pub trait QueueConsumer: Send + Sync + 'static {
    /// Handle one message inside `tx`.
    async fn consume(&self, message: QueueMessage, tx: Option<TransactionId>) -> Disposition;

    /// Runs before every receive.
    async fn before_receive(&self) {}
}

/// Where and how to consume.
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    /// Role name used in logs.
    pub role: &'static str,
    pub endpoint: Endpoint,
    pub thread_count: usize,
    pub transactional: bool,
}

/// Spawn `thread_count` consumer tasks. They exit once `shutdown` reads `true`.
pub fn spawn_consumers(
    settings: ConsumerSettings,
    transport: Arc<dyn Transport>,
    consumer: Arc<dyn QueueConsumer>,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    (0..settings.thread_count.max(1))
        .map(|worker| {
            let settings = settings.clone();
            let transport = Arc::clone(&transport);
            let consumer = Arc::clone(&consumer);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                consume_loop(worker, settings, transport, consumer, shutdown).await;
            })
        })
        .collect()
}

async fn consume_loop(
    worker: usize,
    settings: ConsumerSettings,
    transport: Arc<dyn Transport>,
    consumer: Arc<dyn QueueConsumer>,
    shutdown: watch::Receiver<bool>,
) {
    let ConsumerSettings {
        role,
        endpoint,
        transactional,
        ..
    } = settings;
    debug!(role, worker, %endpoint, transactional, "Consumer started");

    while !*shutdown.borrow() {
        consumer.before_receive().await;

        let tx = if transactional {
            match transport.begin().await {
                Ok(tx) => Some(tx),
                Err(e) => {
                    warn!(role, %endpoint, error = %e, "Failed to begin transaction");
                    tokio::time::sleep(RETRY_BACKOFF).await;
                    continue;
                }
            }
        } else {
            None
        };

        let disposition = match transport.receive(&endpoint, DEFAULT_RECEIVE_TIMEOUT, tx).await {
            Ok(Some(message)) => consumer.consume(message, tx).await,
            Ok(None) => Disposition::Commit,
            Err(e) => {
                warn!(role, %endpoint, error = %e, "Receive failed");
                Disposition::Rollback
            }
        };

        finish(role, &*transport, tx, disposition).await;
        if disposition == Disposition::Rollback {
            tokio::time::sleep(RETRY_BACKOFF).await;
        }
    }

    debug!(role, worker, %endpoint, "Consumer stopped");
}

async fn finish(
    role: &'static str,
    transport: &dyn Transport,
    tx: Option<TransactionId>,
    disposition: Disposition,
) {
    let Some(tx) = tx else {
        return;
    };

    match disposition {
        Disposition::Commit => {
            if let Err(e) = transport.commit(tx).await {
                warn!(role, %tx, error = %e, "Commit failed, rolling back");
                if let Err(e) = transport.rollback(tx).await {
                    warn!(role, %tx, error = %e, "Rollback after failed commit failed");
                }
            }
        }
        Disposition::Rollback => {
            if let Err(e) = transport.rollback(tx).await {
                warn!(role, %tx, error = %e, "Rollback failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryTransport;
    use parking_lot::Mutex;

    struct Recorder {
        seen: Mutex<Vec<String>>,
        reject_first: Mutex<bool>,
    }

    #[async_trait]
    impl QueueConsumer for Recorder {
        async fn consume(&self, message: QueueMessage, _tx: Option<TransactionId>) -> Disposition {
            let mut reject = self.reject_first.lock();
            if *reject {
                *reject = false;
                return Disposition::Rollback;
            }
            self.seen.lock().push(message.message_type);
            Disposition::Commit
        }
    }

    #[tokio::test]
    async fn test_rollback_redelivers_then_commits() {
        let transport = Arc::new(InMemoryTransport::new());
        let queue = Endpoint::parse("memory://localhost/work").unwrap();
        transport.create_queue(&queue).await.unwrap();
        transport
            .send(&queue, QueueMessage::new("Job", Vec::new()), None)
            .await
            .unwrap();

        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            reject_first: Mutex::new(true),
        });
        let (stop, shutdown) = watch::channel(false);
        let handles = spawn_consumers(
            ConsumerSettings {
                role: "test",
                endpoint: queue.clone(),
                thread_count: 1,
                transactional: true,
            },
            transport.clone(),
            recorder.clone(),
            shutdown,
        );

        for _ in 0..50 {
            if !recorder.seen.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        stop.send(true).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*recorder.seen.lock(), vec!["Job".to_string()]);
        assert_eq!(transport.depth(&queue), 0);
        assert_eq!(transport.open_transactions(), 0);
    }
}
