//! # Ready-For-Work Listener
//!
//! Consumes the dedicated readiness queue and forwards each signal to the
//! attached balancer.
//!
//! Applying a signal and committing its receive are tied together through the
//! processed-message ledger: the id is recorded only after the balancer
//! applied the signal, and a redelivered id is acknowledged without being
//! applied again.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_bus::{
    spawn_consumers, ConsumerSettings, Disposition, MessageSerializer, ProcessedMessageLedger,
    QueueConsumer, TransactionId, Transport,
};
use shared_types::{Endpoint, QueueMessage};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::ReadyForWork;
use crate::ports::ReadySignalSink;

/// Backpressure channel between workers and a load balancer.
pub struct ReadyForWorkListener {
    endpoint: Endpoint,
    thread_count: usize,
    transactional: bool,
    transport: Arc<dyn Transport>,
    serializer: Arc<dyn MessageSerializer>,
    ledger: Mutex<ProcessedMessageLedger>,
    sink: RwLock<Option<Arc<dyn ReadySignalSink>>>,
    /// Signals received before a balancer was attached (non-transactional only).
    held: Mutex<VecDeque<ReadyForWork>>,
}

impl ReadyForWorkListener {
    pub fn new(
        endpoint: Endpoint,
        thread_count: usize,
        transactional: bool,
        transport: Arc<dyn Transport>,
        serializer: Arc<dyn MessageSerializer>,
    ) -> Self {
        info!(%endpoint, thread_count, transactional, "Ready-for-work listener created");
        Self {
            endpoint,
            thread_count,
            transactional,
            transport,
            serializer,
            ledger: Mutex::new(ProcessedMessageLedger::new()),
            sink: RwLock::new(None),
            held: Mutex::new(VecDeque::new()),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Attach the balancer signals are forwarded to.
    ///
    /// Returns `false` if one is already attached; the first attachment stays.
    pub fn attach(&self, sink: Arc<dyn ReadySignalSink>) -> bool {
        let mut slot = self.sink.write();
        if slot.is_some() {
            return false;
        }
        *slot = Some(sink);
        true
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.sink.read().is_some()
    }

    /// Signals waiting for a balancer to be attached.
    #[must_use]
    pub fn held_signals(&self) -> usize {
        self.held.lock().len()
    }

    /// Queues this listener needs deployed.
    #[must_use]
    pub fn queues(&self) -> Vec<Endpoint> {
        vec![self.endpoint.clone()]
    }

    /// Handle one received signal inside `tx`.
    pub async fn process(&self, message: QueueMessage, tx: Option<TransactionId>) -> Disposition {
        let signal = match ReadyForWork::from_queue_message(&message, &*self.serializer) {
            Ok(signal) => signal,
            Err(e) => {
                warn!(listener = %self.endpoint, id = %message.id, error = %e, "Discarding malformed signal");
                return Disposition::Commit;
            }
        };

        if self.ledger.lock().contains(&message.id) {
            debug!(listener = %self.endpoint, id = %message.id, "Signal already applied");
            return Disposition::Commit;
        }

        let sink = self.sink.read().clone();
        let Some(sink) = sink else {
            if tx.is_some() {
                debug!(listener = %self.endpoint, "No balancer attached, signal rolled back");
                return Disposition::Rollback;
            }
            self.ledger.lock().record(message.id);
            self.held.lock().push_back(signal);
            debug!(listener = %self.endpoint, "No balancer attached, signal held");
            return Disposition::Commit;
        };

        match sink.ready_for_work(signal.clone()).await {
            Ok(()) => {
                self.ledger.lock().record(message.id);
                Disposition::Commit
            }
            Err(e) => {
                warn!(listener = %self.endpoint, worker = %signal.endpoint, error = %e, "Signal not applied");
                if tx.is_none() {
                    self.ledger.lock().record(message.id);
                    self.held.lock().push_back(signal);
                }
                Disposition::Rollback
            }
        }
    }

    /// Apply held signals to the attached balancer, returning how many were applied.
    pub async fn replay_held(&self) -> usize {
        let Some(sink) = self.sink.read().clone() else {
            return 0;
        };

        let mut applied = 0;
        loop {
            let Some(signal) = self.held.lock().pop_front() else {
                break;
            };
            if let Err(e) = sink.ready_for_work(signal.clone()).await {
                warn!(listener = %self.endpoint, error = %e, "Held signal not applied");
                self.held.lock().push_front(signal);
                break;
            }
            applied += 1;
        }
        if applied > 0 {
            debug!(listener = %self.endpoint, applied, "Replayed held signals");
        }
        applied
    }

    /// Start `thread_count` consumers on the readiness queue.
    pub fn start(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        spawn_consumers(
            ConsumerSettings {
                role: "ready-for-work",
                endpoint: self.endpoint.clone(),
                thread_count: self.thread_count,
                transactional: self.transactional,
            },
            Arc::clone(&self.transport),
            self.clone(),
            shutdown,
        )
    }
}

#[async_trait]
impl QueueConsumer for ReadyForWorkListener {
    async fn consume(&self, message: QueueMessage, tx: Option<TransactionId>) -> Disposition {
        self.process(message, tx).await
    }

    async fn before_receive(&self) {
        if self.held_signals() > 0 {
            self.replay_held().await;
        }
    }
}
