//! # Load Balancer Service
//!
//! Consumes the balancer endpoint. Readiness signals update the capacity
//! table; everything else is a work unit that is dispatched, held, or (in
//! standby) forwarded to the primary.
//!
//! The state and the dispatcher share one mutex, so selecting a worker and
//! decrementing its capacity is a single step. Sends happen after the lock is
//! released.
//!
//! Work leaves the balancer outside the receive transaction. A held unit has
//! already been committed off the balancer queue, so a send that a rollback
//! discarded could not be recovered. A redelivered message is recognized by
//! the processed-message ledger and acknowledged without being applied again.

use std::sync::Arc;

use async_trait::async_trait;
use bus_telemetry::{BACKLOG_DEPTH, READY_SIGNALS, WORK_DISPATCHED, WORK_HELD};
use parking_lot::Mutex;
use qb_01_configuration::LoadBalancerConfiguration;
use shared_bus::{
    spawn_consumers, ConsumerSettings, Disposition, MessageSerializer, ProcessedMessageLedger,
    QueueConsumer, TransactionId, Transport,
};
use shared_types::{Endpoint, QueueMessage};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::listener::ReadyForWorkListener;
use crate::domain::{Assignment, BalancerState, Dispatcher, ReadyForWork, WorkerCapacity};
use crate::error::LoadBalancerError;
use crate::ports::ReadySignalSink;

/// What happened to an accepted work unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkOutcome {
    /// Sent to a worker.
    Dispatched { worker: Endpoint },
    /// No worker had capacity; waiting in the backlog.
    Held { depth: usize },
    /// Standby secondary passed it on to the primary.
    Forwarded { primary: Endpoint },
}

/// Point-in-time view of a balancer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalancerStatus {
    pub endpoint: Endpoint,
    pub state: BalancerState,
    pub workers: Vec<WorkerCapacity>,
    pub backlog: usize,
}

struct BalancerCore {
    state: BalancerState,
    dispatcher: Dispatcher<QueueMessage>,
}

enum Route {
    Dispatch(Vec<Assignment<QueueMessage>>, usize),
    Forward(QueueMessage, Endpoint),
}

/// Primary or secondary load balancer.
pub struct LoadBalancer {
    config: LoadBalancerConfiguration,
    transport: Arc<dyn Transport>,
    serializer: Arc<dyn MessageSerializer>,
    core: Mutex<BalancerCore>,
    /// Ids of messages already taken off the balancer queue.
    ledger: Mutex<ProcessedMessageLedger>,
}

impl LoadBalancer {
    pub fn new(
        config: LoadBalancerConfiguration,
        transport: Arc<dyn Transport>,
        serializer: Arc<dyn MessageSerializer>,
    ) -> Self {
        let state = BalancerState::for_role(&config.role);
        info!(
            endpoint = %config.endpoint,
            role = %config.role,
            %state,
            threads = config.thread_count,
            transactional = config.transactional,
            "Load balancer created"
        );
        Self {
            config,
            transport,
            serializer,
            core: Mutex::new(BalancerCore {
                state,
                dispatcher: Dispatcher::new(),
            }),
            ledger: Mutex::new(ProcessedMessageLedger::new()),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.config.endpoint
    }

    #[must_use]
    pub fn config(&self) -> &LoadBalancerConfiguration {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> BalancerState {
        self.core.lock().state
    }

    #[must_use]
    pub fn status(&self) -> BalancerStatus {
        let core = self.core.lock();
        BalancerStatus {
            endpoint: self.config.endpoint.clone(),
            state: core.state,
            workers: core.dispatcher.pool().snapshot(),
            backlog: core.dispatcher.backlog_len(),
        }
    }

    /// Queues this balancer needs deployed.
    #[must_use]
    pub fn queues(&self) -> Vec<Endpoint> {
        vec![self.config.endpoint.clone()]
    }

    /// Route readiness signals from `listener` to this balancer.
    pub fn attach_ready_for_work(self: &Arc<Self>, listener: &ReadyForWorkListener) {
        let sink: Arc<dyn ReadySignalSink> = self.clone();
        if listener.attach(sink) {
            info!(
                balancer = %self.config.endpoint,
                listener = %listener.endpoint(),
                "Ready-for-work listener attached"
            );
        }
    }

    /// Accept a unit of work.
    ///
    /// # Errors
    ///
    /// `DispatchBacklog` if delivery failed and the unit was held instead.
    pub async fn accept_work(&self, work: QueueMessage) -> Result<WorkOutcome, LoadBalancerError> {
        let route = {
            let mut core = self.core.lock();
            match (core.state, self.config.primary_load_balancer_endpoint()) {
                (BalancerState::SecondaryStandby, Some(primary)) => {
                    Route::Forward(work, primary.clone())
                }
                _ => {
                    let before = core.dispatcher.backlog_len();
                    let assignments = core.dispatcher.accept(work);
                    let after = core.dispatcher.backlog_len();
                    track_backlog(before, after);
                    if assignments.is_empty() {
                        WORK_HELD.inc();
                    }
                    Route::Dispatch(assignments, after)
                }
            }
        };

        match route {
            Route::Forward(work, primary) => self.forward(work, primary).await,
            Route::Dispatch(assignments, depth) => {
                let Some(worker) = assignments.first().map(|a| a.worker.clone()) else {
                    debug!(balancer = %self.config.endpoint, depth, "No ready worker, work held");
                    return Ok(WorkOutcome::Held { depth });
                };
                self.deliver(assignments).await?;
                Ok(WorkOutcome::Dispatched { worker })
            }
        }
    }

    /// Apply a readiness signal, returning how many held units were delivered.
    ///
    /// In standby the capacity is recorded but nothing is dispatched.
    ///
    /// # Errors
    ///
    /// `DispatchBacklog` if a delivery failed; the capacity update still stands.
    pub async fn apply_ready(&self, signal: ReadyForWork) -> Result<usize, LoadBalancerError> {
        let assignments = {
            let mut core = self.core.lock();
            let before = core.dispatcher.backlog_len();
            let assignments = if core.state.is_active() {
                core.dispatcher.ready(&signal.endpoint, signal.capacity)
            } else {
                core.dispatcher.grant(&signal.endpoint, signal.capacity);
                Vec::new()
            };
            track_backlog(before, core.dispatcher.backlog_len());
            assignments
        };
        READY_SIGNALS.inc();
        debug!(
            balancer = %self.config.endpoint,
            worker = %signal.endpoint,
            capacity = signal.capacity,
            flushed = assignments.len(),
            "Ready for work"
        );

        self.deliver(assignments).await
    }

    /// Promote a standby secondary and dispatch anything it was holding.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the balancer is a standby secondary.
    pub async fn promote(&self) -> Result<usize, LoadBalancerError> {
        let assignments = {
            let mut core = self.core.lock();
            core.state = core.state.promote()?;
            let before = core.dispatcher.backlog_len();
            let assignments = core.dispatcher.drain();
            track_backlog(before, core.dispatcher.backlog_len());
            assignments
        };
        info!(
            balancer = %self.config.endpoint,
            primary = ?self.config.primary_load_balancer_endpoint().map(Endpoint::as_str),
            "Secondary load balancer promoted"
        );

        self.deliver(assignments).await
    }

    /// Start `thread_count` consumers on the balancer endpoint.
    pub fn start(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        spawn_consumers(
            ConsumerSettings {
                role: "load-balancer",
                endpoint: self.config.endpoint.clone(),
                thread_count: self.config.thread_count,
                transactional: self.config.transactional,
            },
            Arc::clone(&self.transport),
            self.clone(),
            shutdown,
        )
    }

    async fn forward(
        &self,
        work: QueueMessage,
        primary: Endpoint,
    ) -> Result<WorkOutcome, LoadBalancerError> {
        match self.transport.send(&primary, work.clone(), None).await {
            Ok(()) => {
                debug!(balancer = %self.config.endpoint, %primary, id = %work.id, "Forwarded to primary");
                Ok(WorkOutcome::Forwarded { primary })
            }
            Err(e) => {
                let depth = {
                    let mut core = self.core.lock();
                    core.dispatcher.hold(work);
                    track_backlog(0, 1);
                    core.dispatcher.backlog_len()
                };
                warn!(balancer = %self.config.endpoint, %primary, error = %e, "Forward failed, work held");
                Err(LoadBalancerError::DispatchBacklog {
                    depth,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Send assignments. Units whose send failed go back to the head of the
    /// backlog, and whatever capacity was granted meanwhile is drained again.
    async fn deliver(
        &self,
        mut assignments: Vec<Assignment<QueueMessage>>,
    ) -> Result<usize, LoadBalancerError> {
        let mut delivered = 0;
        let mut last_error = None;

        while !assignments.is_empty() {
            let mut failed = Vec::new();
            for Assignment { worker, work } in assignments {
                match self.transport.send(&worker, work.clone(), None).await {
                    Ok(()) => {
                        delivered += 1;
                        WORK_DISPATCHED.inc();
                        debug!(balancer = %self.config.endpoint, %worker, id = %work.id, "Work dispatched");
                    }
                    Err(e) => {
                        warn!(balancer = %self.config.endpoint, %worker, error = %e, "Dispatch failed, work requeued");
                        last_error = Some(e);
                        failed.push(work);
                    }
                }
            }
            if failed.is_empty() {
                break;
            }

            assignments = {
                let mut core = self.core.lock();
                let before = core.dispatcher.backlog_len();
                for work in failed.into_iter().rev() {
                    core.dispatcher.requeue_front(work);
                }
                let next = if core.state.is_active() {
                    core.dispatcher.drain()
                } else {
                    Vec::new()
                };
                track_backlog(before, core.dispatcher.backlog_len());
                next
            };
        }

        let Some(error) = last_error else {
            return Ok(delivered);
        };
        Err(LoadBalancerError::DispatchBacklog {
            depth: self.core.lock().dispatcher.backlog_len(),
            reason: error.to_string(),
        })
    }
}

fn track_backlog(before: usize, after: usize) {
    let delta = i64::try_from(after).unwrap_or(i64::MAX) - i64::try_from(before).unwrap_or(i64::MAX);
    if delta != 0 {
        BACKLOG_DEPTH.add(delta);
    }
}

#[async_trait]
impl ReadySignalSink for LoadBalancer {
    async fn ready_for_work(&self, signal: ReadyForWork) -> Result<(), LoadBalancerError> {
        match self.apply_ready(signal).await {
            Ok(_) => Ok(()),
            Err(LoadBalancerError::DispatchBacklog { depth, reason }) => {
                warn!(balancer = %self.config.endpoint, depth, %reason, "Signal applied, delivery held");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl QueueConsumer for LoadBalancer {
    async fn consume(&self, message: QueueMessage, _tx: Option<TransactionId>) -> Disposition {
        let id = message.id;
        if self.ledger.lock().contains(&id) {
            debug!(balancer = %self.config.endpoint, %id, "Message already handled");
            return Disposition::Commit;
        }

        let result = if ReadyForWork::is_signal(&message) {
            match ReadyForWork::from_queue_message(&message, &*self.serializer) {
                Ok(signal) => self.apply_ready(signal).await.map(|_| ()),
                Err(e) => {
                    warn!(balancer = %self.config.endpoint, %id, error = %e, "Discarding malformed signal");
                    return Disposition::Commit;
                }
            }
        } else {
            self.accept_work(message).await.map(|_| ())
        };

        match result {
            Ok(()) => {
                self.ledger.lock().record(id);
                Disposition::Commit
            }
            Err(LoadBalancerError::DispatchBacklog { depth, reason }) => {
                self.ledger.lock().record(id);
                warn!(balancer = %self.config.endpoint, depth, %reason, "Work held for retry");
                Disposition::Commit
            }
            Err(e) => {
                error!(balancer = %self.config.endpoint, error = %e, "Load balancer failed to handle message");
                Disposition::Rollback
            }
        }
    }
}
