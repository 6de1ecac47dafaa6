//! The composed, frozen set of roles and their lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use qb_02_load_balancer::{BalancerStatus, LoadBalancer, ReadyForWorkListener};
use shared_bus::Transport;
use shared_crypto::SecurityMode;
use shared_types::Endpoint;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::bus::DefaultServiceBus;
use crate::container::{BusBuilder, BusContainerBuilder};
use crate::deployment::DeploymentAction;
use crate::error::CompositionError;
use crate::registry::ServiceLocator;

/// Compose every role the builder's configuration asks for.
///
/// Runs the fixed registration order and returns the frozen topology. Any
/// error aborts composition; nothing has been started at that point.
///
/// # Errors
///
/// The first `CompositionError` raised by a registration.
#[instrument(skip_all, fields(endpoint = %builder.config().endpoint))]
pub fn compose(builder: &BusBuilder) -> Result<Topology, CompositionError> {
    let config = builder.config();

    builder.register_default_services(&config.scan_assemblies)?;
    let bus = builder.register_bus()?;

    let load_balancer = match &config.load_balancer {
        Some(lb) if lb.role.is_secondary() => Some(builder.register_secondary_load_balancer(lb)?),
        Some(lb) => Some(builder.register_primary_load_balancer(lb)?),
        None => None,
    };

    let ready_for_work = match &config.load_balancer {
        Some(lb) if lb.ready_for_work_endpoint.is_some() => {
            Some(builder.register_ready_for_work(lb)?)
        }
        _ => None,
    };

    if let Some(endpoint) = &config.load_balancer_endpoint {
        builder.register_load_balancer_endpoint(endpoint)?;
    }
    if let Some(endpoint) = &config.log_endpoint {
        builder.register_logging_endpoint(endpoint)?;
    }

    match config.security.key() {
        Some(key) => {
            builder.register_security(key)?;
        }
        None => builder.register_no_security()?,
    }

    let topology = Topology::new(
        bus,
        load_balancer,
        ready_for_work,
        builder.deployment_actions(),
        builder.transport(),
        builder.locator()?,
        builder.security_mode().unwrap_or(SecurityMode::Disabled),
    );
    info!(
        load_balancer = topology.load_balancer.is_some(),
        ready_for_work = topology.ready_for_work.is_some(),
        security = ?topology.security,
        deployment_actions = topology.deployment.len(),
        "Topology composed"
    );
    Ok(topology)
}

/// Snapshot of a running topology.
#[derive(Debug, Clone)]
pub struct TopologyStatus {
    pub bus_endpoint: Endpoint,
    pub load_balancer: Option<BalancerStatus>,
    /// Readiness signals waiting for a balancer.
    pub held_signals: Option<usize>,
    pub security: SecurityMode,
    pub running_tasks: usize,
}

/// All roles of one bus process, wired and ready to deploy and start.
pub struct Topology {
    bus: Arc<DefaultServiceBus>,
    load_balancer: Option<Arc<LoadBalancer>>,
    ready_for_work: Option<Arc<ReadyForWorkListener>>,
    deployment: Vec<Arc<dyn DeploymentAction>>,
    transport: Arc<dyn Transport>,
    locator: Arc<ServiceLocator>,
    security: SecurityMode,
    started: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Topology {
    fn new(
        bus: Arc<DefaultServiceBus>,
        load_balancer: Option<Arc<LoadBalancer>>,
        ready_for_work: Option<Arc<ReadyForWorkListener>>,
        deployment: Vec<Arc<dyn DeploymentAction>>,
        transport: Arc<dyn Transport>,
        locator: Arc<ServiceLocator>,
        security: SecurityMode,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            bus,
            load_balancer,
            ready_for_work,
            deployment,
            transport,
            locator,
            security,
            started: AtomicBool::new(false),
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<DefaultServiceBus> {
        &self.bus
    }

    #[must_use]
    pub fn load_balancer(&self) -> Option<&Arc<LoadBalancer>> {
        self.load_balancer.as_ref()
    }

    #[must_use]
    pub fn ready_for_work(&self) -> Option<&Arc<ReadyForWorkListener>> {
        self.ready_for_work.as_ref()
    }

    #[must_use]
    pub fn locator(&self) -> &Arc<ServiceLocator> {
        &self.locator
    }

    #[must_use]
    pub fn security(&self) -> SecurityMode {
        self.security
    }

    /// Create every queue the composed roles use.
    ///
    /// # Errors
    ///
    /// The first transport failure.
    pub async fn deploy(&self) -> Result<(), CompositionError> {
        for action in &self.deployment {
            action.execute(self.transport.as_ref()).await?;
            info!(action = %action.describe(), "Deployment action completed");
        }
        Ok(())
    }

    /// Spawn the consumer tasks of every role. Starting twice does nothing.
    ///
    /// Balancer and listener start before the bus, so the bus' first
    /// readiness announcement finds them consuming.
    pub async fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Topology already started");
            return;
        }

        let mut handles = Vec::new();
        if let Some(balancer) = &self.load_balancer {
            handles.extend(balancer.start(self.shutdown_rx.clone()));
        }
        if let Some(listener) = &self.ready_for_work {
            handles.extend(listener.start(self.shutdown_rx.clone()));
        }
        handles.extend(self.bus.start(self.shutdown_rx.clone()).await);

        info!(tasks = handles.len(), "Topology started");
        self.tasks.lock().extend(handles);
    }

    /// Signal shutdown and wait for every task to finish its current unit.
    pub async fn shutdown(&self) {
        if self.shutdown_tx.send(true).is_err() {
            warn!("Shutdown signal had no receivers");
        }
        let handles = std::mem::take(&mut *self.tasks.lock());
        let count = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Consumer task ended abnormally");
            }
        }
        info!(tasks = count, "Topology stopped");
    }

    #[must_use]
    pub fn status(&self) -> TopologyStatus {
        TopologyStatus {
            bus_endpoint: self.bus.endpoint().clone(),
            load_balancer: self.load_balancer.as_ref().map(|lb| lb.status()),
            held_signals: self.ready_for_work.as_ref().map(|l| l.held_signals()),
            security: self.security,
            running_tasks: self.tasks.lock().iter().filter(|h| !h.is_finished()).count(),
        }
    }
}
