//! The concrete composition root.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use qb_01_configuration::{
    BusConfiguration, ConfigError, LoadBalancerConfiguration, LoadBalancerRole,
};
use qb_02_load_balancer::{LoadBalancer, ReadyForWorkListener};
use shared_bus::{JsonMessageSerializer, MessageSerializer, SubscriptionStorage, Transport};
use shared_crypto::{
    AesEncryptionService, EncryptionService, SecretKey, SecurityMode, WireSecurity,
};
use shared_types::Endpoint;
use tracing::{debug, info};

use crate::bus::{
    BusDependencies, ConsumerList, DefaultServiceBus, EndpointRouter, MessageReflection,
};
use crate::container::{BusContainerBuilder, Singleton};
use crate::deployment::{CreateQueues, DeploymentAction};
use crate::error::CompositionError;
use crate::modules::{LoadBalancerMessageModule, MessageLoggingModule, ModuleList};
use crate::registry::{Capability, ComponentInstance, ExtensionRegistry, ServiceLocator};

/// Builds every role of one bus process.
///
/// Host collaborators (transport, subscription storage) are handed in up
/// front; everything else is created by the `register_*` operations.
pub struct BusBuilder {
    config: BusConfiguration,
    transport: Arc<dyn Transport>,
    subscriptions: Arc<dyn SubscriptionStorage>,
    extensions: ExtensionRegistry,

    defaults_registered: AtomicBool,
    locator: Singleton<ServiceLocator>,
    reflection: Singleton<MessageReflection>,
    serializer: Singleton<JsonMessageSerializer>,
    router: Singleton<EndpointRouter>,

    bus: Singleton<DefaultServiceBus>,
    load_balancer: Singleton<LoadBalancer>,
    ready_for_work: Singleton<ReadyForWorkListener>,
    load_balancer_module: Singleton<LoadBalancerMessageModule>,
    logging_module: Singleton<MessageLoggingModule>,
    encryption: Singleton<dyn EncryptionService>,

    modules: ModuleList,
    consumers: ConsumerList,
    deployment: Mutex<Vec<Arc<dyn DeploymentAction>>>,
}

impl BusBuilder {
    #[must_use]
    pub fn new(
        config: BusConfiguration,
        transport: Arc<dyn Transport>,
        subscriptions: Arc<dyn SubscriptionStorage>,
    ) -> Self {
        Self {
            config,
            transport,
            subscriptions,
            extensions: ExtensionRegistry::new(),
            defaults_registered: AtomicBool::new(false),
            locator: Singleton::new(),
            reflection: Singleton::new(),
            serializer: Singleton::new(),
            router: Singleton::new(),
            bus: Singleton::new(),
            load_balancer: Singleton::new(),
            ready_for_work: Singleton::new(),
            load_balancer_module: Singleton::new(),
            logging_module: Singleton::new(),
            encryption: Singleton::new(),
            modules: ModuleList::new(),
            consumers: ConsumerList::new(),
            deployment: Mutex::new(Vec::new()),
        }
    }

    /// Components and extensions composition may discover.
    #[must_use]
    pub fn with_extensions(mut self, extensions: ExtensionRegistry) -> Self {
        self.extensions = extensions;
        self
    }

    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// # Errors
    ///
    /// `MissingDependency` before default services are registered.
    pub fn locator(&self) -> Result<Arc<ServiceLocator>, CompositionError> {
        self.locator
            .get()
            .ok_or_else(|| CompositionError::missing("service locator"))
    }

    /// # Errors
    ///
    /// `MissingDependency` before default services are registered.
    pub fn serializer(&self) -> Result<Arc<JsonMessageSerializer>, CompositionError> {
        self.serializer
            .get()
            .ok_or_else(|| CompositionError::missing("message serializer"))
    }

    /// # Errors
    ///
    /// `MissingDependency` before default services are registered.
    pub fn router(&self) -> Result<Arc<EndpointRouter>, CompositionError> {
        self.router
            .get()
            .ok_or_else(|| CompositionError::missing("endpoint router"))
    }

    #[must_use]
    pub fn bus(&self) -> Option<Arc<DefaultServiceBus>> {
        self.bus.get()
    }

    #[must_use]
    pub fn load_balancer(&self) -> Option<Arc<LoadBalancer>> {
        self.load_balancer.get()
    }

    #[must_use]
    pub fn ready_for_work(&self) -> Option<Arc<ReadyForWorkListener>> {
        self.ready_for_work.get()
    }

    #[must_use]
    pub fn security_mode(&self) -> Option<SecurityMode> {
        self.serializer.get().and_then(|s| s.security_mode())
    }

    /// Deployment actions registered so far, in registration order.
    #[must_use]
    pub fn deployment_actions(&self) -> Vec<Arc<dyn DeploymentAction>> {
        self.deployment.lock().clone()
    }

    fn reflection(&self) -> Result<Arc<MessageReflection>, CompositionError> {
        self.reflection
            .get()
            .ok_or_else(|| CompositionError::missing("message reflection"))
    }

    fn add_deployment(&self, action: impl DeploymentAction + 'static) {
        self.deployment.lock().push(Arc::new(action));
    }

    fn register_load_balancer(
        &self,
        config: &LoadBalancerConfiguration,
        secondary: bool,
    ) -> Result<Arc<LoadBalancer>, CompositionError> {
        match (&config.role, secondary) {
            (LoadBalancerRole::Primary, true) => {
                return Err(ConfigError::MissingPrimaryEndpoint.into());
            }
            (LoadBalancerRole::Secondary { primary }, false) => {
                return Err(ConfigError::UnexpectedPrimaryEndpoint {
                    endpoint: primary.to_string(),
                }
                .into());
            }
            _ => {}
        }

        let balancer = self.load_balancer.get_or_try_init(|| {
            let serializer: Arc<dyn MessageSerializer> = self.serializer()?;
            let balancer = Arc::new(LoadBalancer::new(
                config.clone(),
                Arc::clone(&self.transport),
                serializer,
            ));
            self.add_deployment(CreateQueues::new("load-balancer", balancer.queues()));
            self.locator()?.provide(Arc::clone(&balancer));
            info!(endpoint = %config.endpoint, role = %config.role, "Load balancer registered");
            Ok::<_, CompositionError>(balancer)
        })?;

        if balancer.config().role.is_secondary() != secondary {
            return Err(CompositionError::ConflictingLoadBalancerRoles);
        }
        if let Some(listener) = self.ready_for_work.get() {
            balancer.attach_ready_for_work(&listener);
        }
        Ok(balancer)
    }
}

fn created<T: Default>() -> Result<Arc<T>, CompositionError> {
    Ok(Arc::new(T::default()))
}

impl BusContainerBuilder for BusBuilder {
    fn config(&self) -> &BusConfiguration {
        &self.config
    }

    fn register_default_services(&self, scan: &BTreeSet<String>) -> Result<(), CompositionError> {
        if self.defaults_registered.swap(true, Ordering::SeqCst) {
            debug!("Default services already registered");
            return Ok(());
        }

        let locator = self.locator.get_or_try_init(created)?;
        let reflection = self.reflection.get_or_try_init(created)?;
        let serializer = self.serializer.get_or_try_init(created)?;
        let router = self.router.get_or_try_init(created)?;

        locator.provide(Arc::clone(&self.transport));
        locator.provide(Arc::clone(&self.subscriptions));
        locator.provide(reflection);
        locator.provide(Arc::clone(&serializer));
        let as_trait: Arc<dyn MessageSerializer> = serializer;
        locator.provide(as_trait);
        locator.provide(router);

        let mut invoked = 0_usize;
        for extension in self.extensions.extensions_in(scan) {
            extension.configure(&self.config, self, &locator)?;
            invoked += 1;
        }
        info!(scanned = scan.len(), extensions = invoked, "Default services registered");
        Ok(())
    }

    fn register_bus(&self) -> Result<Arc<DefaultServiceBus>, CompositionError> {
        self.bus.get_or_try_init(|| {
            let serializer: Arc<dyn MessageSerializer> = self.serializer()?;
            let deps = BusDependencies {
                transport: Arc::clone(&self.transport),
                subscriptions: Arc::clone(&self.subscriptions),
                serializer,
                reflection: self.reflection()?,
                router: self.router()?,
                modules: self.modules.clone(),
                consumers: self.consumers.clone(),
            };
            let bus = Arc::new(DefaultServiceBus::new(&self.config, deps));
            self.add_deployment(CreateQueues::new("bus", bus.queues()));
            self.locator()?.provide(Arc::clone(&bus));
            info!(endpoint = %bus.endpoint(), "Service bus registered");
            Ok::<_, CompositionError>(bus)
        })
    }

    fn register_primary_load_balancer(
        &self,
        config: &LoadBalancerConfiguration,
    ) -> Result<Arc<LoadBalancer>, CompositionError> {
        self.register_load_balancer(config, false)
    }

    fn register_secondary_load_balancer(
        &self,
        config: &LoadBalancerConfiguration,
    ) -> Result<Arc<LoadBalancer>, CompositionError> {
        self.register_load_balancer(config, true)
    }

    fn register_ready_for_work(
        &self,
        config: &LoadBalancerConfiguration,
    ) -> Result<Arc<ReadyForWorkListener>, CompositionError> {
        let listener = self.ready_for_work.get_or_try_init(|| {
            let endpoint = config
                .ready_for_work_endpoint
                .clone()
                .ok_or_else(|| CompositionError::missing("ready-for-work endpoint"))?;
            let serializer: Arc<dyn MessageSerializer> = self.serializer()?;
            let listener = Arc::new(ReadyForWorkListener::new(
                endpoint,
                config.thread_count,
                config.transactional,
                Arc::clone(&self.transport),
                serializer,
            ));
            self.add_deployment(CreateQueues::new("ready-for-work", listener.queues()));
            self.locator()?.provide(Arc::clone(&listener));
            info!(endpoint = %listener.endpoint(), "Ready-for-work listener registered");
            Ok::<_, CompositionError>(listener)
        })?;

        if let Some(balancer) = self.load_balancer.get() {
            balancer.attach_ready_for_work(&listener);
        }
        Ok(listener)
    }

    fn register_load_balancer_endpoint(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Arc<LoadBalancerMessageModule>, CompositionError> {
        self.load_balancer_module.get_or_try_init(|| {
            let module =
                Arc::new(LoadBalancerMessageModule::new(endpoint.clone(), self.router()?));
            self.modules.push(module.clone());
            self.locator()?.provide(Arc::clone(&module));
            info!(%endpoint, "Load balancer message module registered");
            Ok::<_, CompositionError>(module)
        })
    }

    fn register_logging_endpoint(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Arc<MessageLoggingModule>, CompositionError> {
        self.logging_module.get_or_try_init(|| {
            let module = Arc::new(MessageLoggingModule::new(endpoint.clone(), self.router()?));
            self.modules.push(module.clone());
            self.add_deployment(CreateQueues::new("message-logging", vec![endpoint.clone()]));
            self.locator()?.provide(Arc::clone(&module));
            info!(%endpoint, "Message logging module registered");
            Ok::<_, CompositionError>(module)
        })
    }

    fn register_security(
        &self,
        key: &SecretKey,
    ) -> Result<Arc<dyn EncryptionService>, CompositionError> {
        let serializer = self.serializer()?;
        if serializer.security_mode() == Some(SecurityMode::Disabled) {
            return Err(CompositionError::ConflictingSecurity {
                existing: "disabled",
            });
        }

        let service = self.encryption.get_or_try_init(|| {
            let service: Arc<dyn EncryptionService> =
                Arc::new(AesEncryptionService::with_key(key.clone()));
            Ok::<_, CompositionError>(service)
        })?;
        if serializer.install_security(WireSecurity::enabled(Arc::clone(&service))) {
            self.locator()?.provide(Arc::clone(&service));
            info!("Wire security enabled");
        }
        Ok(service)
    }

    fn register_no_security(&self) -> Result<(), CompositionError> {
        let serializer = self.serializer()?;
        if self.encryption.is_set() || serializer.security_mode() == Some(SecurityMode::Enabled) {
            return Err(CompositionError::ConflictingSecurity {
                existing: "enabled",
            });
        }
        if serializer.install_security(WireSecurity::disabled()) {
            info!("Wire security disabled; encrypted content fails closed");
        }
        Ok(())
    }

    fn register_all(
        &self,
        capability: Capability,
        excludes: &[&str],
    ) -> Result<Vec<String>, CompositionError> {
        let locator = self.locator()?;
        let mut registered = Vec::new();

        for component in self.extensions.implementers(capability) {
            if excludes.contains(&component.name.as_str()) {
                debug!(component = %component.name, "Excluded from registration");
                continue;
            }
            if locator.contains_named(&component.name) {
                continue;
            }

            let instance = component.instantiate(&locator)?;
            match &instance {
                ComponentInstance::Module(module) => self.modules.push(Arc::clone(module)),
                ComponentInstance::Consumer(consumer) => self.consumers.push(Arc::clone(consumer)),
                ComponentInstance::Deployment(action) => {
                    self.deployment.lock().push(Arc::clone(action));
                }
            }
            locator.provide_named(&component.name, instance);
            registered.push(component.name.clone());
        }

        info!(%capability, registered = registered.len(), "Components registered");
        Ok(registered)
    }
}
