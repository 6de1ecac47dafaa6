//! Host-supplied list of components and configuration-aware extensions.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use qb_01_configuration::BusConfiguration;

use crate::bus::MessageConsumer;
use crate::container::BusContainerBuilder;
use crate::deployment::DeploymentAction;
use crate::error::CompositionError;
use crate::modules::MessageModule;
use crate::registry::ServiceLocator;

/// Role a component plays once registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    MessageModule,
    MessageConsumer,
    DeploymentAction,
}

impl Capability {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageModule => "message module",
            Self::MessageConsumer => "message consumer",
            Self::DeploymentAction => "deployment action",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a component factory produced.
#[derive(Clone)]
pub enum ComponentInstance {
    Module(Arc<dyn MessageModule>),
    Consumer(Arc<dyn MessageConsumer>),
    Deployment(Arc<dyn DeploymentAction>),
}

impl ComponentInstance {
    #[must_use]
    pub fn capability(&self) -> Capability {
        match self {
            Self::Module(_) => Capability::MessageModule,
            Self::Consumer(_) => Capability::MessageConsumer,
            Self::Deployment(_) => Capability::DeploymentAction,
        }
    }
}

pub type ComponentFactory =
    Arc<dyn Fn(&ServiceLocator) -> Result<ComponentInstance, CompositionError> + Send + Sync>;

/// A capability implementer the host knows about.
#[derive(Clone)]
pub struct Component {
    pub name: String,
    /// Module the component ships in.
    pub module: String,
    pub capability: Capability,
    pub factory: ComponentFactory,
}

impl Component {
    pub fn new(
        name: impl Into<String>,
        module: impl Into<String>,
        capability: Capability,
        factory: impl Fn(&ServiceLocator) -> Result<ComponentInstance, CompositionError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            capability,
            factory: Arc::new(factory),
        }
    }

    /// Run the factory and check the result matches the declared capability.
    pub(crate) fn instantiate(
        &self,
        locator: &ServiceLocator,
    ) -> Result<ComponentInstance, CompositionError> {
        let instance = (self.factory)(locator)?;
        if instance.capability() != self.capability {
            return Err(CompositionError::CapabilityMismatch {
                name: self.name.clone(),
                expected: self.capability.name(),
            });
        }
        Ok(instance)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

/// Extension invoked while default services are registered.
///
/// Receives the validated configuration, the builder itself and the locator,
/// so it can register further roles or provide services.
pub trait BusConfigurationAware: Send + Sync {
    fn configure(
        &self,
        config: &BusConfiguration,
        builder: &dyn BusContainerBuilder,
        locator: &ServiceLocator,
    ) -> Result<(), CompositionError>;
}

/// Explicit list of everything composition may discover.
#[derive(Default, Clone)]
pub struct ExtensionRegistry {
    components: Vec<Component>,
    extensions: Vec<(String, Arc<dyn BusConfigurationAware>)>,
}

impl ExtensionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    #[must_use]
    pub fn with_extension(
        mut self,
        module: impl Into<String>,
        extension: Arc<dyn BusConfigurationAware>,
    ) -> Self {
        self.extensions.push((module.into(), extension));
        self
    }

    /// Components declaring `capability`, in registration order.
    pub fn implementers(&self, capability: Capability) -> impl Iterator<Item = &Component> {
        self.components
            .iter()
            .filter(move |component| component.capability == capability)
    }

    /// Extensions shipped in one of the `modules`, in registration order.
    pub fn extensions_in<'a>(
        &'a self,
        modules: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = &'a Arc<dyn BusConfigurationAware>> + 'a {
        self.extensions
            .iter()
            .filter(|(module, _)| modules.contains(module))
            .map(|(_, extension)| extension)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len() + self.extensions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use shared_types::Endpoint;

    use super::*;
    use crate::deployment::CreateQueues;

    struct NoopExtension;

    impl BusConfigurationAware for NoopExtension {
        fn configure(
            &self,
            _config: &BusConfiguration,
            _builder: &dyn BusContainerBuilder,
            _locator: &ServiceLocator,
        ) -> Result<(), CompositionError> {
            Ok(())
        }
    }

    fn queues_component(name: &str) -> Component {
        Component::new(name, "ops", Capability::DeploymentAction, |_| {
            let queue = Endpoint::parse("memory://localhost/audit").unwrap();
            Ok(ComponentInstance::Deployment(Arc::new(CreateQueues::new(
                "audit",
                vec![queue],
            ))))
        })
    }

    #[test]
    fn test_implementers_filtered_by_capability() {
        let registry = ExtensionRegistry::new()
            .with_component(queues_component("audit-queues"))
            .with_component(queues_component("other-queues"));

        let names: Vec<_> = registry
            .implementers(Capability::DeploymentAction)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["audit-queues", "other-queues"]);
        assert_eq!(registry.implementers(Capability::MessageModule).count(), 0);
    }

    #[test]
    fn test_extensions_filtered_by_scan_set() {
        let registry = ExtensionRegistry::new()
            .with_extension("scanned", Arc::new(NoopExtension))
            .with_extension("ignored", Arc::new(NoopExtension));
        let scan: BTreeSet<String> = ["scanned".to_string()].into_iter().collect();

        assert_eq!(registry.extensions_in(&scan).count(), 1);
    }

    #[test]
    fn test_capability_mismatch_rejected() {
        let mut component = queues_component("audit-queues");
        component.capability = Capability::MessageModule;

        let err = component.instantiate(&ServiceLocator::new()).err().unwrap();
        assert!(matches!(err, CompositionError::CapabilityMismatch { .. }));
    }
}
