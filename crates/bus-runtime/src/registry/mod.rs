//! # Composition Registry
//!
//! Replaces runtime type scanning with an explicit, host-supplied list.
//!
//! ```text
//! ┌──────────────────────── ExtensionRegistry ───────────────────────┐
//! │                                                                  │
//! │  BusConfigurationAware (module)      Component (name, module,    │
//! │    invoked once by                     capability, factory)      │
//! │    register_default_services           instantiated once by      │
//! │    when module ∈ scan set              register_all(capability)  │
//! │            │                                    │                │
//! └────────────┼────────────────────────────────────┼────────────────┘
//!              ▼                                    ▼
//!      (config, builder, locator)         ServiceLocator (named)
//! ```
//!
//! The `ServiceLocator` holds typed singletons (transport, serializer,
//! router, ...) and the named components. Resolving anything that was never
//! provided fails with `MissingDependency` during composition.

pub mod extensions;
pub mod locator;

pub use extensions::{
    BusConfigurationAware, Capability, Component, ComponentFactory, ComponentInstance,
    ExtensionRegistry,
};
pub use locator::ServiceLocator;
