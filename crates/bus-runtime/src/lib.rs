//! # Bus Runtime Library
//!
//! Composition root of the queue bus. The `bus-host` binary in `main.rs` is a
//! thin wrapper around [`compose`] and [`Topology`].
//!
//! ## Topology
//!
//! ```text
//!   producers ──work──► LoadBalancer (primary | secondary) ──work──► worker buses
//!                             ▲                                        │
//!                             │ ReadyForWork(capacity)                 │
//!                    ReadyForWorkListener ◄────────────────────────────┘
//!                                          LoadBalancerMessageModule
//! ```
//!
//! ## Modular Structure
//!
//! - `container/` - `BusBuilder`, `Singleton`, `compose`, `Topology`
//! - `registry/` - `ExtensionRegistry`, `ServiceLocator`
//! - `bus/` - `DefaultServiceBus`, `EndpointRouter`, `MessageReflection`
//! - `modules/` - load balancer and message logging modules
//! - `deployment` - queue creation before start

#![allow(clippy::module_name_repetitions)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod bus;
pub mod container;
pub mod deployment;
pub mod error;
pub mod modules;
pub mod registry;

pub use bus::{DefaultServiceBus, EndpointRouter, MessageConsumer, MessageReflection};
pub use container::{compose, BusBuilder, BusContainerBuilder, Singleton, Topology, TopologyStatus};
pub use deployment::{CreateQueues, DeploymentAction};
pub use error::{BusError, CompositionError};
pub use modules::{LoadBalancerMessageModule, MessageLoggingModule, MessageModule, ModuleContext};
pub use registry::{
    BusConfigurationAware, Capability, Component, ComponentInstance, ExtensionRegistry,
    ServiceLocator,
};
