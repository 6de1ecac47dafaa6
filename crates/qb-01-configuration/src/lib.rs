//! # Bus Configuration
//!
//! Typed, validated representation of the bus settings and the loader that
//! produces it from raw TOML.
//!
//! Loading and composing are separate phases: this crate only validates and
//! returns a [`BusConfiguration`]. Nothing is registered until the caller
//! hands that value to the composition root.
//!
//! ```text
//!   raw TOML ──→ TomlConfigLoader::parse() ──→ BusConfiguration ──→ compose()
//!                      │
//!                      └── ConfigError (fatal, nothing registered)
//! ```
//!
//! ## Module Structure
//!
//! - `domain/` - `BusConfiguration`, `LoadBalancerConfiguration`, `SecuritySettings`, `ConfigError`
//! - `ports/` - `ConfigurationSource` trait
//! - `adapters/` - `TomlConfigLoader`

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::TomlConfigLoader;
pub use domain::{
    BusConfiguration, ConfigError, LoadBalancerConfiguration, LoadBalancerRole, SecuritySettings,
    DEFAULT_NUMBER_OF_RETRIES, DEFAULT_THREAD_COUNT,
};
pub use ports::ConfigurationSource;
