//! Configuration domain model.

pub mod bus;
pub mod errors;
pub mod load_balancer;
pub mod security;

pub use bus::{BusConfiguration, DEFAULT_NUMBER_OF_RETRIES, DEFAULT_THREAD_COUNT};
pub use errors::ConfigError;
pub use load_balancer::{LoadBalancerConfiguration, LoadBalancerRole};
pub use security::SecuritySettings;
