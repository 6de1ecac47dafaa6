//! Configuration ports.

use crate::domain::{BusConfiguration, ConfigError};

/// Anything that can produce a validated [`BusConfiguration`].
///
/// The host picks a source; composition only ever sees the result.
pub trait ConfigurationSource {
    /// Produce the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the raw settings are missing or invalid.
    fn load(&self) -> Result<BusConfiguration, ConfigError>;
}
