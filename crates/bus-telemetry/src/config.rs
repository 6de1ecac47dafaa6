//! Telemetry settings read from the process environment.

use std::env;
use std::fmt;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, ANSI coloured.
    Pretty,
    /// One JSON object per event, for log shippers.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

/// Logging settings of one bus host.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Name stamped on the startup log line; distinguishes hosts sharing a
    /// log sink.
    pub service_name: String,

    /// An `EnvFilter` directive, e.g. `info` or `qb_02_load_balancer=debug`.
    pub log_level: String,

    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "queue-bus".to_string(),
            log_level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl TelemetryConfig {
    /// Read from the environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `QB_SERVICE_NAME` | `queue-bus` |
    /// | `QB_LOG_LEVEL`, then `RUST_LOG` | `info` |
    /// | `QB_JSON_LOGS` (`true`/`1`) | JSON inside containers, pretty otherwise |
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`TelemetryConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let in_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();
        let json = lookup("QB_JSON_LOGS")
            .map_or(in_container, |v| v.eq_ignore_ascii_case("true") || v == "1");

        Self {
            service_name: lookup("QB_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: lookup("QB_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            format: if json { LogFormat::Json } else { LogFormat::Pretty },
        }
    }

    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}
