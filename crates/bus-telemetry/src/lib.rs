//! # Bus Telemetry
//!
//! Logging and metrics for the queue bus.
//!
//! - **Logs:** `tracing` facade, `tracing-subscriber` fmt output (pretty or JSON)
//! - **Metrics:** Prometheus counters and gauges in a private registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bus_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let metrics = init_telemetry(&TelemetryConfig::from_env())?;
//! // ... run the bus ...
//! println!("{}", metrics.gather()?);
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `QB_SERVICE_NAME` | `queue-bus` | Service name attached to startup logs |
//! | `QB_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `QB_JSON_LOGS` | `false` (`true` in containers) | JSON formatted logs |

mod config;
mod logging;
pub mod metrics;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::init_logging;
pub use metrics::{
    register_metrics, MetricsHandle, BACKLOG_DEPTH, MESSAGES_CONSUMED, MESSAGES_SENT,
    READY_SIGNALS, SECURITY_REJECTIONS, WORK_DISPATCHED, WORK_HELD,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install log subscriber: {0}")]
    LoggerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Register metrics, then install the log subscriber.
///
/// # Errors
///
/// Fails if a subscriber is already installed or the filter is invalid.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<MetricsHandle, TelemetryError> {
    let metrics = register_metrics()?;
    init_logging(config)?;
    Ok(metrics)
}
