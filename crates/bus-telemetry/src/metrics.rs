//! Prometheus metrics for the queue bus.
//!
//! All metrics follow the naming convention: `qb_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Metrics registry owned by the bus
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // LOAD BALANCER
    // =========================================================================

    /// Work units handed to a worker
    pub static ref WORK_DISPATCHED: IntCounter = IntCounter::new(
        "qb_work_dispatched_total",
        "Work units dispatched to a worker with free capacity"
    ).expect("metric creation failed");

    /// Work units that found no free worker and were held
    pub static ref WORK_HELD: IntCounter = IntCounter::new(
        "qb_work_held_total",
        "Work units held in the backlog because no worker had capacity"
    ).expect("metric creation failed");

    /// Readiness signals applied
    pub static ref READY_SIGNALS: IntCounter = IntCounter::new(
        "qb_ready_signals_total",
        "Ready-for-work signals applied to a balancer"
    ).expect("metric creation failed");

    /// Current held work across balancers in this process
    pub static ref BACKLOG_DEPTH: IntGauge = IntGauge::new(
        "qb_backlog_depth",
        "Work units currently held awaiting a ready worker"
    ).expect("metric creation failed");

    // =========================================================================
    // BUS
    // =========================================================================

    /// Encrypted content refused because security is disabled
    pub static ref SECURITY_REJECTIONS: IntCounter = IntCounter::new(
        "qb_security_rejections_total",
        "Messages refused because wire encryption is not negotiated"
    ).expect("metric creation failed");

    pub static ref MESSAGES_SENT: IntCounter = IntCounter::new(
        "qb_messages_sent_total",
        "Messages sent by the service bus"
    ).expect("metric creation failed");

    pub static ref MESSAGES_CONSUMED: IntCounter = IntCounter::new(
        "qb_messages_consumed_total",
        "Messages consumed successfully by the service bus"
    ).expect("metric creation failed");
}

/// Handle to the registered metrics.
#[derive(Clone)]
pub struct MetricsHandle {
    registry: Registry,
}

impl MetricsHandle {
    /// Encode all metrics as Prometheus text format.
    ///
    /// # Errors
    ///
    /// `MetricsInit` if encoding fails.
    pub fn gather(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}

/// Register all metrics with the bus registry.
///
/// Safe to call more than once; metrics already registered are kept.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(WORK_DISPATCHED.clone()),
        Box::new(WORK_HELD.clone()),
        Box::new(READY_SIGNALS.clone()),
        Box::new(BACKLOG_DEPTH.clone()),
        Box::new(SECURITY_REJECTIONS.clone()),
        Box::new(MESSAGES_SENT.clone()),
        Box::new(MESSAGES_CONSUMED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: REGISTRY.clone(),
    })
}
