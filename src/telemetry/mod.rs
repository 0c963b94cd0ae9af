//! Telemetry module
//!
//! Logging and Prometheus metrics

mod counters;
mod logging;

pub use counters::{
    increment, init_metrics, set_gauge, CounterMetric, DiscardReason, GaugeMetric,
};
pub use logging::{init_logging, LogFormat};

use crate::config::TelemetryConfig;

/// Initialize all telemetry subsystems
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    init_logging(&config.log_level, config.log_format)?;

    if let Some(port) = config.metrics_port {
        init_metrics(port)?;
    }

    Ok(())
}
