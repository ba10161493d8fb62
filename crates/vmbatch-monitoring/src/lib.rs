//! Monitoring for vmbatch: subscriber setup and batch metrics.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;

pub mod logging;
pub mod metrics;

/// Default log filter
pub const DEFAULT_LOG_FILTER: &str = "info,vmbatch=debug";

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, one line per event
    #[default]
    Text,
    /// Human readable, multi-line with source locations
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "compact" => Ok(LogFormat::Text),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

/// Configuration for initializing the monitoring system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Log level filter (e.g., "info,vmbatch=debug"), overridden by `RUST_LOG`
    pub log_filter: String,
    /// Output format
    pub log_format: LogFormat,
    /// Log batch metrics when the batch completes
    pub enable_metrics: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "vmbatch".to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_format: LogFormat::Text,
            enable_metrics: true,
        }
    }
}

/// Initialize monitoring system
pub fn init(config: MonitoringConfig) -> anyhow::Result<()> {
    logging::init_logging(&config)?;

    info!(
        service_name = %config.service_name,
        metrics = config.enable_metrics,
        "Monitoring initialized"
    );
    Ok(())
}

/// Shutdown the monitoring system
pub fn shutdown() {
    info!("Shutting down monitoring system");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MonitoringConfig::default();
        assert_eq!(config.service_name, "vmbatch");
        assert_eq!(config.log_filter, "info,vmbatch=debug");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.enable_metrics);
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert!("xml".parse::<LogFormat>().is_err());
    }
}

// Exported types
pub use crate::metrics::BatchMetrics;
