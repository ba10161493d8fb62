//! Command line flags and their environment fallbacks

use clap::{ArgAction, Parser};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::warn;
use vmbatch_core::config::{DEFAULT_NETWORK_PROFILE, DEFAULT_STORAGE_DOMAIN};
use vmbatch_core::{BatchConfig, WorkflowConfig};
use vmbatch_monitoring::{LogFormat, MonitoringConfig, DEFAULT_LOG_FILTER};
use vmbatch_ovirt::{ConnectionConfig, DEFAULT_REQUEST_TIMEOUT_SECS};

use crate::error::{CliError, CliResult};

/// Placeholder credentials shipped as defaults
const PLACEHOLDER_USERNAME: &str = "your-username";
const PLACEHOLDER_PASSWORD: &str = "your-password";

/// Create and start oVirt VMs from a CSV file
#[derive(Debug, Clone, Parser)]
#[command(name = "vmbatch", version, about)]
pub struct Cli {
    /// Path to the CSV file with VM parameters
    #[arg(long, env = "VMBATCH_CSV", default_value = "vm_params.csv")]
    pub csv: PathBuf,

    /// oVirt engine API URL
    #[arg(
        long,
        env = "OVIRT_URL",
        default_value = "https://your.ovirt.engine/ovirt-engine/api"
    )]
    pub url: String,

    /// oVirt username
    #[arg(long, env = "OVIRT_USERNAME", default_value = PLACEHOLDER_USERNAME)]
    pub username: String,

    /// oVirt password
    #[arg(
        long,
        env = "OVIRT_PASSWORD",
        default_value = PLACEHOLDER_PASSWORD,
        hide_env_values = true
    )]
    pub password: String,

    /// Skip TLS certificate verification
    #[arg(long, env = "OVIRT_INSECURE", default_value_t = true, action = ArgAction::Set)]
    pub insecure: bool,

    /// Maximum number of VMs provisioned at the same time
    #[arg(long, env = "VMBATCH_CONCURRENCY", default_value = "5")]
    pub concurrency: NonZeroUsize,

    /// Storage domain for the new disks
    #[arg(long, env = "VMBATCH_STORAGE_DOMAIN", default_value = DEFAULT_STORAGE_DOMAIN)]
    pub storage_domain: String,

    /// vNIC profile for the new NICs
    #[arg(long, env = "VMBATCH_NETWORK_PROFILE", default_value = DEFAULT_NETWORK_PROFILE)]
    pub network_profile: String,

    /// Give up on a single engine call after this many seconds
    #[arg(long, env = "VMBATCH_REMOTE_TIMEOUT_SECS")]
    pub remote_timeout_secs: Option<u64>,

    /// HTTP timeout per engine request in seconds
    #[arg(long, env = "OVIRT_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, env = "LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,

    /// Log output format (text, pretty or json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,
}

impl Cli {
    /// Reject unusable settings and warn about risky ones
    pub fn validate(&self) -> CliResult<()> {
        if self.url.trim().is_empty() {
            return Err(CliError::ConfigurationError(
                "engine URL must not be empty".to_string(),
            ));
        }

        if self.remote_timeout_secs == Some(0) {
            return Err(CliError::ConfigurationError(
                "remote call timeout must be positive".to_string(),
            ));
        }

        if self.username == PLACEHOLDER_USERNAME || self.password == PLACEHOLDER_PASSWORD {
            warn!(
                "Using placeholder credentials, set --username/--password \
                 or OVIRT_USERNAME/OVIRT_PASSWORD"
            );
        }

        if self.insecure {
            warn!(url = %self.url, "TLS certificate verification is disabled");
        }

        Ok(())
    }

    /// Settings for the batch runner
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            concurrency_limit: self.concurrency.get(),
            workflow: WorkflowConfig {
                storage_domain: self.storage_domain.clone(),
                network_profile: self.network_profile.clone(),
                remote_call_timeout_secs: self.remote_timeout_secs,
                ..Default::default()
            },
        }
    }

    /// Settings for the engine session
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            insecure: self.insecure,
            request_timeout_secs: self.request_timeout_secs,
        }
    }

    /// Settings for logging
    pub fn monitoring_config(&self) -> MonitoringConfig {
        MonitoringConfig {
            service_name: "vmbatch".to_string(),
            log_filter: self.log_filter.clone(),
            log_format: self.log_format,
            enable_metrics: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("vmbatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_validate_rejects_empty_url() {
        let mut cli = parse(&["--url", "https://engine/ovirt-engine/api"]);
        assert!(cli.validate().is_ok());

        cli.url = "  ".to_string();
        assert!(matches!(cli.validate(), Err(CliError::ConfigurationError(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut cli = parse(&["--url", "https://engine/ovirt-engine/api"]);
        cli.remote_timeout_secs = Some(0);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_derived_configs() {
        let mut cli = parse(&["--url", "https://engine/ovirt-engine/api"]);
        cli.concurrency = NonZeroUsize::new(3).unwrap();
        cli.storage_domain = "fast_ssd".to_string();
        cli.remote_timeout_secs = Some(45);
        cli.insecure = false;

        let batch = cli.batch_config();
        assert_eq!(batch.concurrency_limit, 3);
        assert_eq!(batch.workflow.storage_domain, "fast_ssd");
        assert_eq!(batch.workflow.remote_call_timeout_secs, Some(45));
        assert!(batch.validate().is_ok());

        let connection = cli.connection_config();
        assert_eq!(connection.engine_url(), "https://engine/ovirt-engine");
        assert!(!connection.insecure);
    }
}
