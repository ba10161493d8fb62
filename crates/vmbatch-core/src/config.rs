//! Configuration for batch runs and the provisioning workflow
//!
//! Infrastructure names that the workflow stamps onto every VM live here
//! rather than in the workflow itself, so tests and deployments can
//! substitute them.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::error::CoreError;

/// Default number of workflow instances allowed to run at once
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default storage domain for new disks
pub const DEFAULT_STORAGE_DOMAIN: &str = "my_storage_domain";

/// Default vNIC profile for new NICs
pub const DEFAULT_NETWORK_PROFILE: &str = "my_network";

/// Bus a disk attachment is exposed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskInterface {
    /// virtio-blk
    Virtio,
    /// virtio-scsi
    VirtioScsi,
    /// IDE
    Ide,
    /// SATA
    Sata,
}

impl DiskInterface {
    /// Wire name understood by the management API
    pub fn as_str(self) -> &'static str {
        match self {
            DiskInterface::Virtio => "virtio",
            DiskInterface::VirtioScsi => "virtio_scsi",
            DiskInterface::Ide => "ide",
            DiskInterface::Sata => "sata",
        }
    }
}

/// Emulated NIC model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NicInterface {
    /// Paravirtualized virtio-net
    Virtio,
    /// Intel e1000
    E1000,
    /// Realtek rtl8139
    Rtl8139,
}

impl NicInterface {
    /// Wire name understood by the management API
    pub fn as_str(self) -> &'static str {
        match self {
            NicInterface::Virtio => "virtio",
            NicInterface::E1000 => "e1000",
            NicInterface::Rtl8139 => "rtl8139",
        }
    }
}

/// On-disk image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskFormat {
    /// Copy-on-write (qcow2)
    Cow,
    /// Raw
    Raw,
}

impl DiskFormat {
    /// Wire name understood by the management API
    pub fn as_str(self) -> &'static str {
        match self {
            DiskFormat::Cow => "cow",
            DiskFormat::Raw => "raw",
        }
    }
}

/// Settings applied by every workflow instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Storage domain the new disk is placed on
    #[serde(default = "default_storage_domain")]
    pub storage_domain: String,

    /// vNIC profile the new NIC is attached to
    #[serde(default = "default_network_profile")]
    pub network_profile: String,

    /// Disk attachment bus
    #[serde(default = "default_disk_interface")]
    pub disk_interface: DiskInterface,

    /// NIC model
    #[serde(default = "default_nic_interface")]
    pub nic_interface: NicInterface,

    /// Disk image format
    #[serde(default = "default_disk_format")]
    pub disk_format: DiskFormat,

    /// Thin-provision the disk
    #[serde(default = "default_sparse")]
    pub sparse: bool,

    /// Upper bound for each remote call in seconds (None means wait for the
    /// remote client's own timeout)
    #[serde(default)]
    pub remote_call_timeout_secs: Option<u64>,
}

fn default_storage_domain() -> String {
    DEFAULT_STORAGE_DOMAIN.to_string()
}

fn default_network_profile() -> String {
    DEFAULT_NETWORK_PROFILE.to_string()
}

fn default_disk_interface() -> DiskInterface {
    DiskInterface::Virtio
}

fn default_nic_interface() -> NicInterface {
    NicInterface::Virtio
}

fn default_disk_format() -> DiskFormat {
    DiskFormat::Cow
}

fn default_sparse() -> bool {
    true
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl WorkflowConfig {
    /// Per-call timeout, if one is configured
    pub fn remote_call_timeout(&self) -> Option<Duration> {
        self.remote_call_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            storage_domain: default_storage_domain(),
            network_profile: default_network_profile(),
            disk_interface: default_disk_interface(),
            nic_interface: default_nic_interface(),
            disk_format: default_disk_format(),
            sparse: default_sparse(),
            remote_call_timeout_secs: None,
        }
    }
}

/// Settings for one batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum number of workflow instances running at once
    #[serde(default = "default_concurrency")]
    pub concurrency_limit: usize,

    /// Settings handed to every workflow instance
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

impl BatchConfig {
    /// Reject settings a batch cannot run with
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.concurrency_limit == 0 {
            return Err(CoreError::ConfigurationError(
                "concurrency limit must be a positive integer".to_string(),
            ));
        }

        if self.concurrency_limit > Semaphore::MAX_PERMITS {
            return Err(CoreError::ConfigurationError(format!(
                "concurrency limit must not exceed {}",
                Semaphore::MAX_PERMITS
            )));
        }

        if self.workflow.storage_domain.trim().is_empty() {
            return Err(CoreError::ConfigurationError(
                "storage domain must not be empty".to_string(),
            ));
        }

        if self.workflow.network_profile.trim().is_empty() {
            return Err(CoreError::ConfigurationError(
                "network profile must not be empty".to_string(),
            ));
        }

        if self.workflow.remote_call_timeout_secs == Some(0) {
            return Err(CoreError::ConfigurationError(
                "remote call timeout must be at least one second".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency(),
            workflow: WorkflowConfig::default(),
        }
    }
}
