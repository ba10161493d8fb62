//! Boundary to the virtualization management platform
//!
//! The workflow only ever talks to [`ManagementApi`]. The real
//! implementation lives in `vmbatch-ovirt`; tests plug in fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::{DiskFormat, DiskInterface, NicInterface};

/// Errors reported by the management platform client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Session could not be established
    #[error("connection failed: {0}")]
    Connection(String),

    /// Request never got a response
    #[error("transport error: {0}")]
    Transport(String),

    /// The platform answered with an error status
    #[error("request rejected with status {status}: {reason}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Reason reported by the platform
        reason: String,
    },

    /// The platform answered with something we could not interpret
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The connection was already closed
    #[error("connection is closed")]
    Closed,
}

/// Identifier assigned to a VM by the platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VmId(pub String);

impl VmId {
    /// Get the string representation of the id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A template as returned by a template listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Platform id
    pub id: String,
    /// Template name
    pub name: String,
    /// Names of the template's disks, in platform order
    pub disk_names: Vec<String>,
    /// Names of the template's NICs, in platform order
    pub nic_names: Vec<String>,
}

impl Template {
    /// Name of the first disk, if the template has any
    pub fn first_disk_name(&self) -> Option<&str> {
        self.disk_names.first().map(String::as_str)
    }

    /// Name of the first NIC, if the template has any
    pub fn first_nic_name(&self) -> Option<&str> {
        self.nic_names.first().map(String::as_str)
    }
}

/// CPU layout of the new VM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuTopology {
    /// Cores per socket
    pub cores: u32,
    /// Sockets
    pub sockets: u32,
}

/// The single disk attached to the new VM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskAttachmentSpec {
    /// Disk name, taken from the template
    pub name: String,
    /// Provisioned size in bytes
    pub size_bytes: u64,
    /// Storage domain the disk lives on
    pub storage_domain: String,
    /// Attachment bus
    pub interface: DiskInterface,
    /// Image format
    pub format: DiskFormat,
    /// Thin provisioning
    pub sparse: bool,
}

/// The single NIC of the new VM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicSpec {
    /// NIC name, taken from the template
    pub name: String,
    /// NIC model
    pub interface: NicInterface,
    /// vNIC profile
    pub network_profile: String,
}

/// Everything submitted to the platform to create one VM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmDescriptor {
    /// VM name
    pub name: String,
    /// VM class, sent as the VM description
    pub class: String,
    /// Cluster name
    pub cluster: String,
    /// Template name
    pub template: String,
    /// CPU layout
    pub cpu: CpuTopology,
    /// Memory in bytes
    pub memory_bytes: u64,
    /// Guaranteed memory in bytes
    pub memory_guaranteed_bytes: u64,
    /// Disk attachment
    pub disk: DiskAttachmentSpec,
    /// Network interface
    pub nic: NicSpec,
    /// cloud-init payload applied on first boot
    pub custom_script: String,
}

/// Operations the provisioning workflow needs from the management platform
///
/// One handle is shared by every workflow instance of a batch, so
/// implementations must tolerate concurrent calls.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// List templates whose name equals `name`, in the platform's order
    async fn list_templates_by_name(&self, name: &str) -> Result<Vec<Template>, RemoteError>;

    /// Create a VM and return its id
    async fn create_vm(&self, descriptor: &VmDescriptor) -> Result<VmId, RemoteError>;

    /// Power on a created VM
    async fn start_vm(&self, vm_id: &VmId) -> Result<(), RemoteError>;

    /// Release the session
    async fn close(&self) -> Result<(), RemoteError>;
}
