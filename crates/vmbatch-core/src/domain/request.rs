use serde::{Deserialize, Serialize};
use std::fmt;

/// Positional schema of one input record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordField {
    /// VM name
    Name,
    /// Template name
    Template,
    /// Cluster name
    Cluster,
    /// VM class
    Class,
    /// Guest NIC label used in the network configuration
    Nic,
    /// Static IP address
    Ip,
    /// Default gateway
    Gateway,
    /// Subnet mask
    Mask,
    /// Primary DNS server
    Dns,
    /// Secondary DNS server
    Dns1,
    /// Tertiary DNS server
    Dns2,
    /// CPU cores per socket
    CpuCores,
    /// CPU sockets
    CpuSockets,
    /// Memory in bytes
    Memory,
    /// Guaranteed memory in bytes
    MemoryGuaranteed,
    /// Disk size in bytes
    Size,
}

impl RecordField {
    /// Every field, in column order
    pub const ALL: [RecordField; 16] = [
        RecordField::Name,
        RecordField::Template,
        RecordField::Cluster,
        RecordField::Class,
        RecordField::Nic,
        RecordField::Ip,
        RecordField::Gateway,
        RecordField::Mask,
        RecordField::Dns,
        RecordField::Dns1,
        RecordField::Dns2,
        RecordField::CpuCores,
        RecordField::CpuSockets,
        RecordField::Memory,
        RecordField::MemoryGuaranteed,
        RecordField::Size,
    ];

    /// Number of fields a record must carry
    pub const COUNT: usize = Self::ALL.len();

    /// Zero-based column of the field
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name as used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            RecordField::Name => "name",
            RecordField::Template => "template",
            RecordField::Cluster => "cluster",
            RecordField::Class => "class",
            RecordField::Nic => "nic",
            RecordField::Ip => "ip",
            RecordField::Gateway => "gateway",
            RecordField::Mask => "mask",
            RecordField::Dns => "dns",
            RecordField::Dns1 => "dns1",
            RecordField::Dns2 => "dns2",
            RecordField::CpuCores => "cpuCores",
            RecordField::CpuSockets => "cpuSockets",
            RecordField::Memory => "memory",
            RecordField::MemoryGuaranteed => "memoryGuaranteed",
            RecordField::Size => "size",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Guest network settings rendered into the initialization script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Guest NIC label, e.g. `eth0`
    pub nic: String,
    /// Static IP address
    pub ip: String,
    /// Default gateway
    pub gateway: String,
    /// Subnet mask
    pub mask: String,
    /// DNS servers in priority order
    pub dns: [String; 3],
}

/// One validated record: everything needed to provision a single VM
///
/// Built once by the record parser and moved into the workflow instance
/// that provisions it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    /// VM name
    pub name: String,
    /// Name of the template to clone
    pub template: String,
    /// Cluster to place the VM in
    pub cluster: String,
    /// VM class
    pub class: String,
    /// Guest network settings
    pub network: NetworkSettings,
    /// CPU cores per socket
    pub cpu_cores: u32,
    /// CPU sockets
    pub cpu_sockets: u32,
    /// Memory in bytes
    pub memory_bytes: u64,
    /// Guaranteed memory in bytes
    pub memory_guaranteed_bytes: u64,
    /// Disk size in bytes
    pub disk_size_bytes: u64,
}
