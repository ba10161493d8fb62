//! JSON representations exchanged with the engine
//!
//! The engine wraps collections in an object keyed by the singular element
//! name (`{"template": [...]}`) and omits empty collections entirely, so
//! every collection field defaults to empty.

use serde::{Deserialize, Serialize};
use vmbatch_core::{Template, VmDescriptor};

/// Reference to an entity by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRef {
    /// Entity name
    pub name: String,
}

impl NameRef {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// Answer of `GET /templates`
#[derive(Debug, Default, Deserialize)]
pub struct TemplateList {
    /// Matching templates
    #[serde(default)]
    pub template: Vec<TemplateRepr>,
}

/// A template with its followed disk attachments and NICs
#[derive(Debug, Deserialize)]
pub struct TemplateRepr {
    /// Template id
    pub id: String,
    /// Template name
    pub name: String,
    /// Disk attachments, present when followed
    #[serde(default)]
    pub disk_attachments: DiskAttachmentList,
    /// NICs, present when followed
    #[serde(default)]
    pub nics: NicList,
}

/// Wrapped disk attachments
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DiskAttachmentList {
    /// Attachments
    #[serde(default)]
    pub disk_attachment: Vec<DiskAttachmentRepr>,
}

/// One disk attachment
#[derive(Debug, Serialize, Deserialize)]
pub struct DiskAttachmentRepr {
    /// Bus the disk is attached to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    /// The disk itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskRepr>,
}

/// A disk
#[derive(Debug, Serialize, Deserialize)]
pub struct DiskRepr {
    /// Disk name
    #[serde(default)]
    pub name: Option<String>,
    /// Size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioned_size: Option<u64>,
    /// `cow` or `raw`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Thin provisioning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse: Option<bool>,
    /// Storage domains holding the disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_domains: Option<StorageDomainList>,
}

/// Wrapped storage domains
#[derive(Debug, Serialize, Deserialize)]
pub struct StorageDomainList {
    /// Domains
    #[serde(default)]
    pub storage_domain: Vec<NameRef>,
}

/// Wrapped NICs
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NicList {
    /// NICs
    #[serde(default)]
    pub nic: Vec<NicRepr>,
}

/// A network interface
#[derive(Debug, Serialize, Deserialize)]
pub struct NicRepr {
    /// NIC name
    pub name: String,
    /// NIC model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    /// vNIC profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnic_profile: Option<NameRef>,
}

impl From<TemplateRepr> for Template {
    fn from(repr: TemplateRepr) -> Self {
        Template {
            id: repr.id,
            name: repr.name,
            disk_names: repr
                .disk_attachments
                .disk_attachment
                .into_iter()
                .filter_map(|attachment| attachment.disk.and_then(|disk| disk.name))
                .collect(),
            nic_names: repr.nics.nic.into_iter().map(|nic| nic.name).collect(),
        }
    }
}

/// Body of `POST /vms`
#[derive(Debug, Serialize)]
pub struct VmRepr {
    /// VM name
    pub name: String,
    /// Free-form description, carries the VM class
    pub description: String,
    /// Target cluster
    pub cluster: NameRef,
    /// Source template
    pub template: NameRef,
    /// CPU layout
    pub cpu: CpuRepr,
    /// Memory in bytes
    pub memory: u64,
    /// Memory policy
    pub memory_policy: MemoryPolicyRepr,
    /// First-boot customization
    pub initialization: InitializationRepr,
    /// Disks to attach
    pub disk_attachments: DiskAttachmentList,
    /// NICs to add
    pub nics: NicList,
}

/// CPU section
#[derive(Debug, Serialize)]
pub struct CpuRepr {
    /// Cores and sockets
    pub topology: TopologyRepr,
}

/// CPU topology
#[derive(Debug, Serialize)]
pub struct TopologyRepr {
    /// Cores per socket
    pub cores: u32,
    /// Sockets
    pub sockets: u32,
}

/// Memory policy
#[derive(Debug, Serialize)]
pub struct MemoryPolicyRepr {
    /// Guaranteed memory in bytes
    pub guaranteed: u64,
}

/// cloud-init section
#[derive(Debug, Serialize)]
pub struct InitializationRepr {
    /// Raw cloud-config document
    pub custom_script: String,
}

impl From<&VmDescriptor> for VmRepr {
    fn from(descriptor: &VmDescriptor) -> Self {
        let disk = &descriptor.disk;
        let nic = &descriptor.nic;

        VmRepr {
            name: descriptor.name.clone(),
            description: descriptor.class.clone(),
            cluster: NameRef::new(&descriptor.cluster),
            template: NameRef::new(&descriptor.template),
            cpu: CpuRepr {
                topology: TopologyRepr {
                    cores: descriptor.cpu.cores,
                    sockets: descriptor.cpu.sockets,
                },
            },
            memory: descriptor.memory_bytes,
            memory_policy: MemoryPolicyRepr {
                guaranteed: descriptor.memory_guaranteed_bytes,
            },
            initialization: InitializationRepr {
                custom_script: descriptor.custom_script.clone(),
            },
            disk_attachments: DiskAttachmentList {
                disk_attachment: vec![DiskAttachmentRepr {
                    interface: Some(disk.interface.as_str().to_string()),
                    disk: Some(DiskRepr {
                        name: Some(disk.name.clone()),
                        provisioned_size: Some(disk.size_bytes),
                        format: Some(disk.format.as_str().to_string()),
                        sparse: Some(disk.sparse),
                        storage_domains: Some(StorageDomainList {
                            storage_domain: vec![NameRef::new(&disk.storage_domain)],
                        }),
                    }),
                }],
            },
            nics: NicList {
                nic: vec![NicRepr {
                    name: nic.name.clone(),
                    interface: Some(nic.interface.as_str().to_string()),
                    vnic_profile: Some(NameRef::new(&nic.network_profile)),
                }],
            },
        }
    }
}

/// Answer of `POST /vms`; only the id is used
#[derive(Debug, Deserialize)]
pub struct CreatedVm {
    /// Id assigned by the engine
    pub id: String,
}

/// Body of an action such as `POST /vms/{id}/start`
#[derive(Debug, Default, Serialize)]
pub struct Action {}

/// Error document returned with non-2xx statuses
#[derive(Debug, Default, Deserialize)]
pub struct Fault {
    /// Short reason
    #[serde(default)]
    pub reason: Option<String>,
    /// Details, usually the engine's validation message
    #[serde(default)]
    pub detail: Option<String>,
}

impl Fault {
    /// Combine reason and detail into one message
    pub fn message(&self) -> Option<String> {
        match (&self.reason, &self.detail) {
            (Some(reason), Some(detail)) => Some(format!("{}: {}", reason, detail)),
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            (None, None) => None,
        }
    }
}

/// Answer of the SSO token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// Bearer token, absent on failure
    #[serde(default)]
    pub access_token: Option<String>,
    /// SSO error code
    #[serde(default)]
    pub error: Option<String>,
    /// SSO error description
    #[serde(default)]
    pub error_description: Option<String>,
}
