//! Provisioning workflow
//!
//! One workflow instance takes one [`ProvisionRequest`] through four steps:
//! resolve the template, derive disk and NIC names from it, submit the
//! creation request, start the VM. The first failing step ends the
//! instance; nothing is rolled back.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::WorkflowConfig;
use crate::domain::outcome::{
    TemplateResource, WorkflowError, WorkflowFailure, WorkflowOutcome, WorkflowStage,
};
use crate::domain::remote::{
    CpuTopology, DiskAttachmentSpec, ManagementApi, NicSpec, RemoteError, Template, VmDescriptor,
    VmId,
};
use crate::domain::request::ProvisionRequest;

/// Disk and NIC names copied from the template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDefaults {
    /// Name given to the new disk attachment
    pub disk_name: String,
    /// Name given to the new NIC
    pub nic_name: String,
}

/// Progress of a single workflow instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    /// Nothing done yet
    Pending,
    /// Template found
    TemplateResolved(Template),
    /// Disk and NIC names known
    DefaultsDerived(TemplateDefaults),
    /// VM exists on the platform, not started
    Created(VmId),
    /// VM started
    Running(VmId),
}

impl WorkflowState {
    /// VM that already exists on the platform in this state
    fn created_vm(&self) -> Option<&VmId> {
        match self {
            WorkflowState::Created(vm_id) | WorkflowState::Running(vm_id) => Some(vm_id),
            _ => None,
        }
    }
}

/// Executes the provisioning steps for one request at a time
///
/// Holds no per-request state, so a single instance is shared by every
/// task of a batch.
#[derive(Clone)]
pub struct ProvisioningWorkflow {
    remote: Arc<dyn ManagementApi>,
    config: Arc<WorkflowConfig>,
}

impl ProvisioningWorkflow {
    /// Create a workflow bound to a management platform handle
    pub fn new(remote: Arc<dyn ManagementApi>, config: Arc<WorkflowConfig>) -> Self {
        Self { remote, config }
    }

    /// Run all four steps for `request` and report how far it got
    pub async fn execute(&self, request: ProvisionRequest) -> WorkflowOutcome {
        let mut state = WorkflowState::Pending;

        loop {
            let created_vm = state.created_vm().cloned();
            let (stage, step) = match state {
                WorkflowState::Running(vm_id) => {
                    return WorkflowOutcome::Success {
                        request_name: request.name,
                        vm_id,
                    };
                }
                WorkflowState::Pending => (
                    WorkflowStage::ResolveTemplate,
                    self.resolve_template(&request.template)
                        .await
                        .map(WorkflowState::TemplateResolved),
                ),
                WorkflowState::TemplateResolved(template) => (
                    WorkflowStage::DeriveDefaults,
                    derive_defaults(&template).map(WorkflowState::DefaultsDerived),
                ),
                WorkflowState::DefaultsDerived(defaults) => (
                    WorkflowStage::CreateVm,
                    self.create(&request, &defaults).await,
                ),
                WorkflowState::Created(vm_id) => {
                    (WorkflowStage::StartVm, self.start(&request, vm_id).await)
                }
            };

            match step {
                Ok(next) => {
                    debug!(vm = %request.name, %stage, "Workflow stage completed");
                    state = next;
                }
                Err(cause) => {
                    warn!(vm = %request.name, %stage, error = %cause, "Workflow stage failed");
                    return WorkflowOutcome::Failure(WorkflowFailure {
                        request_name: request.name,
                        stage,
                        cause,
                        created_vm,
                    });
                }
            }
        }
    }

    async fn create(
        &self,
        request: &ProvisionRequest,
        defaults: &TemplateDefaults,
    ) -> Result<WorkflowState, WorkflowError> {
        let descriptor = build_descriptor(request, defaults, &self.config);
        let vm_id = self
            .bounded(self.remote.create_vm(&descriptor))
            .await?
            .map_err(WorkflowError::CreateFailed)?;
        info!(vm = %request.name, vm_id = %vm_id, "VM created");
        Ok(WorkflowState::Created(vm_id))
    }

    async fn start(
        &self,
        request: &ProvisionRequest,
        vm_id: VmId,
    ) -> Result<WorkflowState, WorkflowError> {
        if let Err(source) = self.bounded(self.remote.start_vm(&vm_id)).await? {
            return Err(WorkflowError::StartFailed { vm_id, source });
        }
        info!(vm = %request.name, vm_id = %vm_id, "VM started");
        Ok(WorkflowState::Running(vm_id))
    }

    /// First template returned for `name`; no further disambiguation
    async fn resolve_template(&self, name: &str) -> Result<Template, WorkflowError> {
        let templates = self
            .bounded(self.remote.list_templates_by_name(name))
            .await?
            .map_err(|source| WorkflowError::LookupFailed {
                template: name.to_string(),
                source,
            })?;

        if templates.len() > 1 {
            debug!(
                template = %name,
                matches = templates.len(),
                "Template name is ambiguous, using first match"
            );
        }

        templates
            .into_iter()
            .next()
            .ok_or_else(|| WorkflowError::NotFound {
                template: name.to_string(),
            })
    }

    /// Apply the configured per-call timeout to a remote call
    async fn bounded<T, F>(&self, call: F) -> Result<Result<T, RemoteError>, WorkflowError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        match self.config.remote_call_timeout() {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| WorkflowError::TimedOut(limit)),
            None => Ok(call.await),
        }
    }
}

/// Read the names the new VM's disk and NIC inherit from the template
pub fn derive_defaults(template: &Template) -> Result<TemplateDefaults, WorkflowError> {
    let missing = |resource| WorkflowError::MissingResource {
        template: template.name.clone(),
        resource,
    };

    let disk_name = template
        .first_disk_name()
        .ok_or_else(|| missing(TemplateResource::Disk))?;
    let nic_name = template
        .first_nic_name()
        .ok_or_else(|| missing(TemplateResource::Nic))?;

    Ok(TemplateDefaults {
        disk_name: disk_name.to_string(),
        nic_name: nic_name.to_string(),
    })
}

/// Assemble the creation request for one VM
pub fn build_descriptor(
    request: &ProvisionRequest,
    defaults: &TemplateDefaults,
    config: &WorkflowConfig,
) -> VmDescriptor {
    VmDescriptor {
        name: request.name.clone(),
        class: request.class.clone(),
        cluster: request.cluster.clone(),
        template: request.template.clone(),
        cpu: CpuTopology {
            cores: request.cpu_cores,
            sockets: request.cpu_sockets,
        },
        memory_bytes: request.memory_bytes,
        memory_guaranteed_bytes: request.memory_guaranteed_bytes,
        disk: DiskAttachmentSpec {
            name: defaults.disk_name.clone(),
            size_bytes: request.disk_size_bytes,
            storage_domain: config.storage_domain.clone(),
            interface: config.disk_interface,
            format: config.disk_format,
            sparse: config.sparse,
        },
        nic: NicSpec {
            name: defaults.nic_name.clone(),
            interface: config.nic_interface,
            network_profile: config.network_profile.clone(),
        },
        custom_script: network_config_script(request),
    }
}

/// cloud-init document configuring the guest's static network
pub fn network_config_script(request: &ProvisionRequest) -> String {
    let network = &request.network;
    format!(
        "#cloud-config\n\
         networking:\n  \
           version: 1\n  \
           config:\n  \
           - type: physical\n    \
             name: {nic}\n    \
             subnets:\n    \
             - type: static\n      \
               address: {ip}\n      \
               netmask: {mask}\n      \
               gateway: {gateway}\n  \
           dns_nameservers:\n  \
           - {dns0}\n  \
           - {dns1}\n  \
           - {dns2}\n",
        nic = network.nic,
        ip = network.ip,
        mask = network.mask,
        gateway = network.gateway,
        dns0 = network.dns[0],
        dns1 = network.dns[1],
        dns2 = network.dns[2],
    )
}
