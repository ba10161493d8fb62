use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::remote::{RemoteError, VmId};

/// Step of the provisioning workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStage {
    /// Look up the template by name
    ResolveTemplate,
    /// Read disk and NIC names off the template
    DeriveDefaults,
    /// Submit the creation request
    CreateVm,
    /// Power on the created VM
    StartVm,
    /// The instance died outside of any step
    Dispatch,
}

impl WorkflowStage {
    /// Short name used in logs
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStage::ResolveTemplate => "resolve_template",
            WorkflowStage::DeriveDefaults => "derive_defaults",
            WorkflowStage::CreateVm => "create_vm",
            WorkflowStage::StartVm => "start_vm",
            WorkflowStage::Dispatch => "dispatch",
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Template resource the workflow copies names from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateResource {
    /// Disk
    Disk,
    /// Network interface
    Nic,
}

impl fmt::Display for TemplateResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateResource::Disk => f.write_str("disks"),
            TemplateResource::Nic => f.write_str("NICs"),
        }
    }
}

/// Why a workflow instance failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// Template listing failed
    #[error("failed to retrieve template {template}: {source}")]
    LookupFailed {
        /// Template name
        template: String,
        /// Remote failure
        #[source]
        source: RemoteError,
    },

    /// No template carries the requested name
    #[error("template {template} not found")]
    NotFound {
        /// Template name
        template: String,
    },

    /// The template lacks a disk or a NIC to copy the name from
    #[error("template {template} has no {resource}")]
    MissingResource {
        /// Template name
        template: String,
        /// What is missing
        resource: TemplateResource,
    },

    /// The platform rejected the creation request
    #[error("failed to create VM: {0}")]
    CreateFailed(#[source] RemoteError),

    /// The platform rejected the start command
    #[error("failed to start VM {vm_id}: {source}")]
    StartFailed {
        /// VM that was created but stays stopped
        vm_id: VmId,
        /// Remote failure
        #[source]
        source: RemoteError,
    },

    /// A remote call did not finish within the configured timeout
    ///
    /// A timed out `create_vm` may still complete on the platform, leaving a
    /// VM whose id was never returned. See
    /// [`WorkflowFailure::creation_unconfirmed`].
    #[error("remote call timed out after {0:?}")]
    TimedOut(Duration),

    /// The instance was torn down by a fault outside the workflow steps
    #[error("workflow aborted: {0}")]
    Aborted(String),
}

/// Terminal failure of one workflow instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowFailure {
    /// Name of the request that failed
    pub request_name: String,
    /// Step that failed
    pub stage: WorkflowStage,
    /// What went wrong
    pub cause: WorkflowError,
    /// VM created before the failure, left stopped on the platform
    pub created_vm: Option<VmId>,
}

impl WorkflowFailure {
    /// Failure of an instance that never reached a terminal step
    pub fn aborted(request_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            request_name: request_name.into(),
            stage: WorkflowStage::Dispatch,
            cause: WorkflowError::Aborted(reason.into()),
            created_vm: None,
        }
    }
}

impl WorkflowFailure {
    /// Creation was submitted but its result never arrived
    pub fn creation_unconfirmed(&self) -> bool {
        self.stage == WorkflowStage::CreateVm && matches!(self.cause, WorkflowError::TimedOut(_))
    }
}

impl fmt::Display for WorkflowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VM {}: {} failed: {}",
            self.request_name, self.stage, self.cause
        )?;
        if let Some(vm_id) = &self.created_vm {
            write!(f, " (VM {} was created and left stopped)", vm_id)?;
        } else if self.creation_unconfirmed() {
            f.write_str(" (the VM may still have been created, check the platform)")?;
        }
        Ok(())
    }
}

/// Terminal result of one workflow instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// VM created and started
    Success {
        /// Name of the request
        request_name: String,
        /// Id of the running VM
        vm_id: VmId,
    },
    /// One of the steps failed
    Failure(WorkflowFailure),
}

impl WorkflowOutcome {
    /// Name of the request this outcome belongs to
    pub fn request_name(&self) -> &str {
        match self {
            WorkflowOutcome::Success { request_name, .. } => request_name,
            WorkflowOutcome::Failure(failure) => &failure.request_name,
        }
    }

    /// Whether the VM is up and running
    pub fn is_success(&self) -> bool {
        matches!(self, WorkflowOutcome::Success { .. })
    }
}

/// Complete account of a batch run
///
/// Only ever handed out by the aggregator once every workflow instance has
/// reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    /// Number of requests in the batch
    pub total: usize,
    /// Number of VMs created and started
    pub succeeded: usize,
    /// Failures in the order they arrived
    pub failures: Vec<WorkflowFailure>,
}

impl BatchResult {
    /// Number of failed requests
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when every request ended in a running VM
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty() && self.succeeded == self.total
    }

    /// Requests whose creation timed out, so a VM may exist without a known id
    pub fn unconfirmed_creations(&self) -> impl Iterator<Item = &str> {
        self.failures
            .iter()
            .filter(|failure| failure.creation_unconfirmed())
            .map(|failure| failure.request_name.as_str())
    }

    /// VMs that exist on the platform but were left stopped
    pub fn stopped_vms(&self) -> impl Iterator<Item = (&str, &VmId)> {
        self.failures.iter().filter_map(|failure| {
            failure
                .created_vm
                .as_ref()
                .map(|vm_id| (failure.request_name.as_str(), vm_id))
        })
    }
}
