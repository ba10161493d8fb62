//!
//! vmbatch Core - batch orchestration for VM provisioning
//!
//! This crate holds the input-record model, the per-record provisioning
//! workflow, the bounded-concurrency batch runner and the outcome
//! aggregator. The management platform itself is reached only through the
//! [`ManagementApi`] trait.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - requests, outcomes and the remote boundary
pub mod domain;

/// Application services - parsing, workflow, concurrency, aggregation
pub mod application;

/// Configuration types
pub mod config;

/// Error types
pub mod error;

// Re-export key types
pub use application::aggregator::{outcome_channel, OutcomeAggregator, OutcomeReporter};
pub use application::controller::BatchRunner;
pub use application::parser::{parse_file, parse_requests};
pub use application::workflow::{
    build_descriptor, derive_defaults, network_config_script, ProvisioningWorkflow,
    TemplateDefaults, WorkflowState,
};
pub use config::{BatchConfig, DiskFormat, DiskInterface, NicInterface, WorkflowConfig};
pub use domain::outcome::{
    BatchResult, TemplateResource, WorkflowError, WorkflowFailure, WorkflowOutcome, WorkflowStage,
};
pub use domain::remote::{
    CpuTopology, DiskAttachmentSpec, ManagementApi, NicSpec, RemoteError, Template, VmDescriptor,
    VmId,
};
pub use domain::request::{NetworkSettings, ProvisionRequest, RecordField};
pub use error::{CoreError, ParseError};
