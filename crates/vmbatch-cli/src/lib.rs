//! vmbatch command line
//!
//! Order of operations: validate flags, parse the whole input file, connect
//! to the engine, run the batch, close the session, report failures. Any
//! error before the batch starts is fatal; per-record failures are only
//! reported.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};
use vmbatch_core::{parse_file, BatchResult, BatchRunner, ManagementApi, ProvisionRequest};
use vmbatch_monitoring::BatchMetrics;
use vmbatch_ovirt::OvirtClient;

pub use config::Cli;
pub use error::{CliError, CliResult};

/// Run a whole batch as configured by `cli`
pub async fn run(cli: Cli) -> CliResult<BatchResult> {
    cli.validate()?;
    let runner = BatchRunner::new(cli.batch_config())?;

    // Nothing is provisioned unless every record parses.
    let requests = parse_file(&cli.csv)?;
    info!(path = %cli.csv.display(), records = requests.len(), "Loaded VM parameters");

    let client = OvirtClient::connect(&cli.connection_config()).await?;

    Ok(execute_batch(requests, Arc::new(client), &runner).await)
}

/// Provision `requests`, then release the session and report
///
/// Always closes `remote`, whatever the individual outcomes.
pub async fn execute_batch(
    requests: Vec<ProvisionRequest>,
    remote: Arc<dyn ManagementApi>,
    runner: &BatchRunner,
) -> BatchResult {
    let started = Instant::now();
    let result = runner.run(requests, remote.clone()).await;

    if let Err(e) = remote.close().await {
        warn!(error = %e, "Failed to close engine session");
    }

    report(&result);
    BatchMetrics::record_batch(&result, started.elapsed());
    result
}

/// Log every failure on its own line, then a summary
pub fn report(result: &BatchResult) {
    for failure in &result.failures {
        error!("{}", failure);
    }

    for (name, vm_id) in result.stopped_vms() {
        warn!(vm = %name, vm_id = %vm_id, "VM was created but is not running");
    }

    for name in result.unconfirmed_creations() {
        warn!(vm = %name, "VM creation timed out, the VM may exist on the platform");
    }

    info!(
        total = result.total,
        succeeded = result.succeeded,
        failed = result.failed(),
        "All VM operations completed"
    );
}
