//! Concurrency controller
//!
//! Spawns one task per request and gates each behind a permit from a
//! fixed-size pool, bulkhead style. Every task runs to completion; a failed
//! or panicking instance never cancels the others.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, Instrument};

use crate::application::aggregator::outcome_channel;
use crate::application::workflow::ProvisioningWorkflow;
use crate::config::{BatchConfig, WorkflowConfig};
use crate::domain::outcome::{BatchResult, WorkflowFailure, WorkflowOutcome};
use crate::domain::remote::ManagementApi;
use crate::domain::request::ProvisionRequest;
use crate::error::CoreError;

/// Runs a whole batch of provisioning requests
#[derive(Debug, Clone)]
pub struct BatchRunner {
    concurrency_limit: usize,
    workflow_config: Arc<WorkflowConfig>,
}

impl BatchRunner {
    /// Create a runner, rejecting invalid configuration
    pub fn new(config: BatchConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            concurrency_limit: config.concurrency_limit,
            workflow_config: Arc::new(config.workflow),
        })
    }

    /// Maximum number of workflow instances running at once
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Provision every request and return once all of them have finished
    ///
    /// All requests are attempted regardless of earlier failures; the
    /// concurrency limit only bounds how many run at the same time.
    pub async fn run(
        &self,
        requests: Vec<ProvisionRequest>,
        remote: Arc<dyn ManagementApi>,
    ) -> BatchResult {
        let total = requests.len();
        info!(
            requests = total,
            concurrency = self.concurrency_limit,
            "Starting batch"
        );

        let permits = Arc::new(Semaphore::new(self.concurrency_limit));
        let (reporter, aggregator) = outcome_channel(total);
        let workflow = ProvisioningWorkflow::new(remote, self.workflow_config.clone());

        let mut tasks = JoinSet::new();
        for request in requests {
            let permits = permits.clone();
            let reporter = reporter.clone();
            let workflow = workflow.clone();
            let span = info_span!("provision", vm = %request.name);

            tasks.spawn(
                async move {
                    let request_name = request.name.clone();

                    // Held until the end of this block, including unwinding.
                    let _permit = match permits.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            reporter
                                .report(WorkflowOutcome::Failure(WorkflowFailure::aborted(
                                    request_name,
                                    "permit pool closed",
                                )))
                                .await;
                            return;
                        }
                    };
                    debug!("Permit acquired");

                    let outcome = AssertUnwindSafe(workflow.execute(request))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| {
                            let reason = panic_message(panic.as_ref());
                            error!(reason = %reason, "Workflow instance panicked");
                            WorkflowOutcome::Failure(WorkflowFailure::aborted(
                                request_name,
                                format!("workflow panicked: {}", reason),
                            ))
                        });

                    reporter.report(outcome).await;
                }
                .instrument(span),
            );
        }
        drop(reporter);

        // Join barrier: no early exit on failure.
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Workflow task did not complete: {}", e);
            }
        }

        let result = aggregator.finalize().await;
        info!(
            requests = result.total,
            succeeded = result.succeeded,
            failed = result.failed(),
            "Batch finished"
        );
        result
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
