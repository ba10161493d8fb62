//! Outcome aggregation
//!
//! Workflow instances hand their outcome to an [`OutcomeReporter`]; the
//! matching [`OutcomeAggregator`] can only be read by consuming it, and the
//! read does not return before every reporter is gone. That gives the
//! aggregator its two states: collecting while reporters are alive, final
//! once they have all been dropped.

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::domain::outcome::{BatchResult, WorkflowOutcome};

/// Create a reporter/aggregator pair sized for `expected` outcomes
///
/// The channel holds one slot per expected outcome, so reporting never waits
/// for the reader.
pub fn outcome_channel(expected: usize) -> (OutcomeReporter, OutcomeAggregator) {
    let (tx, rx) = mpsc::channel(expected.max(1));
    (
        OutcomeReporter { tx },
        OutcomeAggregator { rx, expected },
    )
}

/// Write side of the aggregator, cloned into every workflow instance
#[derive(Debug, Clone)]
pub struct OutcomeReporter {
    tx: mpsc::Sender<WorkflowOutcome>,
}

impl OutcomeReporter {
    /// Record the terminal outcome of one workflow instance
    pub async fn report(&self, outcome: WorkflowOutcome) {
        let request_name = outcome.request_name().to_string();
        if self.tx.send(outcome).await.is_err() {
            // Only possible if the aggregator was dropped without being read.
            error!(vm = %request_name, "Outcome dropped: aggregator is gone");
        }
    }
}

/// Read side of the aggregator
#[derive(Debug)]
pub struct OutcomeAggregator {
    rx: mpsc::Receiver<WorkflowOutcome>,
    expected: usize,
}

impl OutcomeAggregator {
    /// Wait for every reporter to be dropped and drain all outcomes
    ///
    /// Failures keep their arrival order.
    pub async fn finalize(mut self) -> BatchResult {
        let mut succeeded = 0;
        let mut failures = Vec::new();

        while let Some(outcome) = self.rx.recv().await {
            match outcome {
                WorkflowOutcome::Success { .. } => succeeded += 1,
                WorkflowOutcome::Failure(failure) => failures.push(failure),
            }
        }

        let received = succeeded + failures.len();
        if received != self.expected {
            warn!(
                expected = self.expected,
                received, "Outcome count does not match the number of requests"
            );
        }
        debug!(succeeded, failed = failures.len(), "Outcomes finalized");

        BatchResult {
            total: self.expected,
            succeeded,
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::outcome::{WorkflowError, WorkflowFailure, WorkflowStage};
    use crate::domain::remote::VmId;
    use std::time::Duration;

    fn success(name: &str) -> WorkflowOutcome {
        WorkflowOutcome::Success {
            request_name: name.to_string(),
            vm_id: VmId(format!("id-{}", name)),
        }
    }

    fn not_found(name: &str) -> WorkflowOutcome {
        WorkflowOutcome::Failure(WorkflowFailure {
            request_name: name.to_string(),
            stage: WorkflowStage::ResolveTemplate,
            cause: WorkflowError::NotFound {
                template: "missing".to_string(),
            },
            created_vm: None,
        })
    }

    #[tokio::test]
    async fn test_finalize_counts_and_orders() {
        let (reporter, aggregator) = outcome_channel(4);

        reporter.report(not_found("b")).await;
        reporter.report(success("a")).await;
        reporter.report(not_found("c")).await;
        reporter.report(success("d")).await;
        drop(reporter);

        let result = aggregator.finalize().await;
        assert_eq!(result.total, 4);
        assert_eq!(result.succeeded, 2);
        let names: Vec<_> = result
            .failures
            .iter()
            .map(|f| f.request_name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (reporter, aggregator) = outcome_channel(0);
        drop(reporter);

        let result = aggregator.finalize().await;
        assert_eq!(result.total, 0);
        assert!(result.is_complete_success());
    }

    #[tokio::test]
    async fn test_finalize_waits_for_all_reporters() {
        let (reporter, aggregator) = outcome_channel(2);
        let late = reporter.clone();
        drop(reporter);

        let finalize = tokio::spawn(aggregator.finalize());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!finalize.is_finished(), "finalize returned while a reporter was alive");

        late.report(success("late")).await;
        drop(late);

        let result = finalize.await.unwrap();
        assert_eq!(result.succeeded, 1);
    }

    #[tokio::test]
    async fn test_reporting_never_waits_within_capacity() {
        let (reporter, aggregator) = outcome_channel(3);

        // Nobody is reading yet; all three sends must still complete.
        tokio::time::timeout(Duration::from_secs(1), async {
            for name in ["x", "y", "z"] {
                reporter.report(not_found(name)).await;
            }
        })
        .await
        .expect("reporting blocked");

        drop(reporter);
        assert_eq!(aggregator.finalize().await.failed(), 3);
    }
}
