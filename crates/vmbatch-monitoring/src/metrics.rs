//! Batch metrics, emitted as structured log events.

use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;
use vmbatch_core::BatchResult;

/// Counters describing one finished batch
pub struct BatchMetrics;

impl BatchMetrics {
    /// Failures per workflow stage, keyed by stage name
    pub fn failures_by_stage(result: &BatchResult) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for failure in &result.failures {
            *counts.entry(failure.stage.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Record a completed batch
    pub fn record_batch(result: &BatchResult, elapsed: Duration) {
        info!(
            total = result.total,
            succeeded = result.succeeded,
            failed = result.failed(),
            stopped_vms = result.stopped_vms().count(),
            duration_ms = elapsed.as_millis() as u64,
            "Batch completed"
        );

        for (stage, count) in Self::failures_by_stage(result) {
            info!(stage, count, "Batch failures by stage");
        }
    }
}
