/// Record parser
pub mod parser;

/// Provisioning workflow state machine
pub mod workflow;

/// Bounded-concurrency batch runner
pub mod controller;

/// Outcome aggregation
pub mod aggregator;
