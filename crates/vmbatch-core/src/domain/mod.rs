/// Validated input records
pub mod request;

/// Workflow outcomes and batch results
pub mod outcome;

/// Management platform boundary
pub mod remote;
