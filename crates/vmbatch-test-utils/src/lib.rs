//! Testing utilities for vmbatch.
//!
//! This crate provides mocks, an instrumented in-memory management
//! platform, and input data generators shared by the workspace's tests.

pub mod data_generators;
pub mod implementations;
pub mod mocks;

/// Re-export commonly used types for convenience
pub use mockall;

pub use implementations::{FakeManagementApi, RemoteCall};
pub use mocks::{create_mock_management_api, MockManagementApi};
