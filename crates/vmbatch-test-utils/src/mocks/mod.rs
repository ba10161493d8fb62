//! Mock implementations of the vmbatch interfaces.

pub mod management_api;

pub use management_api::{create_mock_management_api, MockManagementApi};
