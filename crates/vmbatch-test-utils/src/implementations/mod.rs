//! Test implementations (fakes) of the vmbatch interfaces.

pub mod fake_platform;

pub use fake_platform::{FakeManagementApi, RemoteCall};
