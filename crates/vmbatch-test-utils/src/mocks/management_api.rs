//! Mock implementation of the management platform interface.

use async_trait::async_trait;
use mockall::mock;
use vmbatch_core::{ManagementApi, RemoteError, Template, VmDescriptor, VmId};

// Generate the mock implementation
mock! {
    pub ManagementApi {}

    #[async_trait]
    impl ManagementApi for ManagementApi {
        async fn list_templates_by_name(&self, name: &str) -> Result<Vec<Template>, RemoteError>;
        async fn create_vm(&self, descriptor: &VmDescriptor) -> Result<VmId, RemoteError>;
        async fn start_vm(&self, vm_id: &VmId) -> Result<(), RemoteError>;
        async fn close(&self) -> Result<(), RemoteError>;
    }
}

/// Creates a mock platform where every call succeeds.
///
/// Templates are returned with one disk and one NIC named after the
/// template; VM ids are `id-<vm name>`.
pub fn create_mock_management_api() -> MockManagementApi {
    let mut mock = MockManagementApi::new();

    // Set up default behaviors for common methods
    mock.expect_list_templates_by_name().returning(|name| {
        Ok(vec![Template {
            id: format!("tpl-{}", name),
            name: name.to_string(),
            disk_names: vec![format!("{}_disk", name)],
            nic_names: vec!["nic1".to_string()],
        }])
    });

    mock.expect_create_vm()
        .returning(|descriptor| Ok(VmId(format!("id-{}", descriptor.name))));

    mock.expect_start_vm().returning(|_| Ok(()));

    mock.expect_close().returning(|| Ok(()));

    mock
}
