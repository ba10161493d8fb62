//! In-memory management platform for tests.
//!
//! Behaves like a well-mannered engine: templates are looked up by exact
//! name, VM ids are `id-<vm name>`. Individual VMs can be made to fail at
//! create or start, lookups can be made to stall, and every call is
//! recorded together with the number of calls in flight so tests can check
//! concurrency bounds by counting instead of timing.
//!
//! Besides calls in flight the fake keeps an instance gauge: an instance
//! opens with its template lookup and closes with its terminal call (the
//! start, a rejected create, or a lookup that leaves the workflow nothing
//! to work with). Stalled lookups never close.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;
use vmbatch_core::{ManagementApi, RemoteError, Template, VmDescriptor, VmId};

/// A call received by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// Template lookup, by template name
    ListTemplates(String),
    /// VM creation, by VM name
    CreateVm(String),
    /// VM start, by VM id
    StartVm(VmId),
    /// Session release
    Close,
}

/// Instrumented in-memory [`ManagementApi`]
#[derive(Debug, Default)]
pub struct FakeManagementApi {
    templates: HashMap<String, Vec<Template>>,
    create_failures: HashSet<String>,
    start_failures: HashSet<String>,
    create_panics: HashSet<String>,
    stalled_lookups: HashSet<String>,
    latency: Duration,

    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    active_instances: AtomicUsize,
    max_active_instances: AtomicUsize,
    closed: AtomicBool,
    calls: Mutex<Vec<RemoteCall>>,
    created: Mutex<Vec<VmDescriptor>>,
    started: Mutex<Vec<VmId>>,
}

impl FakeManagementApi {
    /// Create an empty platform (no templates)
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template with one disk and one NIC
    pub fn with_template(self, name: &str) -> Self {
        self.with_template_resources(name, &[format!("{}_disk", name).as_str()], &["nic1"])
    }

    /// Register a template with explicit disk and NIC names
    pub fn with_template_resources(mut self, name: &str, disks: &[&str], nics: &[&str]) -> Self {
        let entry = self.templates.entry(name.to_string()).or_default();
        let template = Template {
            id: format!("tpl-{}-{}", name, entry.len()),
            name: name.to_string(),
            disk_names: disks.iter().map(|d| d.to_string()).collect(),
            nic_names: nics.iter().map(|n| n.to_string()).collect(),
        };
        entry.push(template);
        self
    }

    /// Reject the creation of the named VM
    pub fn failing_create_for(mut self, vm_name: &str) -> Self {
        self.create_failures.insert(vm_name.to_string());
        self
    }

    /// Reject the start of the named VM (creation still succeeds)
    pub fn failing_start_for(mut self, vm_name: &str) -> Self {
        self.start_failures.insert(vm_name.to_string());
        self
    }

    /// Panic inside the creation call of the named VM
    pub fn panicking_create_for(mut self, vm_name: &str) -> Self {
        self.create_panics.insert(vm_name.to_string());
        self
    }

    /// Never answer lookups of the named template
    pub fn stalling_lookup_for(mut self, template: &str) -> Self {
        self.stalled_lookups.insert(template.to_string());
        self
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Highest number of calls that were in flight at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of workflow instances that were open at the same time
    pub fn max_active_instances(&self) -> usize {
        self.max_active_instances.load(Ordering::SeqCst)
    }

    /// Workflow instances currently open
    pub fn active_instances(&self) -> usize {
        self.active_instances.load(Ordering::SeqCst)
    }

    /// Every call received, in arrival order
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    /// Number of calls received
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Descriptors of every accepted creation request
    pub fn created(&self) -> Vec<VmDescriptor> {
        self.created.lock().clone()
    }

    /// Ids of every started VM
    pub fn started(&self) -> Vec<VmId> {
        self.started.lock().clone()
    }

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn vm_id_for(name: &str) -> VmId {
        VmId(format!("id-{}", name))
    }

    fn open_instance(&self) {
        let now = self.active_instances.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_instances.fetch_max(now, Ordering::SeqCst);
    }

    fn close_instance(&self) {
        // Calls made without a preceding lookup have no instance to close.
        let _ = self
            .active_instances
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    async fn enter(&self, call: RemoteCall) -> InFlight<'_> {
        self.calls.lock().push(call);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight { fake: self };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        guard
    }
}

/// Decrements the in-flight counter when a call finishes, however it ends
struct InFlight<'a> {
    fake: &'a FakeManagementApi,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.fake.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ManagementApi for FakeManagementApi {
    async fn list_templates_by_name(&self, name: &str) -> Result<Vec<Template>, RemoteError> {
        self.open_instance();
        let _call = self
            .enter(RemoteCall::ListTemplates(name.to_string()))
            .await;

        if self.stalled_lookups.contains(name) {
            debug!(template = %name, "Stalling template lookup");
            std::future::pending::<()>().await;
        }

        let templates = self.templates.get(name).cloned().unwrap_or_default();
        let usable = templates
            .first()
            .is_some_and(|t| t.first_disk_name().is_some() && t.first_nic_name().is_some());
        if !usable {
            self.close_instance();
        }
        Ok(templates)
    }

    async fn create_vm(&self, descriptor: &VmDescriptor) -> Result<VmId, RemoteError> {
        let _call = self
            .enter(RemoteCall::CreateVm(descriptor.name.clone()))
            .await;

        if self.create_panics.contains(&descriptor.name) {
            self.close_instance();
            panic!("fake platform crashed creating {}", descriptor.name);
        }

        if self.create_failures.contains(&descriptor.name) {
            self.close_instance();
            return Err(RemoteError::Rejected {
                status: 400,
                reason: format!("Cannot add VM {}", descriptor.name),
            });
        }

        self.created.lock().push(descriptor.clone());
        Ok(Self::vm_id_for(&descriptor.name))
    }

    async fn start_vm(&self, vm_id: &VmId) -> Result<(), RemoteError> {
        let _call = self.enter(RemoteCall::StartVm(vm_id.clone())).await;
        self.close_instance();

        let failing = self
            .start_failures
            .iter()
            .any(|name| Self::vm_id_for(name) == *vm_id);
        if failing {
            return Err(RemoteError::Rejected {
                status: 409,
                reason: format!("Cannot run VM {}", vm_id),
            });
        }

        self.started.lock().push(vm_id.clone());
        Ok(())
    }

    async fn close(&self) -> Result<(), RemoteError> {
        self.calls.lock().push(RemoteCall::Close);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_by_exact_name() {
        let fake = FakeManagementApi::new()
            .with_template("rhel9")
            .with_template_resources("rhel9", &["alt_disk"], &["nic9"]);

        let templates = fake.list_templates_by_name("rhel9").await.unwrap();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].first_disk_name(), Some("rhel9_disk"));
        assert_eq!(templates[1].first_nic_name(), Some("nic9"));

        assert!(fake.list_templates_by_name("rhel").await.unwrap().is_empty());
        assert_eq!(fake.call_count(), 2);
        assert_eq!(fake.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_instance_gauge_spans_calls() {
        let fake = FakeManagementApi::new()
            .with_template("rhel9")
            .with_template_resources("diskless", &[], &["nic1"]);

        fake.list_templates_by_name("rhel9").await.unwrap();
        fake.list_templates_by_name("rhel9").await.unwrap();
        // Two instances are open between their lookup and their start.
        assert_eq!(fake.active_instances(), 2);
        assert_eq!(fake.max_in_flight(), 1);

        fake.start_vm(&FakeManagementApi::vm_id_for("a")).await.unwrap();
        assert_eq!(fake.active_instances(), 1);

        fake.list_templates_by_name("diskless").await.unwrap();
        fake.list_templates_by_name("missing").await.unwrap();
        assert_eq!(fake.active_instances(), 1);
        assert_eq!(fake.max_active_instances(), 2);
    }

    #[tokio::test]
    async fn test_start_failure_after_create() {
        let fake = FakeManagementApi::new().failing_start_for("web01");
        let vm_id = FakeManagementApi::vm_id_for("web01");

        assert!(fake.start_vm(&vm_id).await.is_err());
        assert!(fake.started().is_empty());
        assert!(fake.start_vm(&FakeManagementApi::vm_id_for("web02")).await.is_ok());
    }
}
